//! Client-side predicates and ordering on raw column values.

use serde_json::Value;
use std::cmp::Ordering;

/// Orders raw values: numbers numerically, strings by code point, bools
/// false-first. Mixed kinds fall back to null < bool < number < string.
pub(crate) fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.unwrap_or(&Value::Null);
    let right = right.unwrap_or(&Value::Null);
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => kind_rank(left).cmp(&kind_rank(right)),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Equality as the store's `IS` filter sees it: bools are 0/1 and numbers
/// compare by value, so `true == 1` and `1 == 1.0`. Missing reads as null.
pub(crate) fn values_equal(stored: Option<&Value>, operand: &Value) -> bool {
    let stored = stored.unwrap_or(&Value::Null);
    match (numeric(stored), numeric(operand)) {
        (Some(a), Some(b)) => a == b,
        (None, None) => stored == operand,
        _ => false,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

/// Case-insensitive substring match. `%` wildcards in the pattern are
/// dropped; null never matches.
///
/// Bool columns come back from the store as 0/1, so they match `"1"` or
/// `"0"`, never `"true"` or `"false"`.
pub(crate) fn ilike_matches(value: Option<&Value>, pattern: &str) -> bool {
    let needle = pattern.replace('%', "").to_lowercase();
    let haystack = match value {
        None | Some(Value::Null) => return false,
        Some(Value::String(text)) => text.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
    };
    haystack.contains(&needle)
}
