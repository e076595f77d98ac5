//! Untyped table rows for the adapter boundary.
//!
//! # Responsibility
//! - Carry schema-less column maps between the host bridge and callers.
//! - Convert to and from typed [`TableRecord`]s at the edge.
//!
//! # Invariants
//! - Every [`TableRow`] has a non-empty string `id`.
//! - Column values are scalars: null, bool, number or string.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Name of the key column every table carries.
pub const ID_COLUMN: &str = "id";

/// Row id as stored in each table's `id` column.
pub type RowId = String;

/// Column map used for inserts, patches and filters.
pub type RowData = Map<String, Value>;

/// A stored row. Constructed only through [`TableRow::from_map`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RowData", into = "RowData")]
pub struct TableRow {
    id: RowId,
    columns: RowData,
}

impl TableRow {
    /// Validates `columns` and wraps them.
    pub fn from_map(columns: RowData) -> Result<Self, RowError> {
        let id = match columns.get(ID_COLUMN) {
            None | Some(Value::Null) => return Err(RowError::MissingId),
            Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
            Some(_) => return Err(RowError::InvalidId),
        };
        check_scalar_columns(&columns)?;
        Ok(Self { id, columns })
    }

    /// Serializes a typed record into a row.
    pub fn from_record<T: TableRecord>(record: &T) -> Result<Self, RowError> {
        match serde_json::to_value(record).map_err(|err| RowError::Decode(err.to_string()))? {
            Value::Object(columns) => Self::from_map(columns),
            _ => Err(RowError::Decode(format!(
                "record for `{}` did not serialize to an object",
                T::TABLE
            ))),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> &RowData {
        &self.columns
    }

    pub fn into_map(self) -> RowData {
        self.columns
    }

    /// Decodes this row into the typed record of its table.
    pub fn into_record<T: TableRecord>(self) -> Result<T, RowError> {
        serde_json::from_value(Value::Object(self.columns))
            .map_err(|err| RowError::Decode(format!("{}: {err}", T::TABLE)))
    }
}

impl TryFrom<RowData> for TableRow {
    type Error = RowError;

    fn try_from(value: RowData) -> Result<Self, Self::Error> {
        Self::from_map(value)
    }
}

impl From<TableRow> for RowData {
    fn from(value: TableRow) -> Self {
        value.columns
    }
}

/// Typed row of one bridged table.
pub trait TableRecord: Serialize + DeserializeOwned {
    const TABLE: &'static str;
}

/// Rejects arrays and objects anywhere in `columns`.
pub fn check_scalar_columns(columns: &RowData) -> Result<(), RowError> {
    for (column, value) in columns {
        if matches!(value, Value::Array(_) | Value::Object(_)) {
            return Err(RowError::NonScalar(column.clone()));
        }
    }
    Ok(())
}

/// Row shape errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    MissingId,
    InvalidId,
    NonScalar(String),
    Decode(String),
}

impl Display for RowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "row has no `id` column"),
            Self::InvalidId => write!(f, "row `id` must be a non-empty string"),
            Self::NonScalar(column) => {
                write!(f, "column `{column}` must hold a scalar value")
            }
            Self::Decode(message) => write!(f, "row decode failed: {message}"),
        }
    }
}

impl Error for RowError {}

#[cfg(test)]
mod tests {
    use super::{RowError, TableRow};
    use serde_json::json;

    fn map(value: serde_json::Value) -> super::RowData {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn accepts_rows_with_string_id() {
        let row = TableRow::from_map(map(json!({"id": "r-1", "name": "Crane", "qty": 2})))
            .expect("valid row");
        assert_eq!(row.id(), "r-1");
        assert_eq!(row.get("qty"), Some(&json!(2)));
    }

    #[test]
    fn rejects_rows_without_usable_id() {
        assert_eq!(
            TableRow::from_map(map(json!({"name": "x"}))),
            Err(RowError::MissingId)
        );
        assert_eq!(
            TableRow::from_map(map(json!({"id": 7}))),
            Err(RowError::InvalidId)
        );
        assert_eq!(
            TableRow::from_map(map(json!({"id": "  "}))),
            Err(RowError::InvalidId)
        );
    }

    #[test]
    fn rejects_nested_values() {
        let err = TableRow::from_map(map(json!({"id": "r-1", "tags": ["a"]})))
            .expect_err("arrays are not scalars");
        assert_eq!(err, RowError::NonScalar("tags".to_string()));
    }

    #[test]
    fn deserializing_enforces_the_same_rules() {
        let parsed: Result<TableRow, _> = serde_json::from_str(r#"{"name":"no id"}"#);
        assert!(parsed.is_err());

        let parsed: TableRow = serde_json::from_str(r#"{"id":"r-9","name":"ok"}"#)
            .expect("row with id parses");
        assert_eq!(parsed.id(), "r-9");
    }
}
