//! Query chain types.
//!
//! Filters other than the first `eq` after `select` are applied in memory
//! over the full table. Each filter is terminal: chains carry one predicate.

use super::compare::{compare_values, ilike_matches, values_equal};
use super::{AccessAdapter, AdapterResult, QueryResponse, DELETE_FAILED, UPDATE_FAILED};
use crate::bridge::{BridgeResult, HostBridge};
use crate::model::row::{RowData, RowId, TableRow};
use log::{debug, warn};
use serde_json::Value;

/// Chain bound to one table.
pub struct TableQuery<'b> {
    adapter: AccessAdapter<'b>,
    table: String,
}

impl<'b> TableQuery<'b> {
    pub(super) fn new(adapter: AccessAdapter<'b>, table: String) -> Self {
        Self { adapter, table }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Starts a read. `columns` is kept for callers but not applied: full
    /// rows are always returned.
    pub fn select(self, columns: Option<&str>) -> SelectQuery<'b> {
        SelectQuery {
            adapter: self.adapter,
            table: self.table,
            columns: columns.map(str::to_string),
        }
    }

    pub fn insert(self, data: RowData) -> AdapterResult<TableRow> {
        let bridge = self.adapter.bridge()?;
        Ok(settle(&self.table, "insert", bridge.insert_into_table(&self.table, data)))
    }

    pub fn update(self, patch: RowData) -> UpdateQuery<'b> {
        UpdateQuery {
            adapter: self.adapter,
            table: self.table,
            patch,
        }
    }

    pub fn delete(self) -> DeleteQuery<'b> {
        DeleteQuery {
            adapter: self.adapter,
            table: self.table,
        }
    }
}

/// Sort direction for [`SelectQuery::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderOptions {
    pub ascending: bool,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self { ascending: true }
    }
}

pub struct SelectQuery<'b> {
    adapter: AccessAdapter<'b>,
    table: String,
    columns: Option<String>,
}

impl SelectQuery<'_> {
    /// Column list passed to `select`, unused by the adapter.
    pub fn columns(&self) -> Option<&str> {
        self.columns.as_deref()
    }

    /// Every row of the table.
    pub fn execute(self) -> AdapterResult<Vec<TableRow>> {
        self.fetch(RowData::new(), |rows| rows)
    }

    /// Rows whose `column` equals `value`, filtered at the bridge.
    pub fn eq(self, column: &str, value: impl Into<Value>) -> AdapterResult<Vec<TableRow>> {
        self.fetch(single_filter(column, value.into()), |rows| rows)
    }

    /// Rows whose `column` differs from `value`; the complement of [`eq`].
    /// A missing column reads as null.
    ///
    /// [`eq`]: SelectQuery::eq
    pub fn neq(self, column: &str, value: impl Into<Value>) -> AdapterResult<Vec<TableRow>> {
        let value = value.into();
        let column = column.to_string();
        self.fetch(RowData::new(), move |rows| {
            rows.into_iter()
                .filter(|row| !values_equal(row.get(&column), &value))
                .collect()
        })
    }

    /// Rows whose `column` contains `pattern`, ignoring case.
    pub fn ilike(self, column: &str, pattern: &str) -> AdapterResult<Vec<TableRow>> {
        let column = column.to_string();
        let pattern = pattern.to_string();
        self.fetch(RowData::new(), move |rows| {
            rows.into_iter()
                .filter(|row| ilike_matches(row.get(&column), &pattern))
                .collect()
        })
    }

    /// Every row, sorted on raw values of `column`.
    pub fn order(self, column: &str, options: OrderOptions) -> AdapterResult<Vec<TableRow>> {
        let column = column.to_string();
        self.fetch(RowData::new(), move |mut rows| {
            rows.sort_by(|left, right| {
                let ordering = compare_values(left.get(&column), right.get(&column));
                if options.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
            rows
        })
    }

    /// The first `count` rows in storage order.
    pub fn limit(self, count: usize) -> AdapterResult<Vec<TableRow>> {
        self.fetch(RowData::new(), move |rows| {
            rows.into_iter().take(count).collect()
        })
    }

    fn fetch(
        self,
        filter: RowData,
        shape: impl FnOnce(Vec<TableRow>) -> Vec<TableRow>,
    ) -> AdapterResult<Vec<TableRow>> {
        let bridge = self.adapter.bridge()?;
        let fetched = bridge.get_all_from_table(&self.table, &filter).map(shape);
        Ok(settle(&self.table, "select", fetched))
    }
}

/// `update(patch)` awaiting its `eq` filter.
pub struct UpdateQuery<'b> {
    adapter: AccessAdapter<'b>,
    table: String,
    patch: RowData,
}

impl UpdateQuery<'_> {
    /// Updates the first row whose `column` equals `value`.
    ///
    /// Zero matches reports [`UPDATE_FAILED`] without calling the per-id
    /// primitive. Further matches are left untouched.
    pub fn eq(self, column: &str, value: impl Into<Value>) -> AdapterResult<RowId> {
        let bridge = self.adapter.bridge()?;
        let filter = single_filter(column, value.into());
        let outcome = first_match(bridge, &self.table, &filter).and_then(|target| {
            let Some(id) = target else {
                return Ok(QueryResponse::failed(UPDATE_FAILED));
            };
            Ok(if bridge.update_in_table(&self.table, &id, &self.patch)? {
                QueryResponse::ok(id)
            } else {
                QueryResponse::failed(UPDATE_FAILED)
            })
        });
        Ok(settle_response(&self.table, "update", outcome))
    }
}

/// `delete()` awaiting its `eq` filter.
pub struct DeleteQuery<'b> {
    adapter: AccessAdapter<'b>,
    table: String,
}

impl DeleteQuery<'_> {
    /// Deletes the first row whose `column` equals `value`, with the same
    /// first-match-only rule as [`UpdateQuery::eq`].
    pub fn eq(self, column: &str, value: impl Into<Value>) -> AdapterResult<RowId> {
        let bridge = self.adapter.bridge()?;
        let filter = single_filter(column, value.into());
        let outcome = first_match(bridge, &self.table, &filter).and_then(|target| {
            let Some(id) = target else {
                return Ok(QueryResponse::failed(DELETE_FAILED));
            };
            Ok(if bridge.delete_from_table(&self.table, &id)? {
                QueryResponse::ok(id)
            } else {
                QueryResponse::failed(DELETE_FAILED)
            })
        });
        Ok(settle_response(&self.table, "delete", outcome))
    }
}

fn single_filter(column: &str, value: Value) -> RowData {
    let mut filter = RowData::new();
    filter.insert(column.to_string(), value);
    filter
}

fn first_match(
    bridge: &dyn HostBridge,
    table: &str,
    filter: &RowData,
) -> BridgeResult<Option<RowId>> {
    let matches = bridge.get_all_from_table(table, filter)?;
    if matches.len() > 1 {
        debug!(
            "event=scoped_write module=adapter table={table} matched={} applied=1",
            matches.len()
        );
    }
    Ok(matches.into_iter().next().map(|row| row.id().to_string()))
}

fn settle<T>(table: &str, op: &str, outcome: BridgeResult<T>) -> QueryResponse<T> {
    settle_response(table, op, outcome.map(QueryResponse::ok))
}

fn settle_response<T>(
    table: &str,
    op: &str,
    outcome: BridgeResult<QueryResponse<T>>,
) -> QueryResponse<T> {
    match outcome {
        Ok(response) => response,
        Err(err) => {
            warn!("event=adapter_call module=adapter status=error table={table} op={op} error={err}");
            QueryResponse::failed(err.to_string())
        }
    }
}
