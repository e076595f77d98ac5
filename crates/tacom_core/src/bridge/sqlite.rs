//! SQLite implementation of the host bridge primitives.
//!
//! # Responsibility
//! - Map schema-less rows onto the migrated tables.
//! - Keep credential columns out of every row that leaves the store.
//!
//! # Invariants
//! - Only [`BRIDGED_TABLES`] are reachable; table and column names are
//!   validated before they are interpolated into SQL.
//! - Fetches are ordered by insertion (`rowid ASC`), so "first match" is
//!   deterministic.

use super::password::{hash_secret, verify_secret};
use super::{BridgeError, BridgeResult, HostBridge};
use crate::db::migrations::latest_version;
use crate::model::identity::{Identity, Role};
use crate::model::module::ModuleKey;
use crate::model::records::UserAccount;
use crate::model::row::{
    check_scalar_columns, RowData, RowError, TableRecord, TableRow, ID_COLUMN,
};
use log::{debug, info};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::{Number, Value};
use uuid::Uuid;

/// Tables reachable through the bridge.
pub const BRIDGED_TABLES: &[&str] = &["users", "user_permissions", "companies", "equipments"];

/// `(table, column)` holding a permission module key.
const MODULE_KEY_COLUMN: (&str, &str) = ("user_permissions", "module_name");

/// `(table, column)` pairs that are never read or written through the bridge.
const HIDDEN_COLUMNS: &[(&str, &str)] = &[("users", "password_hash")];

/// Local table store over one migrated connection.
pub struct SqliteTableBridge<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTableBridge<'conn> {
    /// Wraps `conn` after checking it is migrated to the current schema.
    pub fn try_new(conn: &'conn Connection) -> BridgeResult<Self> {
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(BridgeError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    /// Registers a local account with an Argon2 password hash.
    pub fn create_user(
        &self,
        username: &str,
        display_name: &str,
        role: Role,
        secret: &str,
    ) -> BridgeResult<UserAccount> {
        let id = Uuid::new_v4().to_string();
        let password_hash = hash_secret(secret)?;
        self.conn.execute(
            "INSERT INTO users (id, username, display_name, role, password_hash)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id,
                username.trim(),
                display_name.trim(),
                role.as_str(),
                password_hash,
            ],
        )?;
        info!(
            "event=user_create module=bridge status=ok role={}",
            role.as_str()
        );

        let row = self.find_by_id(UserAccount::TABLE, &id)?.ok_or_else(|| {
            BridgeError::InvalidData(format!("user {id} missing right after insert"))
        })?;
        row.into_record().map_err(BridgeError::from)
    }

    fn find_by_id(&self, table: &str, id: &str) -> BridgeResult<Option<TableRow>> {
        let mut filter = RowData::new();
        filter.insert(ID_COLUMN.to_string(), Value::String(id.to_string()));
        Ok(self.get_all_from_table(table, &filter)?.into_iter().next())
    }

    fn visible_columns(&self, table: &str) -> BridgeResult<Vec<String>> {
        if !BRIDGED_TABLES.contains(&table) {
            return Err(BridgeError::UnknownTable(table.to_string()));
        }
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({});", quote_ident(table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>("name"))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names
            .into_iter()
            .filter(|column| !is_hidden(table, column))
            .collect())
    }

    fn row_exists(&self, table: &str, id: &str) -> BridgeResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE \"id\" = ?1);",
                quote_ident(table)
            ),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl HostBridge for SqliteTableBridge<'_> {
    fn get_all_from_table(&self, table: &str, filter: &RowData) -> BridgeResult<Vec<TableRow>> {
        let visible = self.visible_columns(table)?;
        check_scalar_columns(filter)?;
        check_known_columns(table, &visible, filter.keys())?;

        let projection = visible
            .iter()
            .map(|column| quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {projection} FROM {}", quote_ident(table));
        if !filter.is_empty() {
            let predicates = filter
                .keys()
                .enumerate()
                .map(|(index, column)| format!("{} IS ?{}", quote_ident(column), index + 1))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&predicates);
        }
        sql.push_str(" ORDER BY rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(filter.values().map(to_sql_value)))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut columns = RowData::new();
            for (index, column) in visible.iter().enumerate() {
                let value = from_sql_value(table, column, row.get_ref(index)?)?;
                columns.insert(column.clone(), value);
            }
            out.push(TableRow::from_map(columns)?);
        }
        Ok(out)
    }

    fn insert_into_table(&self, table: &str, mut row: RowData) -> BridgeResult<TableRow> {
        let visible = self.visible_columns(table)?;
        let id = match row.remove(ID_COLUMN) {
            None | Some(Value::Null) => Uuid::new_v4().to_string(),
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            Some(_) => return Err(RowError::InvalidId.into()),
        };
        row.insert(ID_COLUMN.to_string(), Value::String(id.clone()));
        check_scalar_columns(&row)?;
        check_known_columns(table, &visible, row.keys())?;
        check_module_key(table, &row)?;

        let columns = row
            .keys()
            .map(|column| quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=row.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.conn.execute(
            &format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders});",
                quote_ident(table)
            ),
            params_from_iter(row.values().map(to_sql_value)),
        )?;
        debug!("event=table_insert module=bridge status=ok table={table}");

        self.find_by_id(table, &id)?.ok_or_else(|| {
            BridgeError::InvalidData(format!("row {id} missing from `{table}` after insert"))
        })
    }

    fn update_in_table(&self, table: &str, id: &str, patch: &RowData) -> BridgeResult<bool> {
        let visible = self.visible_columns(table)?;
        let mut patch = patch.clone();
        patch.remove(ID_COLUMN);
        check_scalar_columns(&patch)?;
        check_known_columns(table, &visible, patch.keys())?;
        check_module_key(table, &patch)?;

        if patch.is_empty() {
            return self.row_exists(table, id);
        }

        let assignments = patch
            .keys()
            .enumerate()
            .map(|(index, column)| format!("{} = ?{}", quote_ident(column), index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values = patch.values().map(to_sql_value).collect::<Vec<_>>();
        values.push(SqlValue::Text(id.to_string()));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {assignments} WHERE \"id\" = ?{};",
                quote_ident(table),
                values.len()
            ),
            params_from_iter(values),
        )?;
        debug!("event=table_update module=bridge status=ok table={table} changed={changed}");
        Ok(changed > 0)
    }

    fn delete_from_table(&self, table: &str, id: &str) -> BridgeResult<bool> {
        self.visible_columns(table)?;
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE \"id\" = ?1;", quote_ident(table)),
            [id],
        )?;
        debug!("event=table_delete module=bridge status=ok table={table} changed={changed}");
        Ok(changed > 0)
    }

    fn login(&self, identifier: &str, secret: &str) -> BridgeResult<Option<Identity>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, display_name, role, password_hash
                 FROM users
                 WHERE username = ?1;",
                [identifier.trim()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, display_name, role, password_hash)) = found else {
            info!("event=login module=bridge status=denied reason=unknown_user");
            return Ok(None);
        };
        if !verify_secret(secret, &password_hash)? {
            info!("event=login module=bridge status=denied reason=bad_secret");
            return Ok(None);
        }

        let role = Role::parse(&role).map_err(|err| BridgeError::InvalidData(err.to_string()))?;
        info!("event=login module=bridge status=ok role={}", role.as_str());
        Ok(Some(Identity::new(id, display_name, role)))
    }
}

fn is_hidden(table: &str, column: &str) -> bool {
    HIDDEN_COLUMNS
        .iter()
        .any(|(hidden_table, hidden_column)| *hidden_table == table && *hidden_column == column)
}

fn check_known_columns<'a>(
    table: &str,
    visible: &[String],
    columns: impl IntoIterator<Item = &'a String>,
) -> BridgeResult<()> {
    for column in columns {
        if !visible.iter().any(|known| known == column) {
            return Err(BridgeError::UnknownColumn {
                table: table.to_string(),
                column: column.clone(),
            });
        }
    }
    Ok(())
}

/// Grant rows may only name an enumerated module key, spelled exactly.
fn check_module_key(table: &str, row: &RowData) -> BridgeResult<()> {
    let (key_table, key_column) = MODULE_KEY_COLUMN;
    if table != key_table {
        return Ok(());
    }
    match row.get(key_column) {
        None => Ok(()),
        Some(Value::String(key))
            if ModuleKey::parse(key).is_ok_and(|module| module.as_str() == key) =>
        {
            Ok(())
        }
        Some(other) => Err(BridgeError::InvalidData(format!(
            "{key_table}.{key_column}: unknown module key {other}"
        ))),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => SqlValue::Integer(integer),
            None => number.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        // Rejected by `check_scalar_columns` before any statement runs.
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

fn from_sql_value(table: &str, column: &str, value: ValueRef<'_>) -> BridgeResult<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(integer) => Ok(Value::from(integer)),
        ValueRef::Real(real) => Number::from_f64(real).map(Value::Number).ok_or_else(|| {
            BridgeError::InvalidData(format!("non-finite number in {table}.{column}"))
        }),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| Value::String(text.to_string()))
            .map_err(|_| BridgeError::InvalidData(format!("non-UTF-8 text in {table}.{column}"))),
        ValueRef::Blob(_) => Err(BridgeError::InvalidData(format!(
            "blob values are not bridged: {table}.{column}"
        ))),
    }
}
