//! Host bridge primitives behind the access adapter.
//!
//! # Responsibility
//! - Define the five primitives the desktop shell exposes: fetch, insert,
//!   update-by-id, delete-by-id and login.
//! - Provide the SQLite implementation used by the local table store.
//!
//! # Invariants
//! - Rows crossing the bridge always carry an `id`.
//! - Primitive failures are hard errors (`Err`); "nothing matched" is not.

use crate::db::DbError;
use crate::model::identity::Identity;
use crate::model::row::{RowData, RowError, TableRow};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod password;
mod sqlite;

pub use sqlite::{SqliteTableBridge, BRIDGED_TABLES};

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Table and auth primitives provided by the hosting shell.
pub trait HostBridge {
    /// Returns rows matching every `column == value` pair of `filter`, in
    /// storage order. An empty filter returns the whole table.
    fn get_all_from_table(&self, table: &str, filter: &RowData) -> BridgeResult<Vec<TableRow>>;

    /// Stores `row` and returns it as persisted (generated id, defaults).
    fn insert_into_table(&self, table: &str, row: RowData) -> BridgeResult<TableRow>;

    /// Applies `patch` to the row with `id`. Returns whether a row changed.
    fn update_in_table(&self, table: &str, id: &str, patch: &RowData) -> BridgeResult<bool>;

    /// Removes the row with `id`. Returns whether a row was removed.
    fn delete_from_table(&self, table: &str, id: &str) -> BridgeResult<bool>;

    /// Checks credentials. `Ok(None)` means the credentials did not match.
    fn login(&self, identifier: &str, secret: &str) -> BridgeResult<Option<Identity>>;
}

/// Hard failures of the bridge primitives.
#[derive(Debug)]
pub enum BridgeError {
    Db(DbError),
    UnknownTable(String),
    UnknownColumn { table: String, column: String },
    InvalidRow(RowError),
    /// Stored data cannot be represented as a row or identity.
    InvalidData(String),
    /// Hashing a secret failed, or a stored hash is not a PHC string.
    Password(argon2::password_hash::Error),
    /// Connection is not migrated to the schema this build expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownTable(table) => write!(f, "table is not bridged: {table}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` in table `{table}`")
            }
            Self::InvalidRow(err) => write!(f, "invalid row: {err}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
            Self::Password(err) => write!(f, "password hash error: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "table bridge requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for BridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidRow(err) => Some(err),
            Self::Password(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for BridgeError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for BridgeError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<argon2::password_hash::Error> for BridgeError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::Password(value)
    }
}

impl From<RowError> for BridgeError {
    fn from(value: RowError) -> Self {
        Self::InvalidRow(value)
    }
}
