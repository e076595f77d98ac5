//! Key-value persistence for session state.

use super::{SessionError, SessionResult};
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

/// Fixed-key store the session reads at startup and writes on sign-in/out.
pub trait SessionStore {
    fn get(&self, key: &str) -> SessionResult<Option<Value>>;
    fn set(&self, key: &str, value: &Value) -> SessionResult<()>;
    fn remove(&self, key: &str) -> SessionResult<()>;
}

/// Session store over the `session_kv` table.
pub struct SqliteSessionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSessionStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SessionStore for SqliteSessionStore<'_> {
    fn get(&self, key: &str) -> SessionResult<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM session_kv WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|text| {
            serde_json::from_str(&text).map_err(|err| {
                SessionError::InvalidData(format!("session_kv[{key}] is not JSON: {err}"))
            })
        })
        .transpose()
    }

    fn set(&self, key: &str, value: &Value) -> SessionResult<()> {
        self.conn.execute(
            "INSERT INTO session_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            [key, value.to_string().as_str()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> SessionResult<()> {
        self.conn
            .execute("DELETE FROM session_kv WHERE key = ?1;", [key])?;
        Ok(())
    }
}
