//! Permission grant repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Read the typed grant set of one subject.
//! - Replace one namespace of a subject's grants atomically.
//!
//! # Invariants
//! - Replacing a namespace never touches grants of the other namespace.
//! - Delete and insert of a replace commit together or not at all.
//! - Read paths skip rows with unknown module keys and reject non-boolean
//!   flags.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::grant::{Capabilities, PermissionGrant};
use crate::model::module::{ModuleKey, ModuleNamespace, REPORT_KEY_SUFFIX};
use log::warn;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "grant repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid grant data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence contract used by the permission engine.
pub trait GrantRepository {
    /// All grants of `subject_id`, ordered by module key.
    fn list_grants(&self, subject_id: &str) -> RepoResult<Vec<PermissionGrant>>;

    /// Makes `grants` the complete set of `subject_id` grants in `namespace`.
    fn replace_grants(
        &self,
        subject_id: &str,
        namespace: ModuleNamespace,
        grants: &[PermissionGrant],
    ) -> RepoResult<()>;
}

/// SQLite-backed grant repository over `user_permissions`.
pub struct SqliteGrantRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGrantRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl GrantRepository for SqliteGrantRepository<'_> {
    fn list_grants(&self, subject_id: &str) -> RepoResult<Vec<PermissionGrant>> {
        let mut stmt = self.conn.prepare(
            "SELECT module_name, can_view, can_create, can_edit, can_delete
             FROM user_permissions
             WHERE user_id = ?1
             ORDER BY module_name ASC;",
        )?;
        let mut rows = stmt.query([subject_id])?;
        let mut grants = Vec::new();

        while let Some(row) = rows.next()? {
            let module_name: String = row.get(0)?;
            let Ok(module) = ModuleKey::parse(&module_name) else {
                warn!("event=grants_list module=repo status=skipped reason=unknown_module_key");
                continue;
            };
            grants.push(PermissionGrant {
                subject_id: subject_id.to_string(),
                module,
                capabilities: Capabilities {
                    can_view: parse_flag("can_view", row.get(1)?)?,
                    can_create: parse_flag("can_create", row.get(2)?)?,
                    can_edit: parse_flag("can_edit", row.get(3)?)?,
                    can_delete: parse_flag("can_delete", row.get(4)?)?,
                },
            });
        }

        Ok(grants)
    }

    fn replace_grants(
        &self,
        subject_id: &str,
        namespace: ModuleNamespace,
        grants: &[PermissionGrant],
    ) -> RepoResult<()> {
        for grant in grants {
            if grant.subject_id != subject_id {
                return Err(RepoError::InvalidData(format!(
                    "grant for `{}` passed while replacing grants of `{subject_id}`",
                    grant.subject_id
                )));
            }
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let report_pattern = format!("%{}", REPORT_KEY_SUFFIX.replace('_', "\\_"));
        let delete_sql = match namespace {
            ModuleNamespace::Report => {
                "DELETE FROM user_permissions
                 WHERE user_id = ?1 AND module_name LIKE ?2 ESCAPE '\\';"
            }
            ModuleNamespace::App => {
                "DELETE FROM user_permissions
                 WHERE user_id = ?1 AND module_name NOT LIKE ?2 ESCAPE '\\';"
            }
        };
        tx.execute(delete_sql, params![subject_id, report_pattern])?;

        for grant in grants {
            tx.execute(
                "INSERT INTO user_permissions (
                    id,
                    user_id,
                    module_name,
                    can_view,
                    can_create,
                    can_edit,
                    can_delete
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    Uuid::new_v4().to_string(),
                    subject_id,
                    grant.module.as_str(),
                    grant.capabilities.can_view,
                    grant.capabilities.can_create,
                    grant.capabilities.can_edit,
                    grant.capabilities.can_delete,
                ],
            )?;
        }
        tx.commit()?;

        Ok(())
    }
}

fn parse_flag(column: &str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in user_permissions.{column}"
        ))),
    }
}
