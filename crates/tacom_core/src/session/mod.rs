//! Signed-in session lifecycle.
//!
//! # Responsibility
//! - Restore the current identity once at startup.
//! - Persist the identity on sign-in and clear it on sign-out.
//! - Seed the default administrator on first launch.
//!
//! # Invariants
//! - The session is an explicit value owned by the caller; there is no
//!   process-wide current user.
//! - A failed sign-in leaves the previous session untouched.

use crate::adapter::{AccessAdapter, BridgeUnavailable, QueryResponse};
use crate::bridge::{BridgeError, HostBridge, SqliteTableBridge};
use crate::db::DbError;
use crate::model::identity::{Identity, Role};
use crate::model::records::UserAccount;
use crate::model::row::{RowData, TableRecord};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod store;

pub use store::{SessionStore, SqliteSessionStore};

/// Key holding the signed-in identity.
pub const CURRENT_IDENTITY_KEY: &str = "tacom.current_identity";
/// Key marking that the default administrator was seeded.
pub const DEFAULT_USER_SEEDED_KEY: &str = "tacom.default_user_seeded";

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_SECRET: &str = "admin";
pub const DEFAULT_ADMIN_DISPLAY_NAME: &str = "Administrador";

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug)]
pub enum SessionError {
    Store(DbError),
    Bridge(BridgeError),
    Unavailable(BridgeUnavailable),
    InvalidData(String),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "session store failed: {err}"),
            Self::Bridge(err) => write!(f, "{err}"),
            Self::Unavailable(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid session data: {message}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Bridge(err) => Some(err),
            Self::Unavailable(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(DbError::Sqlite(value))
    }
}

impl From<BridgeError> for SessionError {
    fn from(value: BridgeError) -> Self {
        Self::Bridge(value)
    }
}

impl From<BridgeUnavailable> for SessionError {
    fn from(value: BridgeUnavailable) -> Self {
        Self::Unavailable(value)
    }
}

/// Current identity plus the store it is persisted in.
pub struct Session<S: SessionStore> {
    store: S,
    current: Option<Identity>,
}

impl<S: SessionStore> Session<S> {
    /// Reads the persisted identity, if any.
    pub fn restore(store: S) -> SessionResult<Self> {
        let current = match store.get(CURRENT_IDENTITY_KEY)? {
            Some(value) => Some(serde_json::from_value(value).map_err(|err| {
                SessionError::InvalidData(format!("{CURRENT_IDENTITY_KEY}: {err}"))
            })?),
            None => None,
        };
        Ok(Self { store, current })
    }

    /// Like [`Session::restore`], but an unreadable persisted identity is
    /// removed and the session starts signed out.
    pub fn restore_or_clear(store: S) -> SessionResult<Self> {
        let current = match store.get(CURRENT_IDENTITY_KEY)? {
            Some(value) => match serde_json::from_value(value) {
                Ok(identity) => Some(identity),
                Err(_) => {
                    store.remove(CURRENT_IDENTITY_KEY)?;
                    warn!("event=session_restore module=session status=cleared reason=invalid_identity");
                    None
                }
            },
            None => None,
        };
        Ok(Self { store, current })
    }

    pub fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    /// Signs in through the adapter's auth shim.
    ///
    /// Rejected credentials come back as a soft failure in the response;
    /// only a detached adapter or a store failure is an `Err`.
    pub fn sign_in(
        &mut self,
        adapter: &AccessAdapter<'_>,
        identifier: &str,
        secret: &str,
    ) -> SessionResult<QueryResponse<Identity>> {
        let response = adapter.auth().sign_in_with_password(identifier, secret)?;
        if let Some(identity) = response.data.as_ref() {
            let value = serde_json::to_value(identity)
                .map_err(|err| SessionError::InvalidData(err.to_string()))?;
            self.store.set(CURRENT_IDENTITY_KEY, &value)?;
            self.current = Some(identity.clone());
            info!(
                "event=session_sign_in module=session status=ok role={}",
                identity.role.as_str()
            );
        }
        Ok(response)
    }

    /// Clears the persisted identity. Signing out twice is a no-op.
    pub fn sign_out(&mut self) -> SessionResult<()> {
        self.store.remove(CURRENT_IDENTITY_KEY)?;
        if self.current.take().is_some() {
            info!("event=session_sign_out module=session status=ok");
        }
        Ok(())
    }
}

/// Creates the default administrator the first time a database is used.
///
/// Returns the created account, or `None` when seeding already happened or
/// the `users` table already has accounts.
pub fn seed_default_user(
    bridge: &SqliteTableBridge<'_>,
    store: &impl SessionStore,
) -> SessionResult<Option<UserAccount>> {
    if store.get(DEFAULT_USER_SEEDED_KEY)?.is_some() {
        return Ok(None);
    }

    let existing = bridge.get_all_from_table(UserAccount::TABLE, &RowData::new())?;
    let created = if existing.is_empty() {
        let account = bridge.create_user(
            DEFAULT_ADMIN_USERNAME,
            DEFAULT_ADMIN_DISPLAY_NAME,
            Role::Administrator,
            DEFAULT_ADMIN_SECRET,
        )?;
        info!("event=default_user_seed module=session status=ok");
        Some(account)
    } else {
        None
    };

    store.set(DEFAULT_USER_SEEDED_KEY, &Value::Bool(true))?;
    Ok(created)
}
