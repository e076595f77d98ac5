//! Core of the TACOM equipment inventory desktop app.
//!
//! Owns the local table store, the query adapter existing screens are written
//! against, the permission engine and the signed-in session.

pub mod adapter;
pub mod bridge;
pub mod db;
pub mod logging;
pub mod model;
pub mod permission;
pub mod repo;
pub mod session;

pub use adapter::{
    AccessAdapter, AdapterResult, BridgeUnavailable, OrderOptions, QueryResponse, DELETE_FAILED,
    INVALID_CREDENTIALS, UPDATE_FAILED,
};
pub use bridge::{BridgeError, BridgeResult, HostBridge, SqliteTableBridge, BRIDGED_TABLES};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::grant::{Capabilities, GrantSet, PermissionGrant};
pub use model::identity::{Identity, IdentityId, Role};
pub use model::module::{
    AppModule, ModuleKey, ModuleKeyError, ModuleNamespace, PermissionAction, ReportModule,
};
pub use model::records::{Company, Equipment, UserAccount};
pub use model::row::{RowData, RowError, RowId, TableRecord, TableRow};
pub use permission::{PermissionEngine, PermissionError};
pub use repo::grant_repo::{GrantRepository, RepoError, RepoResult, SqliteGrantRepository};
pub use session::{
    seed_default_user, Session, SessionError, SessionResult, SessionStore, SqliteSessionStore,
};

/// Minimal health-check API for shell integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
