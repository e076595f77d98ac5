//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the table primitives, sign-in and permission checks to Dart via FRB.
//! - Translate core results into flat response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call opens its own connection on the configured database file.
//! - Row payloads cross the boundary as JSON text.

use log::warn;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::OnceLock;
use tacom_core::db::open_db;
use tacom_core::session::CURRENT_IDENTITY_KEY;
use tacom_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    seed_default_user, AccessAdapter, Capabilities, HostBridge, Identity, ModuleKey,
    ModuleNamespace, PermissionAction, PermissionEngine, PermissionGrant, RowData, Session,
    SessionStore, SqliteGrantRepository, SqliteSessionStore, SqliteTableBridge,
};

const DB_FILE_NAME: &str = "tacom.sqlite3";
const DB_PATH_ENV: &str = "TACOM_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Rows returned by a table fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowsResponse {
    pub ok: bool,
    /// JSON array of row objects; `[]` on failure.
    pub rows_json: String,
    pub message: String,
}

/// Single row returned by an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowResponse {
    pub ok: bool,
    /// Stored row as a JSON object.
    pub row_json: Option<String>,
    pub message: String,
}

/// Outcome of an update, delete or grant save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Whether a stored row changed. Always `false` when `ok` is `false`.
    pub changed: bool,
    pub message: String,
}

impl ActionResponse {
    fn success(changed: bool) -> Self {
        Self {
            ok: true,
            changed,
            message: if changed { "Saved." } else { "No matching row." }.to_string(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            changed: false,
            message: message.into(),
        }
    }
}

/// Signed-in identity as seen by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityView {
    pub id: String,
    pub display_name: String,
    /// `admin` or `operational`.
    pub role: String,
}

impl From<&Identity> for IdentityView {
    fn from(value: &Identity) -> Self {
        Self {
            id: value.id.clone(),
            display_name: value.display_name.clone(),
            role: value.role.as_str().to_string(),
        }
    }
}

/// Session envelope for login, logout and restore calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResponse {
    pub ok: bool,
    pub identity: Option<IdentityView>,
    pub message: String,
}

impl SessionResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            identity: None,
            message: message.into(),
        }
    }
}

/// Returns rows of `table` matching every pair in `filter_json`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - `filter_json` is a JSON object or empty (no filter).
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn get_all_from_table(table: String, filter_json: String) -> TableRowsResponse {
    let result = parse_row_data(&filter_json).and_then(|filter| {
        with_store(|_, bridge| {
            let rows = bridge
                .get_all_from_table(table.trim(), &filter)
                .map_err(|err| err.to_string())?;
            serde_json::to_string(&rows).map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(rows_json) => TableRowsResponse {
            ok: true,
            rows_json,
            message: String::new(),
        },
        Err(err) => TableRowsResponse {
            ok: false,
            rows_json: "[]".to_string(),
            message: format!("get_all_from_table failed: {err}"),
        },
    }
}

/// Inserts `row_json` into `table` and returns the stored row.
#[flutter_rust_bridge::frb(sync)]
pub fn insert_into_table(table: String, row_json: String) -> TableRowResponse {
    let result = parse_row_data(&row_json).and_then(|row| {
        with_store(|_, bridge| {
            let stored = bridge
                .insert_into_table(table.trim(), row)
                .map_err(|err| err.to_string())?;
            serde_json::to_string(&stored).map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(row_json) => TableRowResponse {
            ok: true,
            row_json: Some(row_json),
            message: "Row created.".to_string(),
        },
        Err(err) => TableRowResponse {
            ok: false,
            row_json: None,
            message: format!("insert_into_table failed: {err}"),
        },
    }
}

/// Applies `patch_json` to the row of `table` with `id`.
#[flutter_rust_bridge::frb(sync)]
pub fn update_in_table(table: String, id: String, patch_json: String) -> ActionResponse {
    let result = parse_row_data(&patch_json).and_then(|patch| {
        with_store(|_, bridge| {
            bridge
                .update_in_table(table.trim(), id.trim(), &patch)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(changed) => ActionResponse::success(changed),
        Err(err) => ActionResponse::failure(format!("update_in_table failed: {err}")),
    }
}

/// Removes the row of `table` with `id`.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_from_table(table: String, id: String) -> ActionResponse {
    let result = with_store(|_, bridge| {
        bridge
            .delete_from_table(table.trim(), id.trim())
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(changed) => ActionResponse::success(changed),
        Err(err) => ActionResponse::failure(format!("delete_from_table failed: {err}")),
    }
}

/// Signs in and persists the identity for later calls.
///
/// # FFI contract
/// - Rejected credentials return `ok=false` and keep the previous session.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn login(identifier: String, secret: String) -> SessionResponse {
    let result = with_store(|conn, bridge| {
        let mut session = Session::restore_or_clear(SqliteSessionStore::new(conn))
            .map_err(|err| err.to_string())?;
        let adapter = AccessAdapter::new(bridge);
        session
            .sign_in(&adapter, &identifier, &secret)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(response) => match (response.data, response.error) {
            (Some(identity), None) => SessionResponse {
                ok: true,
                identity: Some(IdentityView::from(&identity)),
                message: "Signed in.".to_string(),
            },
            (_, Some(message)) => SessionResponse::failure(message),
            (None, None) => SessionResponse::failure("login returned no identity"),
        },
        Err(err) => SessionResponse::failure(format!("login failed: {err}")),
    }
}

/// Clears the persisted identity, readable or not. Safe to call when nobody
/// is signed in.
#[flutter_rust_bridge::frb(sync)]
pub fn logout() -> SessionResponse {
    let result = with_store(|conn, _| {
        SqliteSessionStore::new(conn)
            .remove(CURRENT_IDENTITY_KEY)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(()) => SessionResponse {
            ok: true,
            identity: None,
            message: "Signed out.".to_string(),
        },
        Err(err) => SessionResponse::failure(format!("logout failed: {err}")),
    }
}

/// Returns the persisted identity, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn current_identity() -> SessionResponse {
    let result = with_store(|conn, _| {
        let session =
            Session::restore(SqliteSessionStore::new(conn)).map_err(|err| err.to_string())?;
        Ok(session.current().map(IdentityView::from))
    });
    match result {
        Ok(identity) => SessionResponse {
            ok: true,
            message: if identity.is_some() {
                "Signed in."
            } else {
                "Not signed in."
            }
            .to_string(),
            identity,
        },
        Err(err) => SessionResponse::failure(format!("current_identity failed: {err}")),
    }
}

/// Whether the signed-in identity may perform `action` on `module`.
///
/// # FFI contract
/// - Unknown keys, no session and store failures all answer `false`.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn check_permission(module: String, action: String) -> bool {
    match evaluate_permission(&module, &action) {
        Ok(allowed) => allowed,
        Err(err) => {
            warn!("event=permission_check module=ffi status=error error={err}");
            false
        }
    }
}

/// Replaces `subject_id`'s grants in `namespace` (`app` or `report`).
///
/// Input semantics:
/// - `grants_json`: JSON array of
///   `{module_name, can_view, can_create, can_edit, can_delete}`; missing
///   flags read as `false`.
///
/// # FFI contract
/// - Requires a signed-in administrator.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn save_permissions(
    subject_id: String,
    namespace: String,
    grants_json: String,
) -> ActionResponse {
    match save_permissions_inner(subject_id.trim(), &namespace, &grants_json) {
        Ok(()) => ActionResponse::success(true),
        Err(err) => ActionResponse::failure(format!("save_permissions failed: {err}")),
    }
}

#[derive(Debug, Deserialize)]
struct GrantInput {
    module_name: String,
    #[serde(default)]
    can_view: bool,
    #[serde(default)]
    can_create: bool,
    #[serde(default)]
    can_edit: bool,
    #[serde(default)]
    can_delete: bool,
}

fn evaluate_permission(module: &str, action: &str) -> Result<bool, String> {
    let module = ModuleKey::parse(module).map_err(|err| err.to_string())?;
    let action = PermissionAction::parse(action).map_err(|err| err.to_string())?;
    with_store(|conn, _| {
        let session =
            Session::restore(SqliteSessionStore::new(conn)).map_err(|err| err.to_string())?;
        let Some(identity) = session.current() else {
            return Ok(false);
        };
        let repo = SqliteGrantRepository::try_new(conn).map_err(|err| err.to_string())?;
        let mut engine = PermissionEngine::new(repo);
        engine.load_for(identity).map_err(|err| err.to_string())?;
        Ok(engine.can(identity, module, action))
    })
}

fn save_permissions_inner(
    subject_id: &str,
    namespace: &str,
    grants_json: &str,
) -> Result<(), String> {
    let namespace = ModuleNamespace::parse(namespace).map_err(|err| err.to_string())?;
    let inputs: Vec<GrantInput> =
        serde_json::from_str(grants_json).map_err(|err| format!("invalid grants JSON: {err}"))?;
    let grants = inputs
        .into_iter()
        .map(|input| -> Result<PermissionGrant, String> {
            let module = ModuleKey::parse(&input.module_name).map_err(|err| err.to_string())?;
            Ok(PermissionGrant::new(
                subject_id,
                module,
                Capabilities {
                    can_view: input.can_view,
                    can_create: input.can_create,
                    can_edit: input.can_edit,
                    can_delete: input.can_delete,
                },
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    with_store(|conn, _| {
        let session =
            Session::restore(SqliteSessionStore::new(conn)).map_err(|err| err.to_string())?;
        let actor = session
            .current()
            .ok_or_else(|| "not signed in".to_string())?;
        let repo = SqliteGrantRepository::try_new(conn).map_err(|err| err.to_string())?;
        PermissionEngine::new(repo)
            .save_grants(actor, subject_id, namespace, &grants)
            .map_err(|err| err.to_string())
    })
}

fn parse_row_data(raw: &str) -> Result<RowData, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(RowData::new());
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(err) => Err(format!("invalid JSON: {err}")),
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

/// Opens the store, seeds the default administrator on first use and runs `f`.
fn with_store<T>(
    f: impl FnOnce(&Connection, &SqliteTableBridge<'_>) -> Result<T, String>,
) -> Result<T, String> {
    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("database open failed: {err}"))?;
    let bridge = SqliteTableBridge::try_new(&conn)
        .map_err(|err| format!("table bridge init failed: {err}"))?;
    seed_default_user(&bridge, &SqliteSessionStore::new(&conn))
        .map_err(|err| format!("default user seed failed: {err}"))?;
    f(&conn, &bridge)
}
