//! Fluent query adapter over the host bridge primitives.
//!
//! # Responsibility
//! - Offer the `select/eq/neq/ilike/order/limit`, `insert`, `update().eq()`
//!   and `delete().eq()` chain existing callers are written against.
//! - Reach storage only through [`HostBridge`] primitives.
//!
//! # Invariants
//! - A detached adapter fails every terminal with [`BridgeUnavailable`];
//!   it never pretends to succeed.
//! - Every other outcome, including backend failures, settles into a
//!   [`QueryResponse`].
//! - `update().eq()` and `delete().eq()` touch only the first matching row.

use crate::bridge::HostBridge;
use crate::model::identity::Identity;
use log::{error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod compare;
mod query;

pub use query::{DeleteQuery, OrderOptions, SelectQuery, TableQuery, UpdateQuery};

/// Soft error reported when `update().eq()` changes nothing.
pub const UPDATE_FAILED: &str = "Update failed";
/// Soft error reported when `delete().eq()` removes nothing.
pub const DELETE_FAILED: &str = "Delete failed";
/// Soft error reported when the login primitive rejects the credentials.
pub const INVALID_CREDENTIALS: &str = "Invalid login credentials";

/// Outcome of one terminal adapter call.
pub type AdapterResult<T> = Result<QueryResponse<T>, BridgeUnavailable>;

/// `{data, error}` pair returned by every terminal call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> QueryResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.data, self.error) {
            (_, Some(message)) => Err(message),
            (Some(data), None) => Ok(data),
            (None, None) => Err("response carried no data".to_string()),
        }
    }
}

/// Environment error: no host bridge is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeUnavailable;

impl Display for BridgeUnavailable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "host bridge is not available")
    }
}

impl Error for BridgeUnavailable {}

/// Entry point of the query chain. Cheap to copy.
#[derive(Clone, Copy)]
pub struct AccessAdapter<'b> {
    bridge: Option<&'b dyn HostBridge>,
}

impl<'b> AccessAdapter<'b> {
    pub fn new(bridge: &'b dyn HostBridge) -> Self {
        Self {
            bridge: Some(bridge),
        }
    }

    /// Adapter for a process running outside the hosting shell.
    pub fn detached() -> Self {
        Self { bridge: None }
    }

    pub fn is_attached(&self) -> bool {
        self.bridge.is_some()
    }

    /// Starts a chain against `table`.
    pub fn from_table(&self, table: impl Into<String>) -> TableQuery<'b> {
        TableQuery::new(*self, table.into())
    }

    pub fn auth(&self) -> AuthShim<'b> {
        AuthShim { adapter: *self }
    }

    fn bridge(&self) -> Result<&'b dyn HostBridge, BridgeUnavailable> {
        self.bridge.ok_or_else(|| {
            error!("event=adapter_call module=adapter status=error error_code=bridge_unavailable");
            BridgeUnavailable
        })
    }
}

/// Password sign-in routed through the bridge `login` primitive.
#[derive(Clone, Copy)]
pub struct AuthShim<'b> {
    adapter: AccessAdapter<'b>,
}

impl AuthShim<'_> {
    pub fn sign_in_with_password(&self, identifier: &str, secret: &str) -> AdapterResult<Identity> {
        let bridge = self.adapter.bridge()?;
        Ok(match bridge.login(identifier, secret) {
            Ok(Some(identity)) => QueryResponse::ok(identity),
            Ok(None) => QueryResponse::failed(INVALID_CREDENTIALS),
            Err(err) => {
                warn!("event=sign_in module=adapter status=error error={err}");
                QueryResponse::failed(err.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::QueryResponse;

    #[test]
    fn response_into_result_prefers_error() {
        let ok = QueryResponse::ok(3);
        assert!(ok.is_ok());
        assert_eq!(ok.into_result(), Ok(3));

        let failed: QueryResponse<i32> = QueryResponse::failed("Update failed");
        assert!(!failed.is_ok());
        assert_eq!(failed.into_result(), Err("Update failed".to_string()));
    }
}
