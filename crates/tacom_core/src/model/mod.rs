//! Domain model shared by the adapter, permission engine and session.
//!
//! # Invariants
//! - Schema-less rows ([`row::TableRow`]) stop at the adapter boundary.
//! - Permission decisions only see typed grants and identities.

pub mod grant;
pub mod identity;
pub mod module;
pub mod records;
pub mod row;
