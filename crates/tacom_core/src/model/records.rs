//! Typed records of the bridged tables.
//!
//! Callers above the adapter work with these instead of raw [`TableRow`]s.
//!
//! [`TableRow`]: crate::model::row::TableRow

use crate::model::identity::{Identity, IdentityId, Role};
use crate::model::row::{RowId, TableRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public projection of a `users` row. Password columns never reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: IdentityId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl UserAccount {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id.clone(), self.display_name.clone(), self.role)
    }
}

impl TableRecord for UserAccount {
    const TABLE: &'static str = "users";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: RowId,
    pub name: String,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            cnpj: None,
            created_at: None,
        }
    }
}

impl TableRecord for Company {
    const TABLE: &'static str = "companies";
}

/// One equipment line of the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: RowId,
    #[serde(default)]
    pub company_id: Option<RowId>,
    pub name: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    pub status: String,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Equipment {
    pub const STATUS_AVAILABLE: &'static str = "available";

    pub fn new(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            company_id: None,
            name: name.into(),
            serial_number: None,
            status: Self::STATUS_AVAILABLE.to_string(),
            quantity,
            created_at: None,
        }
    }
}

impl TableRecord for Equipment {
    const TABLE: &'static str = "equipments";
}
