//! Signed-in identity model.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable user id as stored in `users.id`.
pub type IdentityId = String;

/// Account role. Administrators bypass per-module grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Administrator,
    #[serde(rename = "operational")]
    Operational,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "admin",
            Self::Operational => "operational",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownRole> {
        match value.trim() {
            "admin" => Ok(Self::Administrator),
            "operational" => Ok(Self::Operational),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl Display for UnknownRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl Error for UnknownRole {}

/// Who is signed in. Persisted as JSON by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub display_name: String,
    pub role: Role,
}

impl Identity {
    pub fn new(id: impl Into<IdentityId>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}
