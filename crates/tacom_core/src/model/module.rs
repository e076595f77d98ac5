//! Module keys and actions used as the unit of permission granularity.
//!
//! # Responsibility
//! - Enumerate every module key a grant may reference.
//! - Partition the key space into app modules and report modules.
//!
//! # Invariants
//! - Report keys, and only report keys, end in [`REPORT_KEY_SUFFIX`].
//! - `ModuleKey::parse(key.as_str()) == Ok(key)` for every key.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Suffix shared by every report module key.
pub const REPORT_KEY_SUFFIX: &str = "_report";

/// Application area gated by general grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AppModule {
    Dashboard,
    Companies,
    Equipments,
    Movements,
    Fleet,
    Protocols,
    Users,
    Settings,
}

impl AppModule {
    pub const ALL: [AppModule; 8] = [
        Self::Dashboard,
        Self::Companies,
        Self::Equipments,
        Self::Movements,
        Self::Fleet,
        Self::Protocols,
        Self::Users,
        Self::Settings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Companies => "companies",
            Self::Equipments => "equipments",
            Self::Movements => "movements",
            Self::Fleet => "fleet",
            Self::Protocols => "protocols",
            Self::Users => "users",
            Self::Settings => "settings",
        }
    }
}

/// Report screen gated by report grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportModule {
    Equipments,
    Movements,
    Fleet,
    Companies,
    Protocols,
}

impl ReportModule {
    pub const ALL: [ReportModule; 5] = [
        Self::Equipments,
        Self::Movements,
        Self::Fleet,
        Self::Companies,
        Self::Protocols,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equipments => "equipments_report",
            Self::Movements => "movements_report",
            Self::Fleet => "fleet_report",
            Self::Companies => "companies_report",
            Self::Protocols => "protocols_report",
        }
    }
}

/// Partition of the module key space. Grants are saved one namespace at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleNamespace {
    App,
    Report,
}

impl ModuleNamespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Report => "report",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ModuleKeyError> {
        match value.trim() {
            "app" => Ok(Self::App),
            "report" => Ok(Self::Report),
            "" => Err(ModuleKeyError::Empty),
            other => Err(ModuleKeyError::Unknown(other.to_string())),
        }
    }

    /// Every key belonging to this namespace, in declaration order.
    pub fn keys(self) -> Vec<ModuleKey> {
        match self {
            Self::App => AppModule::ALL.into_iter().map(ModuleKey::App).collect(),
            Self::Report => ReportModule::ALL
                .into_iter()
                .map(ModuleKey::Report)
                .collect(),
        }
    }
}

/// One key of the enumerated module space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleKey {
    App(AppModule),
    Report(ReportModule),
}

impl ModuleKey {
    /// Stable string stored in `user_permissions.module_name`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::App(module) => module.as_str(),
            Self::Report(module) => module.as_str(),
        }
    }

    pub fn namespace(self) -> ModuleNamespace {
        match self {
            Self::App(_) => ModuleNamespace::App,
            Self::Report(_) => ModuleNamespace::Report,
        }
    }

    /// Parses a persisted module key.
    ///
    /// The suffix decides which partition is searched, so an unknown
    /// `*_report` key is never mistaken for an app module.
    pub fn parse(value: &str) -> Result<Self, ModuleKeyError> {
        let normalized = value.trim();
        if normalized.is_empty() {
            return Err(ModuleKeyError::Empty);
        }

        let found = if normalized.ends_with(REPORT_KEY_SUFFIX) {
            ReportModule::ALL
                .into_iter()
                .find(|module| module.as_str() == normalized)
                .map(Self::Report)
        } else {
            AppModule::ALL
                .into_iter()
                .find(|module| module.as_str() == normalized)
                .map(Self::App)
        };

        found.ok_or_else(|| ModuleKeyError::Unknown(normalized.to_string()))
    }
}

impl Display for ModuleKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AppModule> for ModuleKey {
    fn from(value: AppModule) -> Self {
        Self::App(value)
    }
}

impl From<ReportModule> for ModuleKey {
    fn from(value: ReportModule) -> Self {
        Self::Report(value)
    }
}

/// Capability checked against a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionAction {
    View,
    Create,
    Edit,
    Delete,
}

impl PermissionAction {
    pub const ALL: [PermissionAction; 4] = [Self::View, Self::Create, Self::Edit, Self::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ModuleKeyError> {
        match value.trim() {
            "view" => Ok(Self::View),
            "create" => Ok(Self::Create),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            other => Err(ModuleKeyError::UnknownAction(other.to_string())),
        }
    }
}

/// Module key / action parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKeyError {
    Empty,
    Unknown(String),
    UnknownAction(String),
}

impl Display for ModuleKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "module key must not be empty"),
            Self::Unknown(value) => write!(f, "unknown module key: {value}"),
            Self::UnknownAction(value) => write!(f, "unknown permission action: {value}"),
        }
    }
}

impl Error for ModuleKeyError {}
