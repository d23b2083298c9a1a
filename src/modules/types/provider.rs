//! Database provider type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Known database provider kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbProvider {
    /// Microsoft SQL Server (including Azure SQL)
    SqlServer,
    /// MySQL
    MySql,
    /// PostgreSQL
    PostgreSql,
    /// Anything else; the provider string as written is kept on [`ProviderName`]
    Custom,
}

impl fmt::Display for DbProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbProvider::SqlServer => write!(f, "sqlserver"),
            DbProvider::MySql => write!(f, "mysql"),
            DbProvider::PostgreSql => write!(f, "postgresql"),
            DbProvider::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for DbProvider {
    type Err = String;

    /// Parses a provider alias. `custom` is accepted as the name of the
    /// [`DbProvider::Custom`] kind itself.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("custom") {
            return Ok(DbProvider::Custom);
        }
        DbProvider::from_alias(s).ok_or_else(|| format!("Unknown database provider: {}", s))
    }
}

impl DbProvider {
    /// Returns all provider kinds
    pub fn all() -> &'static [DbProvider] {
        &[
            DbProvider::SqlServer,
            DbProvider::MySql,
            DbProvider::PostgreSql,
            DbProvider::Custom,
        ]
    }

    /// Map a driver or provider alias to a known kind, case-insensitively.
    ///
    /// Returns `None` for anything that is not a known alias, including
    /// `custom`.
    pub fn from_alias(alias: &str) -> Option<DbProvider> {
        match alias.to_lowercase().as_str() {
            "sqlserver" | "mssql" | "sqlazure" | "system.data.sqlclient"
            | "microsoft.data.sqlclient" => Some(DbProvider::SqlServer),
            "mysql" | "mysql.data.mysqlclient" | "mysqlconnector" => Some(DbProvider::MySql),
            "postgresql" | "npgsql" | "postgres" => Some(DbProvider::PostgreSql),
            _ => None,
        }
    }

    /// Returns true if this is the free-form custom kind
    pub fn is_custom(&self) -> bool {
        matches!(self, DbProvider::Custom)
    }
}

/// A provider kind plus, for [`DbProvider::Custom`], the free-form name.
///
/// Equality and hashing compare the custom name case-insensitively, so a
/// `ProviderName` can key a cache directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawProviderName")]
pub struct ProviderName {
    kind: DbProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom: Option<String>,
}

#[derive(Deserialize)]
struct RawProviderName {
    kind: DbProvider,
    #[serde(default)]
    custom: Option<String>,
}

impl From<RawProviderName> for ProviderName {
    fn from(raw: RawProviderName) -> Self {
        Self::new(raw.kind, raw.custom)
    }
}

impl ProviderName {
    /// Create a provider name. `custom` is dropped unless `kind` is
    /// [`DbProvider::Custom`] and the name is not blank.
    pub fn new(kind: DbProvider, custom: Option<String>) -> Self {
        let custom = match kind {
            DbProvider::Custom => custom.filter(|c| !c.trim().is_empty()),
            _ => None,
        };
        Self { kind, custom }
    }

    /// A known provider kind without a custom name
    pub fn kind_only(kind: DbProvider) -> Self {
        Self::new(kind, None)
    }

    /// A custom provider with the given name
    pub fn custom(name: impl Into<String>) -> Self {
        Self::new(DbProvider::Custom, Some(name.into()))
    }

    /// Classify a provider string.
    ///
    /// Known aliases map to their kind; any other non-blank string becomes
    /// `Custom` with the string as written; blank or absent
    /// input becomes `Custom` with no name.
    pub fn classify(provider: Option<&str>) -> Self {
        match provider {
            Some(p) => match DbProvider::from_alias(p) {
                Some(kind) => Self::kind_only(kind),
                None => Self::new(DbProvider::Custom, Some(p.to_string())),
            },
            None => Self::kind_only(DbProvider::Custom),
        }
    }

    pub fn kind(&self) -> DbProvider {
        self.kind
    }

    pub fn custom_name(&self) -> Option<&str> {
        self.custom.as_deref()
    }
}

impl PartialEq for ProviderName {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (&self.custom, &other.custom) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

impl Eq for ProviderName {}

impl Hash for ProviderName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        if let Some(custom) = &self.custom {
            custom.to_ascii_lowercase().hash(state);
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.custom {
            Some(custom) => write!(f, "{}({})", self.kind, custom),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl From<DbProvider> for ProviderName {
    fn from(kind: DbProvider) -> Self {
        Self::kind_only(kind)
    }
}
