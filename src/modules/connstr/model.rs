//! Connection-string records and the name-indexed collection

use layerconf_core::{Configuration, Result};
use layerconf_types::{DbProvider, ProviderName};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;

use crate::utilities;

/// How connection names and token names are normalized before lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyNormalizer {
    /// Strip leading and trailing whitespace
    #[default]
    Trim,
    /// Use names verbatim
    PreserveSpace,
}

impl KeyNormalizer {
    pub fn normalize<'a>(&self, key: &'a str) -> &'a str {
        match self {
            KeyNormalizer::Trim => key.trim(),
            KeyNormalizer::PreserveSpace => key,
        }
    }
}

impl fmt::Display for KeyNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyNormalizer::Trim => write!(f, "trim"),
            KeyNormalizer::PreserveSpace => write!(f, "preserve-space"),
        }
    }
}

/// Case-insensitive comparison key for connection names
pub(crate) fn fold(name: &str) -> String {
    name.to_uppercase()
}

/// A named connection string with its provider.
///
/// `raw` is the configured value; `expanded` is set once tokens have been
/// substituted. [`value`](Self::value) returns whichever applies.
#[derive(Clone)]
pub struct ProviderConnectionString {
    name: String,
    raw: String,
    expanded: Option<String>,
    provider: ProviderName,
    configuration: OnceCell<Configuration>,
}

impl ProviderConnectionString {
    pub fn new(name: impl Into<String>, raw: impl Into<String>, provider: ProviderName) -> Self {
        Self {
            name: name.into(),
            raw: raw.into(),
            expanded: None,
            provider,
            configuration: OnceCell::new(),
        }
    }

    /// A connection with the `Custom` provider and no custom name
    pub fn unclassified(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::new(name, raw, ProviderName::kind_only(DbProvider::Custom))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn expanded(&self) -> Option<&str> {
        self.expanded.as_deref()
    }

    /// The expanded value, or the raw value until expansion happened
    pub fn value(&self) -> &str {
        self.expanded.as_deref().unwrap_or(&self.raw)
    }

    pub(crate) fn set_expanded(&mut self, expanded: String) {
        self.expanded = Some(expanded);
        self.configuration = OnceCell::new();
    }

    pub fn provider(&self) -> &ProviderName {
        &self.provider
    }

    pub fn kind(&self) -> DbProvider {
        self.provider.kind()
    }

    pub fn custom_name(&self) -> Option<&str> {
        self.provider.custom_name()
    }

    /// The `key=value;...` pairs of the value as a configuration.
    ///
    /// Parsed on first use and kept for later calls.
    pub fn to_configuration(&self) -> Result<&Configuration> {
        self.configuration
            .get_or_try_init(|| utilities::to_configuration(self.value()))
    }

    /// Bind the `key=value;...` pairs of the value to `T`
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T> {
        self.to_configuration()?.get_as()
    }
}

impl PartialEq for ProviderConnectionString {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.raw == other.raw
            && self.expanded == other.expanded
            && self.provider == other.provider
    }
}

impl Eq for ProviderConnectionString {}

impl fmt::Debug for ProviderConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConnectionString")
            .field("name", &self.name)
            .field("raw", &self.raw)
            .field("expanded", &self.expanded)
            .field("provider", &self.provider)
            .finish()
    }
}

/// Resolved connection strings keyed by name, case-insensitively.
///
/// Iteration follows insertion order, which for a parsed result is the
/// order in which connections were resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStrings {
    items: Vec<ProviderConnectionString>,
    index: HashMap<String, usize>,
}

impl ConnectionStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection unless one with the same name exists.
    /// Returns false when the name was already taken.
    pub fn insert(&mut self, connection: ProviderConnectionString) -> bool {
        let key = fold(connection.name());
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.items.len());
        self.items.push(connection);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ProviderConnectionString> {
        self.index.get(&fold(name)).map(|&i| &self.items[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&fold(name))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProviderConnectionString> {
        self.items.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|c| c.name())
    }
}

impl<'a> IntoIterator for &'a ConnectionStrings {
    type Item = &'a ProviderConnectionString;
    type IntoIter = std::slice::Iter<'a, ProviderConnectionString>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<ProviderConnectionString> for ConnectionStrings {
    fn from_iter<I: IntoIterator<Item = ProviderConnectionString>>(iter: I) -> Self {
        let mut connections = ConnectionStrings::new();
        for connection in iter {
            connections.insert(connection);
        }
        connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalizer() {
        assert_eq!(KeyNormalizer::Trim.normalize("  main "), "main");
        assert_eq!(KeyNormalizer::PreserveSpace.normalize("  main "), "  main ");
    }

    #[test]
    fn test_value_falls_back_to_raw() {
        let mut connection = ProviderConnectionString::unclassified("main", "Server=${host}");
        assert_eq!(connection.value(), "Server=${host}");
        assert_eq!(connection.expanded(), None);

        connection.set_expanded("Server=db".into());
        assert_eq!(connection.value(), "Server=db");
        assert_eq!(connection.raw(), "Server=${host}");
    }

    #[test]
    fn test_collection_first_insert_wins() {
        let mut connections = ConnectionStrings::new();
        assert!(connections.insert(ProviderConnectionString::new(
            "Main",
            "a",
            ProviderName::kind_only(DbProvider::SqlServer)
        )));
        assert!(!connections.insert(ProviderConnectionString::unclassified("MAIN", "b")));

        assert_eq!(connections.len(), 1);
        assert_eq!(connections.get("main").unwrap().raw(), "a");
        assert!(connections.contains("mAiN"));
        assert!(connections.get("other").is_none());
    }

    #[test]
    fn test_configuration_is_cached() {
        let connection = ProviderConnectionString::unclassified("svc", "Host=db;Port=5432");
        let first = connection.to_configuration().unwrap() as *const Configuration;
        let second = connection.to_configuration().unwrap() as *const Configuration;
        assert_eq!(first, second);
        assert_eq!(
            connection.to_configuration().unwrap().get("port"),
            Some("5432".to_string())
        );
    }
}
