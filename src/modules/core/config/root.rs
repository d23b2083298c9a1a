//! The configuration root: ordered providers merged into one key space

use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use super::key;
use super::provider::ConfigurationProvider;
use super::section::ConfigurationSection;
use crate::error::Result;

/// Section that `connection_string` reads from
pub const CONNECTION_STRINGS_SECTION: &str = "ConnectionStrings";

/// Merged view over an ordered list of providers.
///
/// A key resolves to the value of the last provider that defines it. Clones
/// share the same providers.
#[derive(Clone)]
pub struct Configuration {
    providers: Arc<RwLock<Vec<Box<dyn ConfigurationProvider>>>>,
}

impl Configuration {
    /// Create a configuration over already-loaded providers
    pub fn new(providers: Vec<Box<dyn ConfigurationProvider>>) -> Self {
        Self {
            providers: Arc::new(RwLock::new(providers)),
        }
    }

    /// A configuration with no providers
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of providers in this configuration
    pub fn provider_count(&self) -> usize {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Get a value by its full `:`-delimited key
    pub fn get(&self, key: &str) -> Option<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.iter().rev().find_map(|p| p.try_get(key))
    }

    /// Shorthand for `get("ConnectionStrings:<name>")`
    pub fn connection_string(&self, name: &str) -> Option<String> {
        self.get(&key::combine(CONNECTION_STRINGS_SECTION, name))
    }

    /// A view of the subtree at `key`. Always succeeds; use
    /// [`ConfigurationSection::exists`] to test for presence.
    pub fn section(&self, key: &str) -> ConfigurationSection {
        ConfigurationSection::new(self.clone(), key)
    }

    /// Top-level sections
    pub fn children(&self) -> Vec<ConfigurationSection> {
        self.root_section().children()
    }

    /// Every leaf value as `(full key, value)`, depth-first in key order
    pub fn entries(&self) -> Vec<(String, String)> {
        self.root_section().entries()
    }

    /// Deserialize the whole tree into `T`
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T> {
        self.root_section().get_as()
    }

    /// Re-run `load` on every provider, in order
    pub fn reload(&self) -> Result<()> {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for provider in providers.iter_mut() {
            provider.load()?;
        }
        debug!("Reloaded {} configuration providers", providers.len());
        Ok(())
    }

    fn root_section(&self) -> ConfigurationSection {
        ConfigurationSection::new(self.clone(), "")
    }

    /// Distinct child keys below `path` across all providers, in key order
    pub(crate) fn child_keys(&self, path: Option<&str>) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = Vec::new();
        for provider in providers.iter() {
            for child in provider.child_keys(path) {
                if !keys.iter().any(|k| key::keys_equal(k, &child)) {
                    keys.push(child);
                }
            }
        }
        keys.sort_by(|a, b| key::compare_keys(a, b));
        keys
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("providers", &self.provider_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigurationBuilder, MemorySource};

    fn layered() -> Configuration {
        let mut builder = ConfigurationBuilder::new();
        builder
            .add(MemorySource::new([
                ("Name", "base"),
                ("Logging:Level", "Info"),
                ("Servers:0", "alpha"),
                ("Servers:1", "beta"),
                ("ConnectionStrings:Default", "Server=one"),
            ]))
            .add(MemorySource::new([
                ("name", "override"),
                ("Servers:10", "kappa"),
                ("Servers:2", "gamma"),
            ]));
        builder.build().unwrap()
    }

    #[test]
    fn test_last_provider_wins() {
        let config = layered();
        assert_eq!(config.get("NAME"), Some("override".to_string()));
        assert_eq!(config.get("logging:level"), Some("Info".to_string()));
        assert_eq!(config.get("missing"), None);
        assert_eq!(config.provider_count(), 2);
    }

    #[test]
    fn test_children_are_merged_and_ordered() {
        let config = layered();
        let top: Vec<String> = config.children().iter().map(|s| s.key().to_string()).collect();
        assert_eq!(top, vec!["ConnectionStrings", "Logging", "Name", "Servers"]);

        let servers: Vec<String> = config
            .section("Servers")
            .children()
            .iter()
            .map(|s| s.key().to_string())
            .collect();
        assert_eq!(servers, vec!["0", "1", "2", "10"]);
    }

    #[test]
    fn test_entries_flatten_leaves() {
        let config = layered();
        let entries = config.entries();
        assert!(entries.contains(&("Logging:Level".to_string(), "Info".to_string())));
        assert!(entries.contains(&("Name".to_string(), "override".to_string())));
        assert_eq!(entries.len(), 7);
    }

    #[test]
    fn test_connection_string_shorthand() {
        let config = layered();
        assert_eq!(config.connection_string("default"), Some("Server=one".to_string()));
        assert_eq!(config.connection_string("other"), None);
    }
}
