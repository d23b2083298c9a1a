//! Source that layers an existing configuration into a new one

use super::builder::ConfigurationBuilder;
use super::provider::{ConfigurationProvider, ConfigurationSource, SourceKind};
use super::root::Configuration;
use crate::error::Result;

/// Exposes an already-built [`Configuration`] as a single provider
#[derive(Debug, Clone)]
pub struct ChainedSource {
    configuration: Configuration,
}

impl ChainedSource {
    pub fn new(configuration: Configuration) -> Self {
        Self { configuration }
    }
}

impl ConfigurationSource for ChainedSource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Result<Box<dyn ConfigurationProvider>> {
        Ok(Box::new(ChainedProvider::new(self.configuration.clone())))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Chained
    }
}

/// Provider delegating every lookup to a wrapped configuration
#[derive(Debug, Clone)]
pub struct ChainedProvider {
    configuration: Configuration,
}

impl ChainedProvider {
    pub fn new(configuration: Configuration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }
}

impl ConfigurationProvider for ChainedProvider {
    /// Reloading a chained provider reloads the wrapped configuration
    fn load(&mut self) -> Result<()> {
        self.configuration.reload()
    }

    fn try_get(&self, key: &str) -> Option<String> {
        self.configuration.get(key)
    }

    fn child_keys(&self, parent_path: Option<&str>) -> Vec<String> {
        self.configuration.child_keys(parent_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySource;

    #[test]
    fn test_chained_configuration_is_layered() {
        let mut inner = ConfigurationBuilder::new();
        inner.add(MemorySource::new([("Db:Host", "inner"), ("Db:Port", "5432")]));
        let inner = inner.build().unwrap();

        let mut outer = ConfigurationBuilder::new();
        outer
            .add(ChainedSource::new(inner))
            .add(MemorySource::new([("Db:Host", "outer")]));
        let config = outer.build().unwrap();

        assert_eq!(config.get("db:host"), Some("outer".to_string()));
        assert_eq!(config.get("db:port"), Some("5432".to_string()));
        assert_eq!(config.section("Db").children().len(), 2);
    }
}
