//! In-memory key/value source

use super::builder::ConfigurationBuilder;
use super::data::ConfigData;
use super::provider::{ConfigurationProvider, ConfigurationSource, SourceKind};
use crate::error::Result;

/// Source backed by a fixed list of key/value pairs
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    initial: Vec<(String, String)>,
}

impl MemorySource {
    pub fn new<K, V>(initial: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            initial: initial
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigurationSource for MemorySource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Result<Box<dyn ConfigurationProvider>> {
        Ok(Box::new(MemoryProvider::new(self.initial.iter().cloned())))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Memory
    }
}

/// Provider holding mutable in-memory data
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    data: ConfigData,
}

impl MemoryProvider {
    pub fn new<K, V>(initial: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: initial.into_iter().collect(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.set(key, value);
    }

    pub fn data(&self) -> &ConfigData {
        &self.data
    }
}

impl ConfigurationProvider for MemoryProvider {
    fn try_get(&self, key: &str) -> Option<String> {
        self.data.get(key).map(str::to_string)
    }

    fn child_keys(&self, parent_path: Option<&str>) -> Vec<String> {
        self.data.child_keys(parent_path)
    }
}
