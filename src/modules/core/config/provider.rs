//! Provider and source traits

use std::fmt;
use std::path::PathBuf;

use super::builder::ConfigurationBuilder;
use crate::error::Result;

/// Broad category of a source, used when a source has to be positioned
/// relative to others (for example "after the last file source").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Memory,
    File,
    Environment,
    CommandLine,
    Chained,
    AddFile,
    Transform,
    Map,
    Other,
}

/// Supplies configuration key/values to a [`Configuration`](super::Configuration).
pub trait ConfigurationProvider: Send + Sync + fmt::Debug {
    /// (Re)load the provider's data
    fn load(&mut self) -> Result<()> {
        Ok(())
    }

    /// Look up a value by its full `:`-delimited key
    fn try_get(&self, key: &str) -> Option<String>;

    /// Immediate child segments below `parent_path` (the root when `None`)
    fn child_keys(&self, parent_path: Option<&str>) -> Vec<String>;
}

/// Describes how to create a provider.
///
/// Sources are collected by a [`ConfigurationBuilder`] and turned into
/// providers when the builder is built.
pub trait ConfigurationSource: Send + Sync + fmt::Debug {
    fn build(&self, builder: &ConfigurationBuilder) -> Result<Box<dyn ConfigurationProvider>>;

    fn kind(&self) -> SourceKind {
        SourceKind::Other
    }

    /// Files whose changes should trigger a reload of the built configuration
    fn watch_paths(&self, _builder: &ConfigurationBuilder) -> Vec<PathBuf> {
        Vec::new()
    }
}
