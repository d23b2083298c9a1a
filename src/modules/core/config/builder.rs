//! Composition of configuration sources

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::chained::ChainedSource;
use super::memory::MemorySource;
use super::provider::{ConfigurationSource, SourceKind};
use super::root::Configuration;
use crate::error::Result;

/// Collects sources in order; later sources override earlier ones.
#[derive(Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Box<dyn ConfigurationSource>>,
    base_path: Option<PathBuf>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source
    pub fn add<S: ConfigurationSource + 'static>(&mut self, source: S) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Append an already-boxed source
    pub fn add_boxed(&mut self, source: Box<dyn ConfigurationSource>) -> &mut Self {
        self.sources.push(source);
        self
    }

    /// Insert a source at `index` (clamped to the end)
    pub fn insert<S: ConfigurationSource + 'static>(&mut self, index: usize, source: S) -> &mut Self {
        let index = index.min(self.sources.len());
        self.sources.insert(index, Box::new(source));
        self
    }

    /// Add in-memory key/value pairs
    pub fn add_in_memory<K, V>(&mut self, data: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.add(MemorySource::new(data))
    }

    /// Layer an existing configuration
    pub fn add_configuration(&mut self, configuration: Configuration) -> &mut Self {
        self.add(ChainedSource::new(configuration))
    }

    pub fn sources(&self) -> &[Box<dyn ConfigurationSource>] {
        &self.sources
    }

    /// Index of the last source of the given kind
    pub fn last_index_of(&self, kind: SourceKind) -> Option<usize> {
        self.sources.iter().rposition(|s| s.kind() == kind)
    }

    /// Directory that relative file paths resolve against
    pub fn set_base_path(&mut self, base_path: impl Into<PathBuf>) -> &mut Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    /// Resolve `path` against the base path if it is relative
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Files that sources asked to be watched for changes
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for path in self.sources.iter().flat_map(|s| s.watch_paths(self)) {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Build every source into a provider, load it, and return the merged
    /// configuration
    pub fn build(&self) -> Result<Configuration> {
        let mut providers = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let mut provider = source.build(self)?;
            provider.load()?;
            providers.push(provider);
        }
        debug!("Built configuration from {} sources", providers.len());
        Ok(Configuration::new(providers))
    }
}

impl fmt::Debug for ConfigurationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationBuilder")
            .field("sources", &self.sources)
            .field("base_path", &self.base_path)
            .finish()
    }
}
