//! Consumer-facing lookup over a configuration's connection strings

use layerconf_core::{Configuration, ConfigError, Result, CONNECTION_STRINGS_SECTION};
use layerconf_types::{ProviderName, Selector};
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::model::{ConnectionStrings, KeyNormalizer, ProviderConnectionString};
use crate::root::ConnectionStringsRoot;

/// Looks up connection strings by name, optionally restricted to one
/// provider.
///
/// Nothing is parsed until the first lookup. Clones made with
/// [`clone_with_provider`](Self::clone_with_provider) share the parsed
/// results of this manager.
#[derive(Debug, Clone)]
pub struct ConnectionStringManager {
    root: Arc<ConnectionStringsRoot>,
    provider: Option<ProviderName>,
    connection_strings: OnceCell<Arc<ConnectionStrings>>,
}

impl ConnectionStringManager {
    /// Read the leaf values of `section_name` (the whole configuration when
    /// empty). A missing section yields no connection strings.
    pub fn new(configuration: &Configuration, section_name: &str) -> Self {
        let children = if section_name.is_empty() {
            configuration.children()
        } else {
            configuration.section(section_name).children()
        };
        let entries = children
            .into_iter()
            .filter_map(|child| child.value().map(|value| (child.key().to_string(), value)))
            .collect();
        Self::from_root(ConnectionStringsRoot::new(entries, KeyNormalizer::Trim))
    }

    /// Read the `ConnectionStrings` section
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self::new(configuration, CONNECTION_STRINGS_SECTION)
    }

    pub fn from_root(root: ConnectionStringsRoot) -> Self {
        Self::with_root(Arc::new(root), None)
    }

    fn with_root(root: Arc<ConnectionStringsRoot>, provider: Option<ProviderName>) -> Self {
        Self {
            root,
            provider,
            connection_strings: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Arc<ConnectionStringsRoot> {
        &self.root
    }

    /// The provider selection, `None` for all providers
    pub fn provider(&self) -> Option<&ProviderName> {
        self.provider.as_ref()
    }

    pub fn key_normalizer(&self) -> KeyNormalizer {
        self.root.key_normalizer()
    }

    /// A manager over the same entries restricted to `selector`
    pub fn clone_with_provider(&self, selector: impl Into<Selector>) -> Self {
        Self::with_root(Arc::clone(&self.root), selector.into().to_provider_name())
    }

    /// Like [`clone_with_provider`](Self::clone_with_provider) for an untyped
    /// selector; only strings and null are accepted.
    pub fn clone_with_provider_value(&self, selector: &serde_json::Value) -> Result<Self> {
        let selector = Selector::try_from(selector).map_err(ConfigError::InvalidSelector)?;
        Ok(self.clone_with_provider(selector))
    }

    /// A manager that looks names up without trimming whitespace
    pub fn clone_with_key_preserve_space(&self) -> Self {
        if self.root.key_normalizer() == KeyNormalizer::PreserveSpace {
            return self.clone();
        }
        Self::with_root(
            Arc::new(self.root.with_key_normalizer(KeyNormalizer::PreserveSpace)),
            self.provider.clone(),
        )
    }

    /// All connection strings for this manager's provider selection
    pub fn connection_strings(&self) -> Arc<ConnectionStrings> {
        Arc::clone(
            self.connection_strings
                .get_or_init(|| self.root.get(self.provider.as_ref())),
        )
    }

    /// The first of `name` and then `fallbacks` that exists.
    ///
    /// `None` names are skipped without triggering any parsing.
    pub fn get(&self, name: Option<&str>, fallbacks: &[Option<&str>]) -> Option<ProviderConnectionString> {
        let normalizer = self.key_normalizer();
        std::iter::once(name)
            .chain(fallbacks.iter().copied())
            .flatten()
            .find_map(|candidate| {
                self.connection_strings()
                    .get(normalizer.normalize(candidate))
                    .cloned()
            })
    }

    /// Look up `name`, failing when it is blank or not configured
    pub fn require(&self, name: &str) -> Result<ProviderConnectionString> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidArgument(
                "connection name must not be blank".to_string(),
            ));
        }
        self.get(Some(name), &[]).ok_or_else(|| {
            ConfigError::Config(format!("Connection string '{}' not found", name.trim()))
        })
    }
}
