//! Memoized connection-string results per provider selection

use dashmap::DashMap;
use layerconf_types::ProviderName;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::model::{ConnectionStrings, KeyNormalizer};
use crate::parser::ConnectionStringParser;

/// Computes the connection strings for one selection
pub type ConnectionStringFactory =
    dyn Fn(&[(String, String)], KeyNormalizer, Option<&ProviderName>) -> ConnectionStrings + Send + Sync;

/// Owns the raw entries and caches the parsed result per selection.
///
/// For a given selection the factory runs at most once; later calls return
/// the same shared result.
pub struct ConnectionStringsRoot {
    entries: Arc<[(String, String)]>,
    normalizer: KeyNormalizer,
    factory: Arc<ConnectionStringFactory>,
    default: OnceCell<Arc<ConnectionStrings>>,
    cache: DashMap<ProviderName, Arc<ConnectionStrings>>,
}

fn parse_connection_strings(
    entries: &[(String, String)],
    normalizer: KeyNormalizer,
    selection: Option<&ProviderName>,
) -> ConnectionStrings {
    ConnectionStringParser::new(entries, selection, normalizer).parse()
}

impl ConnectionStringsRoot {
    pub fn new(entries: Vec<(String, String)>, normalizer: KeyNormalizer) -> Self {
        Self::with_factory(entries, normalizer, Arc::new(parse_connection_strings))
    }

    /// Use a custom factory instead of the built-in parser
    pub fn with_factory(
        entries: Vec<(String, String)>,
        normalizer: KeyNormalizer,
        factory: Arc<ConnectionStringFactory>,
    ) -> Self {
        Self {
            entries: entries.into(),
            normalizer,
            factory,
            default: OnceCell::new(),
            cache: DashMap::new(),
        }
    }

    /// A new root over the same entries with a different normalizer.
    /// Nothing cached here carries over.
    pub fn with_key_normalizer(&self, normalizer: KeyNormalizer) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            normalizer,
            factory: Arc::clone(&self.factory),
            default: OnceCell::new(),
            cache: DashMap::new(),
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn key_normalizer(&self) -> KeyNormalizer {
        self.normalizer
    }

    /// Connection strings for `selection`, computed on first request
    pub fn get(&self, selection: Option<&ProviderName>) -> Arc<ConnectionStrings> {
        match selection {
            None => Arc::clone(self.default.get_or_init(|| self.compute(None))),
            Some(provider) => {
                if let Some(cached) = self.cache.get(provider) {
                    return Arc::clone(cached.value());
                }
                Arc::clone(
                    self.cache
                        .entry(provider.clone())
                        .or_insert_with(|| self.compute(Some(provider)))
                        .value(),
                )
            }
        }
    }

    /// Number of cached selections, not counting the unfiltered result
    pub fn cached_selections(&self) -> usize {
        self.cache.len()
    }

    fn compute(&self, selection: Option<&ProviderName>) -> Arc<ConnectionStrings> {
        let result = (self.factory)(&self.entries, self.normalizer, selection);
        match selection {
            Some(provider) => debug!(
                "Resolved {} connection strings for provider {}",
                result.len(),
                provider
            ),
            None => debug!("Resolved {} connection strings", result.len()),
        }
        Arc::new(result)
    }
}

impl fmt::Debug for ConnectionStringsRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStringsRoot")
            .field("entries", &self.entries.len())
            .field("normalizer", &self.normalizer)
            .field("cached_selections", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderConnectionString;
    use layerconf_types::DbProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn counting_root(calls: Arc<AtomicUsize>) -> ConnectionStringsRoot {
        ConnectionStringsRoot::with_factory(
            Vec::new(),
            KeyNormalizer::Trim,
            Arc::new(move |_: &[(String, String)], _: KeyNormalizer, selection: Option<&ProviderName>| {
                calls.fetch_add(1, Ordering::SeqCst);
                let label = selection.map(|p| p.to_string()).unwrap_or_default();
                std::iter::once(ProviderConnectionString::unclassified("label", label)).collect()
            }),
        )
    }

    #[test]
    fn test_factory_runs_once_per_selection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let root = counting_root(Arc::clone(&calls));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let all_a = root.get(None);
        let all_b = root.get(None);
        assert!(Arc::ptr_eq(&all_a, &all_b));
        assert_eq!(root.cached_selections(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let sql_a = root.get(Some(&DbProvider::SqlServer.into()));
        assert_eq!(root.cached_selections(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let cosmos_a = root.get(Some(&ProviderName::custom("cosMOS")));
        assert_eq!(root.cached_selections(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let sql_b = root.get(Some(&DbProvider::SqlServer.into()));
        let cosmos_b = root.get(Some(&ProviderName::custom("COSmos")));
        let all_c = root.get(None);
        assert!(Arc::ptr_eq(&sql_a, &sql_b));
        assert!(Arc::ptr_eq(&cosmos_a, &cosmos_b));
        assert!(Arc::ptr_eq(&all_a, &all_c));
        assert_eq!(root.cached_selections(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        assert_eq!(cosmos_b.get("label").unwrap().raw(), "custom(cosMOS)");
    }

    #[test]
    fn test_concurrent_first_access_computes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let root = Arc::new(counting_root(Arc::clone(&calls)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let root = Arc::clone(&root);
                thread::spawn(move || {
                    root.get(Some(&DbProvider::MySql.into()));
                    root.get(None);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_with_key_normalizer_starts_empty() {
        let root = ConnectionStringsRoot::new(
            vec![(" main ".to_string(), "a".to_string())],
            KeyNormalizer::Trim,
        );
        assert!(root.get(None).contains("main"));

        let preserved = root.with_key_normalizer(KeyNormalizer::PreserveSpace);
        assert_eq!(preserved.key_normalizer(), KeyNormalizer::PreserveSpace);
        assert!(preserved.get(None).contains(" main "));
        assert!(!preserved.get(None).contains("main"));
    }
}
