//! Grouping of raw configuration entries into named connections

use layerconf_types::ProviderName;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::expander;
use crate::model::{fold, ConnectionStrings, KeyNormalizer, ProviderConnectionString};

/// `<name>_<provider>`, where the provider is everything after the last `_`
static NAME_AND_PROVIDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<name>.+)_(?P<provider>[^_]+)$").unwrap());

/// Suffix of sibling keys that carry the provider of another key
pub const PROVIDER_NAME_SUFFIX: &str = "ProviderName";

/// Parses raw `(key, value)` entries into expanded connection strings
#[derive(Debug, Clone)]
pub struct ConnectionStringParser<'a> {
    entries: &'a [(String, String)],
    selection: Option<&'a ProviderName>,
    normalizer: KeyNormalizer,
}

impl<'a> ConnectionStringParser<'a> {
    pub fn new(
        entries: &'a [(String, String)],
        selection: Option<&'a ProviderName>,
        normalizer: KeyNormalizer,
    ) -> Self {
        Self {
            entries,
            selection,
            normalizer,
        }
    }

    /// Group, classify, filter and expand
    pub fn parse(&self) -> ConnectionStrings {
        expander::expand(self.list_connections(), self.normalizer)
    }

    /// Connections in registration order, before expansion.
    ///
    /// Keys are processed shortest first so a base name is seen before the
    /// composite keys built from it.
    pub fn list_connections(&self) -> Vec<ProviderConnectionString> {
        let mut lookup: HashMap<String, (&str, &str)> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for (key, value) in self.entries {
            let key = self.normalizer.normalize(key);
            let folded = fold(key);
            if !lookup.contains_key(&folded) {
                order.push(folded.clone());
                lookup.insert(folded, (key, value.as_str()));
            }
        }
        order.sort_by_key(|folded| lookup.get(folded).map_or(0, |(key, _)| key.chars().count()));

        let mut registrar = Registrar {
            selection: self.selection,
            claimed: HashSet::new(),
            connections: Vec::new(),
        };

        for folded in order {
            let Some((key, value)) = lookup.remove(&folded) else {
                continue;
            };

            if let Some(captures) = NAME_AND_PROVIDER.captures(key) {
                let name = &captures["name"];
                let provider = &captures["provider"];

                if provider.eq_ignore_ascii_case(PROVIDER_NAME_SUFFIX)
                    && registrar.claimed.contains(&fold(name))
                {
                    trace!("Skipping '{}': provider already set by '{}'", key, name);
                    continue;
                }

                let classified = registrar.add(name, value, Some(provider));
                if classified.kind().is_custom() {
                    registrar.add(key, value, None);
                }
            } else if let Some((_, provider)) =
                lookup.remove(&fold(&format!("{}_{}", key, PROVIDER_NAME_SUFFIX)))
            {
                registrar.add(key, value, Some(provider));
            } else {
                registrar.add(key, value, None);
            }
        }

        debug!(
            "Listed {} connection strings from {} entries",
            registrar.connections.len(),
            self.entries.len()
        );
        registrar.connections
    }
}

struct Registrar<'a> {
    selection: Option<&'a ProviderName>,
    /// Folded names registered so far, whether or not the selection kept them
    claimed: HashSet<String>,
    connections: Vec<ProviderConnectionString>,
}

impl Registrar<'_> {
    fn add(&mut self, name: &str, value: &str, provider: Option<&str>) -> ProviderName {
        let classified = ProviderName::classify(provider);
        self.claimed.insert(fold(name));
        if let Some(selected) = select(&classified, self.selection) {
            self.connections
                .push(ProviderConnectionString::new(name, value, selected));
        }
        classified
    }
}

/// Apply the provider selection to a classified provider.
///
/// Kinds must match. A named custom selection keeps custom entries with the
/// same name (ignoring case) and entries with no custom name, which take the
/// selected name.
pub fn select(provider: &ProviderName, selection: Option<&ProviderName>) -> Option<ProviderName> {
    let Some(selection) = selection else {
        return Some(provider.clone());
    };
    if provider.kind() != selection.kind() {
        return None;
    }
    match (selection.custom_name(), provider.custom_name()) {
        (None, _) => Some(provider.clone()),
        (Some(selected), Some(own)) if selected.eq_ignore_ascii_case(own) => Some(provider.clone()),
        (Some(_), Some(_)) => None,
        (Some(selected), None) => Some(ProviderName::custom(selected)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerconf_types::DbProvider;

    fn entries() -> Vec<(String, String)> {
        [
            ("default1", "Default1"),
            ("conn2_sqlServer", "sqlServer2"),
            ("conn3_PostgreSQL", "postgreSQL3"),
            ("conn4_MySQL", "mySql4"),
            ("conn5_Cosmos", "cosmos5"),
            ("conn6", "sqlServer6"),
            ("conn6_ProviderName", "sqlServer"),
            ("conn7", "postgreSQL7"),
            ("conn7_PROVIDERNAME", "POSTGRESQL"),
            ("conn8", "mySql8"),
            ("conn8_providername", "mysql"),
            ("conn9", "cosmos9"),
            ("conn9_providerName", "COSmos"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn list(selection: Option<ProviderName>) -> Vec<(String, String, DbProvider, Option<String>)> {
        let entries = entries();
        ConnectionStringParser::new(&entries, selection.as_ref(), KeyNormalizer::Trim)
            .list_connections()
            .into_iter()
            .map(|c| {
                (
                    c.name().to_string(),
                    c.raw().to_string(),
                    c.kind(),
                    c.custom_name().map(str::to_string),
                )
            })
            .collect()
    }

    fn row(name: &str, raw: &str, kind: DbProvider, custom: Option<&str>) -> (String, String, DbProvider, Option<String>) {
        (name.to_string(), raw.to_string(), kind, custom.map(str::to_string))
    }

    #[test]
    fn test_list_connections_all() {
        assert_eq!(
            list(None),
            vec![
                row("conn6", "sqlServer6", DbProvider::SqlServer, None),
                row("conn7", "postgreSQL7", DbProvider::PostgreSql, None),
                row("conn8", "mySql8", DbProvider::MySql, None),
                row("conn9", "cosmos9", DbProvider::Custom, Some("COSmos")),
                row("default1", "Default1", DbProvider::Custom, None),
                row("conn4", "mySql4", DbProvider::MySql, None),
                row("conn5", "cosmos5", DbProvider::Custom, Some("Cosmos")),
                row("conn5_Cosmos", "cosmos5", DbProvider::Custom, None),
                row("conn2", "sqlServer2", DbProvider::SqlServer, None),
                row("conn3", "postgreSQL3", DbProvider::PostgreSql, None),
            ]
        );
    }

    #[test]
    fn test_list_connections_by_kind() {
        assert_eq!(
            list(Some(DbProvider::MySql.into())),
            vec![
                row("conn8", "mySql8", DbProvider::MySql, None),
                row("conn4", "mySql4", DbProvider::MySql, None),
            ]
        );
        assert_eq!(
            list(Some(DbProvider::PostgreSql.into())),
            vec![
                row("conn7", "postgreSQL7", DbProvider::PostgreSql, None),
                row("conn3", "postgreSQL3", DbProvider::PostgreSql, None),
            ]
        );
        assert_eq!(
            list(Some(DbProvider::SqlServer.into())),
            vec![
                row("conn6", "sqlServer6", DbProvider::SqlServer, None),
                row("conn2", "sqlServer2", DbProvider::SqlServer, None),
            ]
        );
    }

    #[test]
    fn test_list_connections_any_custom() {
        assert_eq!(
            list(Some(DbProvider::Custom.into())),
            vec![
                row("conn9", "cosmos9", DbProvider::Custom, Some("COSmos")),
                row("default1", "Default1", DbProvider::Custom, None),
                row("conn5", "cosmos5", DbProvider::Custom, Some("Cosmos")),
                row("conn5_Cosmos", "cosmos5", DbProvider::Custom, None),
            ]
        );
    }

    #[test]
    fn test_list_connections_named_custom_coerces_unnamed() {
        assert_eq!(
            list(Some(ProviderName::custom("COSMOS"))),
            vec![
                row("conn9", "cosmos9", DbProvider::Custom, Some("COSmos")),
                row("default1", "Default1", DbProvider::Custom, Some("COSMOS")),
                row("conn5", "cosmos5", DbProvider::Custom, Some("Cosmos")),
                row("conn5_Cosmos", "cosmos5", DbProvider::Custom, Some("COSMOS")),
            ]
        );
    }

    #[test]
    fn test_suffix_wins_over_sibling_provider_name() {
        let entries = vec![
            ("foo_ProviderName".to_string(), "postgresql".to_string()),
            ("foo_mysql".to_string(), "a".to_string()),
        ];
        let connections =
            ConnectionStringParser::new(&entries, None, KeyNormalizer::Trim).list_connections();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].name(), "foo");
        assert_eq!(connections[0].kind(), DbProvider::MySql);
        assert_eq!(connections[0].raw(), "a");
    }

    #[test]
    fn test_unclaimed_provider_name_key_is_registered() {
        let entries = vec![("orphan_ProviderName".to_string(), "x".to_string())];
        let names: Vec<String> = ConnectionStringParser::new(&entries, None, KeyNormalizer::Trim)
            .list_connections()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["orphan", "orphan_ProviderName"]);
    }

    #[test]
    fn test_duplicate_keys_first_wins() {
        let entries = vec![
            (" Main ".to_string(), "first".to_string()),
            ("main".to_string(), "second".to_string()),
        ];
        let connections =
            ConnectionStringParser::new(&entries, None, KeyNormalizer::Trim).list_connections();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].name(), "Main");
        assert_eq!(connections[0].raw(), "first");

        let connections =
            ConnectionStringParser::new(&entries, None, KeyNormalizer::PreserveSpace)
                .list_connections();
        assert_eq!(connections.len(), 2);
    }

    #[test]
    fn test_parse_expands_tokens() {
        let entries = vec![
            ("host".to_string(), "db.local".to_string()),
            ("main_npgsql".to_string(), "Host=${host};Password=p%%ss".to_string()),
        ];
        let result = ConnectionStringParser::new(&entries, None, KeyNormalizer::Trim).parse();
        let main = result.get("MAIN").unwrap();
        assert_eq!(main.kind(), DbProvider::PostgreSql);
        assert_eq!(main.value(), "Host=db.local;Password=p%ss");
    }

    #[test]
    fn test_select() {
        let unnamed = ProviderName::kind_only(DbProvider::Custom);
        let selected = select(&unnamed, Some(&ProviderName::custom("Foo"))).unwrap();
        assert_eq!(selected.custom_name(), Some("Foo"));

        assert!(select(&ProviderName::custom("Bar"), Some(&ProviderName::custom("Foo"))).is_none());
        assert!(select(&DbProvider::MySql.into(), Some(&ProviderName::custom("Foo"))).is_none());
        assert_eq!(
            select(&DbProvider::MySql.into(), None),
            Some(ProviderName::kind_only(DbProvider::MySql))
        );
    }
}
