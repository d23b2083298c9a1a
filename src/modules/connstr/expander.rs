//! Token expansion across connection strings
//!
//! Each pass recomputes, for every pending connection, how many of its token
//! names are still unresolved. All connections with nothing left unresolved
//! are resolved together; when none is ready, the first pending connection
//! with the fewest unresolved names is resolved anyway so that forward,
//! missing and circular references cannot stall the loop. Tokens that name
//! nothing resolved are left in place verbatim.

use std::collections::HashSet;
use tracing::trace;

use crate::model::{fold, ConnectionStrings, KeyNormalizer, ProviderConnectionString};
use crate::scanner;

#[derive(Debug)]
struct Entry {
    connection: ProviderConnectionString,
    has_escapes: bool,
    /// Normalized token names, deduplicated case-insensitively
    tokens: Vec<String>,
    remaining: usize,
}

impl Entry {
    fn new(connection: ProviderConnectionString, normalizer: KeyNormalizer) -> Self {
        let raw = connection.raw();
        let has_escapes = scanner::has_escapes(raw);

        let mut seen = HashSet::new();
        let tokens = scanner::token_names(raw)
            .map(|name| normalizer.normalize(name))
            .filter(|name| !name.is_empty() && seen.insert(fold(name)))
            .map(str::to_string)
            .collect();

        Self {
            connection,
            has_escapes,
            tokens,
            remaining: 0,
        }
    }

    fn count_remaining(&mut self, resolved: &ConnectionStrings) {
        self.remaining = self
            .tokens
            .iter()
            .filter(|token| !resolved.contains(token))
            .count();
    }

    fn resolve(self, resolved: &ConnectionStrings, normalizer: KeyNormalizer) -> ProviderConnectionString {
        let mut connection = self.connection;
        if self.has_escapes || !self.tokens.is_empty() {
            let expanded = scanner::substitute(connection.raw(), |name| {
                resolved
                    .get(normalizer.normalize(name))
                    .map(|c| c.value().to_string())
            });
            connection.set_expanded(expanded);
        }
        connection
    }
}

/// Expand tokens in every connection.
///
/// Connections sharing a name (case-insensitively) collapse to the first
/// one. The result iterates in resolution order.
pub fn expand<I>(connections: I, normalizer: KeyNormalizer) -> ConnectionStrings
where
    I: IntoIterator<Item = ProviderConnectionString>,
{
    let mut names = HashSet::new();
    let mut pending: Vec<Entry> = connections
        .into_iter()
        .filter(|c| names.insert(fold(c.name())))
        .map(|c| Entry::new(c, normalizer))
        .collect();

    let mut resolved = ConnectionStrings::new();

    while !pending.is_empty() {
        for entry in pending.iter_mut() {
            entry.count_remaining(&resolved);
        }

        let min = pending.iter().map(|e| e.remaining).min().unwrap_or(0);

        if min == 0 {
            let (ready, blocked): (Vec<Entry>, Vec<Entry>) =
                pending.into_iter().partition(|e| e.remaining == 0);
            pending = blocked;
            for entry in ready {
                let connection = entry.resolve(&resolved, normalizer);
                resolved.insert(connection);
            }
        } else {
            let index = pending
                .iter()
                .position(|e| e.remaining == min)
                .unwrap_or(0);
            let entry = pending.remove(index);
            trace!(
                "Resolving '{}' with {} unresolved references",
                entry.connection.name(),
                entry.remaining
            );
            let connection = entry.resolve(&resolved, normalizer);
            resolved.insert(connection);
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unclassified(pairs: &[(&str, &str)]) -> Vec<ProviderConnectionString> {
        pairs
            .iter()
            .map(|(name, raw)| ProviderConnectionString::unclassified(*name, *raw))
            .collect()
    }

    fn values(result: &ConnectionStrings) -> Vec<String> {
        result
            .iter()
            .map(|c| format!("{}: {}", c.name(), c.value()))
            .collect()
    }

    #[test]
    fn test_expand_resolution_order() {
        let result = expand(
            unclassified(&[
                ("conn1", "value1;r2=${conn2};{conn2};r3=$(conn3);${conn1}"),
                ("conn2", "value2;ref4a=$[conn4];"),
                ("conn3", "value3;%{conn2};ref4b=%(conn4);"),
                ("conn4", "value4;"),
            ]),
            KeyNormalizer::Trim,
        );

        assert_eq!(
            result.names().collect::<Vec<_>>(),
            vec!["conn4", "conn2", "conn3", "conn1"]
        );
        assert_eq!(
            values(&result),
            vec![
                "conn4: value4;",
                "conn2: value2;ref4a=value4;;",
                "conn3: value3;value2;ref4a=value4;;;ref4b=value4;;",
                "conn1: value1;r2=value2;ref4a=value4;;;{conn2};r3=value3;value2;ref4a=value4;;;ref4b=value4;;;${conn1}",
            ]
        );
    }

    #[test]
    fn test_expand_end_to_end_example() {
        let result = expand(
            unclassified(&[("a", "1${b};${a}"), ("b", "2${c}"), ("c", "3")]),
            KeyNormalizer::Trim,
        );
        assert_eq!(values(&result), vec!["c: 3", "b: 23", "a: 123;${a}"]);
    }

    #[test]
    fn test_forward_reference_chain() {
        let result = expand(
            unclassified(&[("A", "x=${B}"), ("B", "y=%(C)"), ("C", "z")]),
            KeyNormalizer::Trim,
        );
        assert_eq!(result.names().collect::<Vec<_>>(), vec!["C", "B", "A"]);
        assert_eq!(result.get("a").unwrap().value(), "x=y=z");
    }

    #[test]
    fn test_cycle_terminates_with_literal_token() {
        let result = expand(
            unclassified(&[("A", "${B}"), ("B", "${A}")]),
            KeyNormalizer::Trim,
        );
        assert_eq!(result.len(), 2);
        let literal = result
            .iter()
            .filter(|c| c.value().contains("${"))
            .count();
        assert!(literal >= 1);
    }

    #[test]
    fn test_missing_reference_stays_literal() {
        let result = expand(unclassified(&[("A", "k=${missing};v=$$")]), KeyNormalizer::Trim);
        assert_eq!(result.get("A").unwrap().value(), "k=${missing};v=$");
    }

    #[test]
    fn test_token_forms_equivalent() {
        let result = expand(
            unclassified(&[
                ("X", "v"),
                ("a", "${X}"),
                ("b", "$(X)"),
                ("c", "$[X]"),
                ("d", "%{X}"),
                ("e", "%(X)"),
                ("f", "%[X]"),
            ]),
            KeyNormalizer::Trim,
        );
        for name in ["a", "b", "c", "d", "e", "f"] {
            assert_eq!(result.get(name).unwrap().value(), "v");
        }
    }

    #[test]
    fn test_escapes_without_tokens() {
        let result = expand(
            unclassified(&[("a", "a$$b"), ("b", "a%%b"), ("c", "a$%b%$c"), ("d", "plain")]),
            KeyNormalizer::Trim,
        );
        assert_eq!(result.get("a").unwrap().value(), "a$b");
        assert_eq!(result.get("b").unwrap().value(), "a%b");
        assert_eq!(result.get("c").unwrap().value(), "a$%b%$c");
        assert_eq!(result.get("d").unwrap().expanded(), None);
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let first = expand(
            unclassified(&[("a", "1${b}"), ("b", "2${c}"), ("c", "3")]),
            KeyNormalizer::Trim,
        );
        let again = expand(
            first
                .iter()
                .map(|c| ProviderConnectionString::unclassified(c.name(), c.value())),
            KeyNormalizer::Trim,
        );
        assert_eq!(values(&first), values(&again));
    }

    #[test]
    fn test_token_names_follow_normalizer() {
        let pairs = [("host", "db"), ("a", "${ host }")];
        let trimmed = expand(unclassified(&pairs), KeyNormalizer::Trim);
        assert_eq!(trimmed.get("a").unwrap().value(), "db");

        let preserved = expand(unclassified(&pairs), KeyNormalizer::PreserveSpace);
        assert_eq!(preserved.get("a").unwrap().value(), "${ host }");
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let result = expand(
            unclassified(&[("Main", "first"), ("MAIN", "second")]),
            KeyNormalizer::Trim,
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("main").unwrap().value(), "first");
    }
}
