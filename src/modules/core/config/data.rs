//! Case-insensitive key/value storage for data-backed providers

use std::collections::BTreeMap;

use super::key;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: String,
    value: String,
}

/// Flat `:`-delimited key/value pairs.
///
/// Lookups ignore ASCII case; the casing of the first insertion of a key is
/// kept for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigData {
    entries: BTreeMap<String, Entry>,
}

impl ConfigData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        self.entries
            .entry(key::fold(&key))
            .and_modify(|e| e.value = value.clone())
            .or_insert(Entry { key, value });
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key::fold(key)).map(|e| e.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key::fold(key))
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(&key::fold(key)).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All pairs, ordered by folded key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|e| (e.key.as_str(), e.value.as_str()))
    }

    /// Distinct immediate child segments below `parent` (the root when `None`)
    pub fn child_keys(&self, parent: Option<&str>) -> Vec<String> {
        let parent = parent.unwrap_or("");
        let mut children: Vec<String> = Vec::new();
        for entry in self.entries.values() {
            let Some(rest) = key::strip_parent(&entry.key, parent) else {
                continue;
            };
            let segment = match rest.find(key::KEY_DELIMITER) {
                Some(pos) => &rest[..pos],
                None => rest,
            };
            if !children.iter().any(|c| key::keys_equal(c, segment)) {
                children.push(segment.to_string());
            }
        }
        children
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = ConfigData::new();
        data.extend(iter);
        data
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for ConfigData {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_case_insensitive() {
        let mut data = ConfigData::new();
        data.set("Logging:Level", "Info");
        data.set("LOGGING:level", "Debug");

        assert_eq!(data.len(), 1);
        assert_eq!(data.get("logging:LEVEL"), Some("Debug"));
        assert_eq!(data.iter().next(), Some(("Logging:Level", "Debug")));
    }

    #[test]
    fn test_child_keys() {
        let data: ConfigData = [
            ("ConnectionStrings:Default", "a"),
            ("ConnectionStrings:Other", "b"),
            ("connectionstrings:default_ProviderName", "c"),
            ("Logging:Level", "Info"),
            ("Name", "app"),
        ]
        .into_iter()
        .collect();

        let mut root = data.child_keys(None);
        root.sort();
        assert_eq!(root, vec!["ConnectionStrings", "Logging", "Name"]);

        let children = data.child_keys(Some("CONNECTIONSTRINGS"));
        assert_eq!(children, vec!["Default", "default_ProviderName", "Other"]);

        assert!(data.child_keys(Some("Name")).is_empty());
    }
}
