//! Views into a subtree of a configuration

use serde::de::DeserializeOwned;

use super::bind;
use super::key;
use super::root::Configuration;
use crate::error::Result;

/// A subtree of a [`Configuration`] rooted at `path`.
///
/// Sections are views: they hold no data of their own and always reflect
/// the current state of the configuration they came from.
#[derive(Debug, Clone)]
pub struct ConfigurationSection {
    root: Configuration,
    path: String,
}

impl ConfigurationSection {
    pub(crate) fn new(root: Configuration, path: impl Into<String>) -> Self {
        Self {
            root,
            path: path.into(),
        }
    }

    /// Last segment of the path
    pub fn key(&self) -> &str {
        key::section_key(&self.path)
    }

    /// Full path from the configuration root
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The value stored at this exact path, if any
    pub fn value(&self) -> Option<String> {
        if self.path.is_empty() {
            return None;
        }
        self.root.get(&self.path)
    }

    /// Value of a descendant, relative to this section
    pub fn get(&self, key: &str) -> Option<String> {
        self.root.get(&key::combine(&self.path, key))
    }

    /// Descendant section, relative to this section
    pub fn section(&self, key: &str) -> ConfigurationSection {
        ConfigurationSection::new(self.root.clone(), key::combine(&self.path, key))
    }

    /// Immediate children in key order
    pub fn children(&self) -> Vec<ConfigurationSection> {
        let parent = (!self.path.is_empty()).then_some(self.path.as_str());
        self.root
            .child_keys(parent)
            .into_iter()
            .map(|child| ConfigurationSection::new(self.root.clone(), key::combine(&self.path, &child)))
            .collect()
    }

    /// True when the section has a value or any children
    pub fn exists(&self) -> bool {
        self.value().is_some() || !self.children().is_empty()
    }

    /// Every leaf value at or below this section as `(full key, value)`
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Some(value) = self.value() {
            out.push((self.path.clone(), value));
        }
        self.collect_entries(&mut out);
        out
    }

    fn collect_entries(&self, out: &mut Vec<(String, String)>) {
        for child in self.children() {
            if let Some(value) = child.value() {
                out.push((child.path.clone(), value));
            }
            child.collect_entries(out);
        }
    }

    /// The configuration this section belongs to
    pub fn configuration(&self) -> &Configuration {
        &self.root
    }

    /// Deserialize this subtree into `T`
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T> {
        bind::from_section(self)
    }
}
