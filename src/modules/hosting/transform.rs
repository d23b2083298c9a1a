//! Source producing new keys from the entries of a section
//!
//! A plain child `k=v` sets `k` to `v`. An object child with a `Key` sets
//! `Key:k` to `v` for its `Value` entry `k=v`, or for every `k=v` entry of
//! its `Values` list.

use layerconf_core::{
    config::key, ConfigData, ConfigurationBuilder, ConfigurationProvider, ConfigurationSection,
    ConfigurationSource, Result, SourceKind,
};
use tracing::{debug, warn};

/// Default key of the section listing the transformations
pub const DEFAULT_SECTION_KEY: &str = "Transform";

/// Adds the keys described by a section of an already-built configuration
#[derive(Debug, Clone)]
pub struct TransformSource {
    section: ConfigurationSection,
}

impl TransformSource {
    pub fn new(section: ConfigurationSection) -> Self {
        Self { section }
    }
}

impl ConfigurationSource for TransformSource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Result<Box<dyn ConfigurationProvider>> {
        Ok(Box::new(TransformProvider {
            section: self.section.clone(),
            data: ConfigData::new(),
            loaded: false,
        }))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Transform
    }
}

#[derive(Debug)]
pub struct TransformProvider {
    section: ConfigurationSection,
    data: ConfigData,
    loaded: bool,
}

impl TransformProvider {
    pub fn data(&self) -> &ConfigData {
        &self.data
    }
}

fn split_pair(text: &str) -> Option<(&str, &str)> {
    let (k, v) = text.split_once('=')?;
    let k = k.trim();
    (!k.is_empty()).then_some((k, v))
}

fn transform(section: &ConfigurationSection) -> ConfigData {
    let mut data = ConfigData::new();

    for child in section.children() {
        if let Some(value) = child.value() {
            match split_pair(&value) {
                Some((k, v)) => data.set(k, v),
                None => warn!("Transform entry '{}' is not a key=value pair", child.path()),
            }
            continue;
        }

        let Some(target) = child.get("Key").filter(|k| !k.trim().is_empty()) else {
            continue;
        };
        let target = target.trim();

        let items: Vec<ConfigurationSection> = if child.get("Value").is_some() {
            vec![child.section("Value")]
        } else {
            child.section("Values").children()
        };

        for item in items {
            let Some(value) = item.value() else {
                continue;
            };
            match split_pair(&value) {
                Some((k, v)) => data.set(key::combine(target, k), v),
                None => warn!("Transform entry '{}' is not a key=value pair", item.path()),
            }
        }
    }

    data
}

impl ConfigurationProvider for TransformProvider {
    fn load(&mut self) -> Result<()> {
        if self.loaded {
            self.section.configuration().reload()?;
        }
        self.data = transform(&self.section);
        self.loaded = true;
        debug!("Transformed {} keys from '{}'", self.data.len(), self.section.path());
        Ok(())
    }

    fn try_get(&self, key: &str) -> Option<String> {
        self.data.get(key).map(str::to_string)
    }

    fn child_keys(&self, parent_path: Option<&str>) -> Vec<String> {
        self.data.child_keys(parent_path)
    }
}
