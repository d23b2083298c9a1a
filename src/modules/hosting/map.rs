//! Source copying values from one key to another
//!
//! A plain child `From=To` copies the value of `From` to `To`. An object
//! child names the keys with `From` or `Source` and `To`, `Destination` or
//! `Dest`. Mappings whose source key has no value are skipped.

use layerconf_core::{
    ConfigData, Configuration, ConfigurationBuilder, ConfigurationProvider, ConfigurationSection,
    ConfigurationSource, Result, SourceKind,
};
use tracing::{debug, warn};

/// Default key of the section listing the mappings
pub const DEFAULT_SECTION_KEY: &str = "MapConfiguration";

const FROM_KEYS: [&str; 2] = ["From", "Source"];
const TO_KEYS: [&str; 3] = ["To", "Destination", "Dest"];

/// Copies values within an already-built configuration
#[derive(Debug, Clone)]
pub struct MapSource {
    configuration: Configuration,
    section_key: String,
}

impl MapSource {
    pub fn new(configuration: Configuration, section_key: impl Into<String>) -> Self {
        Self {
            configuration,
            section_key: section_key.into(),
        }
    }
}

impl ConfigurationSource for MapSource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Result<Box<dyn ConfigurationProvider>> {
        Ok(Box::new(MapProvider {
            configuration: self.configuration.clone(),
            section_key: self.section_key.clone(),
            data: ConfigData::new(),
            loaded: false,
        }))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Map
    }
}

#[derive(Debug)]
pub struct MapProvider {
    configuration: Configuration,
    section_key: String,
    data: ConfigData,
    loaded: bool,
}

fn first_of(section: &ConfigurationSection, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| section.get(k))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn mapping(child: &ConfigurationSection) -> Option<(String, String)> {
    if let Some(value) = child.value() {
        let (from, to) = value.split_once('=')?;
        let (from, to) = (from.trim(), to.trim());
        return (!from.is_empty() && !to.is_empty()).then(|| (from.to_string(), to.to_string()));
    }
    Some((first_of(child, &FROM_KEYS)?, first_of(child, &TO_KEYS)?))
}

impl MapProvider {
    fn map(&self) -> ConfigData {
        let mut data = ConfigData::new();
        for child in self.configuration.section(&self.section_key).children() {
            let Some((from, to)) = mapping(&child) else {
                warn!("Map entry '{}' does not name a source and destination", child.path());
                continue;
            };
            if let Some(value) = self.configuration.get(&from) {
                data.set(to, value);
            }
        }
        data
    }
}

impl ConfigurationProvider for MapProvider {
    fn load(&mut self) -> Result<()> {
        if self.loaded {
            self.configuration.reload()?;
        }
        self.data = self.map();
        self.loaded = true;
        debug!("Mapped {} keys from '{}'", self.data.len(), self.section_key);
        Ok(())
    }

    fn try_get(&self, key: &str) -> Option<String> {
        self.data.get(key).map(str::to_string)
    }

    fn child_keys(&self, parent_path: Option<&str>) -> Vec<String> {
        self.data.child_keys(parent_path)
    }
}
