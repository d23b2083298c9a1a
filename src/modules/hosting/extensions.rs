use layerconf_core::{ConfigError, ConfigurationBuilder, Result, SourceKind};

use crate::add_file::{AddFileOptions, AddFileSource};
use crate::map::MapSource;
use crate::transform::TransformSource;

/// Post-composition sources that read their settings from the
/// configuration built so far
pub trait ConfigurationBuilderExt {
    /// Add the keys described by `section_key`
    fn add_transform_configuration(&mut self, section_key: &str) -> Result<&mut Self>;

    /// Copy values between keys as listed in `section_key`
    fn add_map_configuration(&mut self, section_key: &str) -> Result<&mut Self>;

    /// Add the files listed in `options.section_key`, placed right after the
    /// last file source so later sources still override them
    fn add_add_file_configuration(&mut self, options: AddFileOptions) -> Result<&mut Self>;
}

fn require_section_key(section_key: &str) -> Result<&str> {
    let section_key = section_key.trim();
    if section_key.is_empty() {
        return Err(ConfigError::InvalidArgument(
            "section key must not be blank".to_string(),
        ));
    }
    Ok(section_key)
}

impl ConfigurationBuilderExt for ConfigurationBuilder {
    fn add_transform_configuration(&mut self, section_key: &str) -> Result<&mut Self> {
        let section_key = require_section_key(section_key)?;
        let snapshot = self.build()?;
        Ok(self.add(TransformSource::new(snapshot.section(section_key))))
    }

    fn add_map_configuration(&mut self, section_key: &str) -> Result<&mut Self> {
        let section_key = require_section_key(section_key)?;
        let snapshot = self.build()?;
        Ok(self.add(MapSource::new(snapshot, section_key)))
    }

    fn add_add_file_configuration(&mut self, mut options: AddFileOptions) -> Result<&mut Self> {
        options.section_key = require_section_key(&options.section_key)?.to_string();
        let snapshot = self.build()?;
        let source = AddFileSource::new(&snapshot, options);
        Ok(match self.last_index_of(SourceKind::File) {
            Some(index) => self.insert(index + 1, source),
            None => self.add(source),
        })
    }
}
