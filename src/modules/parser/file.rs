//! File-backed configuration source

use layerconf_core::{
    ConfigData, ConfigError, ConfigurationBuilder, ConfigurationProvider, ConfigurationSource,
    Result, SourceKind,
};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::format::FileFormat;

/// A configuration file with a known format
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
    pub format: FileFormat,
    /// Missing optional files load as empty
    pub optional: bool,
    /// Ask watchers to reload the configuration when the file changes
    pub reload_on_change: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
            optional: false,
            reload_on_change: false,
        }
    }

    /// Create a source whose format is detected from the file extension
    pub fn detect(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = FileFormat::from_path(&path).ok_or_else(|| ConfigError::UnsupportedExtension {
            extension: extension_of(&path),
            path: path.clone(),
        })?;
        Ok(Self::new(path, format))
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn reload_on_change(mut self, reload_on_change: bool) -> Self {
        self.reload_on_change = reload_on_change;
        self
    }
}

/// Extension of `path` including the leading dot, or an empty string
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

impl ConfigurationSource for FileSource {
    fn build(&self, builder: &ConfigurationBuilder) -> Result<Box<dyn ConfigurationProvider>> {
        Ok(Box::new(FileProvider {
            path: builder.resolve_path(&self.path),
            format: self.format,
            optional: self.optional,
            data: ConfigData::new(),
        }))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn watch_paths(&self, builder: &ConfigurationBuilder) -> Vec<PathBuf> {
        if self.reload_on_change {
            vec![builder.resolve_path(&self.path)]
        } else {
            Vec::new()
        }
    }
}

/// Provider holding the flattened content of one file
#[derive(Debug)]
pub struct FileProvider {
    path: PathBuf,
    format: FileFormat,
    optional: bool,
    data: ConfigData,
}

impl FileProvider {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &ConfigData {
        &self.data
    }
}

impl ConfigurationProvider for FileProvider {
    fn load(&mut self) -> Result<()> {
        if !self.path.is_file() {
            if self.optional {
                debug!("Optional file '{}' not found", self.path.display());
                self.data.clear();
                return Ok(());
            }
            return Err(ConfigError::FileNotFound(self.path.clone()));
        }

        let content = std::fs::read_to_string(&self.path)?;
        self.data = self.format.parse(&content, &self.path)?;
        debug!(
            "Loaded {} keys from {} file '{}'",
            self.data.len(),
            self.format,
            self.path.display()
        );
        Ok(())
    }

    fn try_get(&self, key: &str) -> Option<String> {
        self.data.get(key).map(str::to_string)
    }

    fn child_keys(&self, parent_path: Option<&str>) -> Vec<String> {
        self.data.child_keys(parent_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detect_format() {
        assert_eq!(FileSource::detect("a.yaml").unwrap().format, FileFormat::Yaml);
        let err = FileSource::detect("settings.cfg").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported file extension '.cfg' for 'settings.cfg'"
        );
    }

    #[test]
    fn test_load_relative_to_base_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.json"), r#"{"Name": "svc"}"#).unwrap();

        let mut builder = ConfigurationBuilder::new();
        builder
            .set_base_path(dir.path())
            .add(FileSource::detect("app.json").unwrap());
        let config = builder.build().unwrap();
        assert_eq!(config.get("name"), Some("svc".to_string()));
    }

    #[test]
    fn test_missing_files() {
        let dir = TempDir::new().unwrap();
        let mut builder = ConfigurationBuilder::new();
        builder
            .set_base_path(dir.path())
            .add(FileSource::new("missing.json", FileFormat::Json).optional(true));
        assert!(builder.build().unwrap().entries().is_empty());

        builder.add(FileSource::new("missing.json", FileFormat::Json));
        assert!(matches!(builder.build(), Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.ini");
        fs::write(&path, "level = info").unwrap();

        let mut builder = ConfigurationBuilder::new();
        builder.add(FileSource::detect(&path).unwrap().reload_on_change(true));
        assert_eq!(builder.watch_paths(), vec![path.clone()]);

        let config = builder.build().unwrap();
        assert_eq!(config.get("level"), Some("info".to_string()));

        fs::write(&path, "level = debug").unwrap();
        config.reload().unwrap();
        assert_eq!(config.get("level"), Some("debug".to_string()));
    }
}
