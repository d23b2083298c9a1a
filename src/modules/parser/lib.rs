//! Configuration sources for layerconf
//!
//! This crate provides the concrete sources that feed a configuration tree:
//! JSON, YAML, TOML, INI and XML files, environment variables and command-line
//! arguments.

pub mod cmdline;
pub mod env;
pub mod file;
pub mod format;
pub mod xml;

pub use cmdline::CommandLineSource;
pub use env::EnvSource;
pub use file::FileSource;
pub use format::FileFormat;

use layerconf_core::{ConfigurationBuilder, Result};
use std::path::Path;

/// Convenience methods for adding the sources of this crate to a builder
pub trait SourcesExt {
    /// Add a file whose format is detected from its extension
    fn add_file(&mut self, path: impl AsRef<Path>, optional: bool, reload_on_change: bool) -> Result<&mut Self>;

    fn add_json_file(&mut self, path: impl AsRef<Path>, optional: bool) -> &mut Self;

    fn add_yaml_file(&mut self, path: impl AsRef<Path>, optional: bool) -> &mut Self;

    fn add_toml_file(&mut self, path: impl AsRef<Path>, optional: bool) -> &mut Self;

    fn add_ini_file(&mut self, path: impl AsRef<Path>, optional: bool) -> &mut Self;

    fn add_xml_file(&mut self, path: impl AsRef<Path>, optional: bool) -> &mut Self;

    /// Add environment variables, optionally filtered by prefix
    fn add_env_vars(&mut self, prefix: Option<&str>) -> &mut Self;

    fn add_command_line<S: Into<String>>(&mut self, args: impl IntoIterator<Item = S>) -> &mut Self;
}

impl SourcesExt for ConfigurationBuilder {
    fn add_file(&mut self, path: impl AsRef<Path>, optional: bool, reload_on_change: bool) -> Result<&mut Self> {
        let source = FileSource::detect(path.as_ref())?
            .optional(optional)
            .reload_on_change(reload_on_change);
        Ok(self.add(source))
    }

    fn add_json_file(&mut self, path: impl AsRef<Path>, optional: bool) -> &mut Self {
        self.add(FileSource::new(path.as_ref(), FileFormat::Json).optional(optional))
    }

    fn add_yaml_file(&mut self, path: impl AsRef<Path>, optional: bool) -> &mut Self {
        self.add(FileSource::new(path.as_ref(), FileFormat::Yaml).optional(optional))
    }

    fn add_toml_file(&mut self, path: impl AsRef<Path>, optional: bool) -> &mut Self {
        self.add(FileSource::new(path.as_ref(), FileFormat::Toml).optional(optional))
    }

    fn add_ini_file(&mut self, path: impl AsRef<Path>, optional: bool) -> &mut Self {
        self.add(FileSource::new(path.as_ref(), FileFormat::Ini).optional(optional))
    }

    fn add_xml_file(&mut self, path: impl AsRef<Path>, optional: bool) -> &mut Self {
        self.add(FileSource::new(path.as_ref(), FileFormat::Xml).optional(optional))
    }

    fn add_env_vars(&mut self, prefix: Option<&str>) -> &mut Self {
        match prefix {
            Some(prefix) => self.add(EnvSource::with_prefix(prefix)),
            None => self.add(EnvSource::new()),
        }
    }

    fn add_command_line<S: Into<String>>(&mut self, args: impl IntoIterator<Item = S>) -> &mut Self {
        self.add(CommandLineSource::new(args))
    }
}
