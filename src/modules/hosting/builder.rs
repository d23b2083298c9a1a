//! Composition of the standard application configuration

use layerconf_core::{Configuration, ConfigurationBuilder, Result};
use layerconf_parser::{CommandLineSource, EnvSource, FileFormat, FileSource};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::add_file::AddFileOptions;
use crate::extensions::ConfigurationBuilderExt;
use crate::{map, transform};

/// Prefix of the environment variables read before anything else
pub const HOST_ENV_PREFIX: &str = "LAYERCONF_";

/// Key holding the environment name in the host configuration
pub const ENVIRONMENT_KEY: &str = "environment";

/// Environment used when none is configured
pub const DEFAULT_ENVIRONMENT: &str = "Production";

/// Variables file merged below the process environment when present
pub const DOTENV_FILE: &str = ".env";

/// Adds sources to a builder
pub type ConfigureFn = dyn Fn(&mut ConfigurationBuilder) -> Result<()> + Send + Sync;

enum PostAction {
    Configure(Arc<ConfigureFn>),
    AddFile,
}

/// Fluent composition of the usual configuration layers.
///
/// Sources are added in this order, later ones overriding earlier ones:
///
/// 1. `LAYERCONF_` environment variables (prefix removed)
/// 2. the wrapped configuration
/// 3. the in-memory data
/// 4. `appsettings.json` then `appsettings.<Environment>.json`
/// 5. sources from [`with_add_configuration`](Self::with_add_configuration)
/// 6. all environment variables, then `.env` in the base path for names
///    not already set
/// 7. the command line
/// 8. post-configuration sources: add-file, transform, map and
///    [`with_add_post_configuration`](Self::with_add_post_configuration)
///
/// The environment name comes from [`with_environment`](Self::with_environment)
/// or the `LAYERCONF_ENVIRONMENT` variable. The composed builder is cached
/// until the next `with_*` call.
#[derive(Default)]
pub struct ConfigurationBuilderBuilder {
    configure_actions: Vec<Arc<ConfigureFn>>,
    post_actions: Vec<PostAction>,
    args: Vec<String>,
    base_path: Option<PathBuf>,
    environment_name: Option<String>,
    configuration: Option<Configuration>,
    initial_data: Option<Vec<(String, String)>>,
    env_vars: Option<Vec<(String, String)>>,
    add_file_options: Option<AddFileOptions>,
    builder: Option<ConfigurationBuilder>,
}

impl fmt::Debug for ConfigurationBuilderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationBuilderBuilder")
            .field("configure_actions", &self.configure_actions.len())
            .field("post_actions", &self.post_actions.len())
            .field("args", &self.args)
            .field("base_path", &self.base_path)
            .field("environment_name", &self.environment_name)
            .field("add_file_options", &self.add_file_options)
            .finish()
    }
}

impl ConfigurationBuilderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given command-line arguments
    pub fn create<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Self {
        Self::new().with_command_lines(args)
    }

    fn reset(mut self) -> Self {
        self.builder = None;
        self
    }

    /// The configured environment, `Production` when none is set
    pub fn environment_name(&self) -> &str {
        self.environment_name.as_deref().unwrap_or(DEFAULT_ENVIRONMENT)
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub fn with_add_configuration<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut ConfigurationBuilder) -> Result<()> + Send + Sync + 'static,
    {
        self.configure_actions.push(Arc::new(configure));
        self.reset()
    }

    pub fn with_add_post_configuration<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut ConfigurationBuilder) -> Result<()> + Send + Sync + 'static,
    {
        self.post_actions.push(PostAction::Configure(Arc::new(configure)));
        self.reset()
    }

    /// Resolve relative files against `base_path`; a blank path unsets it
    pub fn with_base_path(mut self, base_path: impl AsRef<Path>) -> Self {
        let base_path = base_path.as_ref();
        let blank = base_path.as_os_str().is_empty()
            || base_path.to_str().map_or(false, |s| s.trim().is_empty());
        self.base_path = if blank {
            None
        } else {
            Some(absolute(base_path))
        };
        self.reset()
    }

    pub fn with_current_directory(self) -> Self {
        match std::env::current_dir() {
            Ok(dir) => self.with_base_path(dir),
            Err(e) => {
                warn!("Current directory is not available: {}", e);
                self.reset()
            }
        }
    }

    /// Drop the actions added with
    /// [`with_add_configuration`](Self::with_add_configuration). Post
    /// actions are kept.
    pub fn with_clear_added_configuration(mut self, clear: bool) -> Self {
        if clear {
            self.configure_actions.clear();
        }
        self.reset()
    }

    pub fn with_command_lines<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self.reset()
    }

    /// Layer an existing configuration below the files
    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Some(configuration);
        self.reset()
    }

    pub fn with_environment(mut self, environment_name: impl Into<String>) -> Self {
        self.environment_name = Some(environment_name.into());
        self.reset()
    }

    pub fn with_in_memory<K, V>(mut self, data: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.initial_data = Some(data.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self.reset()
    }

    /// Read these variables instead of the process environment
    pub fn with_environment_variables<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self.reset()
    }

    /// Add the files listed in the configuration. Calling this again
    /// replaces the options.
    pub fn with_add_file_configuration(mut self, options: AddFileOptions) -> Self {
        if !self.post_actions.iter().any(|a| matches!(a, PostAction::AddFile)) {
            self.post_actions.push(PostAction::AddFile);
        }
        self.add_file_options = Some(options);
        self.reset()
    }

    /// Add keys from the `Transform` section, or `section_key` when given
    pub fn with_transform_configuration(self, section_key: Option<&str>) -> Self {
        let section_key = section_key.unwrap_or(transform::DEFAULT_SECTION_KEY).to_string();
        self.with_add_post_configuration(move |builder| {
            builder.add_transform_configuration(&section_key).map(|_| ())
        })
    }

    /// Copy values as listed in `MapConfiguration`, or `section_key` when given
    pub fn with_map_configuration(self, section_key: Option<&str>) -> Self {
        let section_key = section_key.unwrap_or(map::DEFAULT_SECTION_KEY).to_string();
        self.with_add_post_configuration(move |builder| {
            builder.add_map_configuration(&section_key).map(|_| ())
        })
    }

    /// The composed builder, created on first use
    pub fn builder(&mut self) -> Result<&mut ConfigurationBuilder> {
        let builder = match self.builder.take() {
            Some(builder) => builder,
            None => self.compose()?,
        };
        Ok(self.builder.insert(builder))
    }

    pub fn build(&mut self) -> Result<Configuration> {
        self.builder()?.build()
    }

    fn env_source(&self, prefix: Option<&str>) -> EnvSource {
        let source = match prefix {
            Some(prefix) => EnvSource::with_prefix(prefix),
            None => EnvSource::new(),
        };
        match &self.env_vars {
            Some(vars) => source.vars(vars.iter().cloned()),
            None => source,
        }
    }

    fn compose(&mut self) -> Result<ConfigurationBuilder> {
        let mut builder = ConfigurationBuilder::new();
        builder.add(self.env_source(Some(HOST_ENV_PREFIX)));

        if self.environment_name.is_none() {
            self.environment_name = builder.build()?.get(ENVIRONMENT_KEY);
        }

        if let Some(base_path) = &self.base_path {
            builder.set_base_path(base_path);
        }
        if let Some(configuration) = &self.configuration {
            builder.add_configuration(configuration.clone());
        }
        if let Some(data) = &self.initial_data {
            builder.add_in_memory(data.iter().cloned());
        }

        builder
            .add(settings_file("appsettings.json".to_string()))
            .add(settings_file(format!("appsettings.{}.json", self.environment_name())));

        for configure in &self.configure_actions {
            configure(&mut builder)?;
        }

        builder.add(self.env_source(None).dotenv(DOTENV_FILE));
        if !self.args.is_empty() {
            builder.add(CommandLineSource::new(self.args.iter().cloned()));
        }

        for action in &self.post_actions {
            match action {
                PostAction::Configure(configure) => configure(&mut builder)?,
                PostAction::AddFile => {
                    if let Some(options) = &self.add_file_options {
                        builder.add_add_file_configuration(options.clone())?;
                    }
                }
            }
        }

        debug!(
            "Composed {} configuration sources for environment {}",
            builder.sources().len(),
            self.environment_name()
        );
        Ok(builder)
    }
}

fn settings_file(path: String) -> FileSource {
    FileSource::new(path, FileFormat::Json)
        .optional(true)
        .reload_on_change(true)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(dir) => dir.join(path),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerconf_core::{ConfigError, SourceKind};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn no_env() -> ConfigurationBuilderBuilder {
        ConfigurationBuilderBuilder::new().with_environment_variables(Vec::<(String, String)>::new())
    }

    fn kinds(builder: &ConfigurationBuilder) -> Vec<SourceKind> {
        builder.sources().iter().map(|s| s.kind()).collect()
    }

    #[test]
    fn test_default_composition() {
        let mut bb = no_env();
        assert_eq!(bb.environment_name(), "Production");
        let builder = bb.builder().unwrap();
        assert_eq!(
            kinds(builder),
            vec![
                SourceKind::Environment,
                SourceKind::File,
                SourceKind::File,
                SourceKind::Environment,
            ]
        );
        assert_eq!(bb.environment_name(), "Production");
    }

    #[test]
    fn test_full_composition_order() {
        let mut wrapped = ConfigurationBuilder::new();
        wrapped.add_in_memory([("Layer", "wrapped")]);

        let mut bb = no_env()
            .with_configuration(wrapped.build().unwrap())
            .with_in_memory([("Layer", "memory")])
            .with_add_configuration(|b| {
                b.add_in_memory([("Added", "yes")]);
                Ok(())
            })
            .with_command_lines(["--Layer=cmdline"])
            .with_add_file_configuration(AddFileOptions::default())
            .with_transform_configuration(None)
            .with_map_configuration(Some("Map"));

        assert_eq!(
            kinds(bb.builder().unwrap()),
            vec![
                SourceKind::Environment,
                SourceKind::Chained,
                SourceKind::Memory,
                SourceKind::File,
                SourceKind::File,
                SourceKind::AddFile,
                SourceKind::Memory,
                SourceKind::Environment,
                SourceKind::CommandLine,
                SourceKind::Transform,
                SourceKind::Map,
            ]
        );

        let config = bb.build().unwrap();
        assert_eq!(config.get("Layer"), Some("cmdline".to_string()));
        assert_eq!(config.get("Added"), Some("yes".to_string()));
    }

    #[test]
    fn test_environment_from_host_variables() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("appsettings.json"), r#"{"Name": "base", "Level": "1"}"#).unwrap();
        fs::write(dir.path().join("appsettings.Staging.json"), r#"{"Name": "staging"}"#).unwrap();

        let mut bb = ConfigurationBuilderBuilder::new()
            .with_environment_variables([("LAYERCONF_ENVIRONMENT", "Staging"), ("APP__MODE", "env")])
            .with_base_path(dir.path());
        let config = bb.build().unwrap();

        assert_eq!(bb.environment_name(), "Staging");
        assert_eq!(config.get("Name"), Some("staging".to_string()));
        assert_eq!(config.get("Level"), Some("1".to_string()));
        assert_eq!(config.get("App:Mode"), Some("env".to_string()));
        assert_eq!(config.get("Environment"), Some("Staging".to_string()));
    }

    #[test]
    fn test_explicit_environment_wins() {
        let mut bb = ConfigurationBuilderBuilder::new()
            .with_environment_variables([("LAYERCONF_ENVIRONMENT", "Staging")])
            .with_environment("Development");
        bb.build().unwrap();
        assert_eq!(bb.environment_name(), "Development");
    }

    #[test]
    fn test_builder_is_cached_until_changed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut bb = no_env().with_add_configuration(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bb.builder().unwrap();
        bb.builder().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut bb = bb.with_command_lines(["a=b"]);
        bb.builder().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let mut bb = bb.with_clear_added_configuration(true);
        bb.builder().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_add_file_action_added_once() {
        let mut bb = no_env()
            .with_add_file_configuration(AddFileOptions::default())
            .with_add_file_configuration(AddFileOptions::new("Files"));
        let count = kinds(bb.builder().unwrap())
            .into_iter()
            .filter(|k| *k == SourceKind::AddFile)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_add_file_from_composed_configuration() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("appsettings.json"), r#"{"AddFile": ["extra.yaml"]}"#).unwrap();
        fs::write(dir.path().join("extra.yaml"), "ConnectionStrings:\n  Main: Server=extra\n").unwrap();

        let config = no_env()
            .with_base_path(dir.path())
            .with_add_file_configuration(AddFileOptions::default())
            .build()
            .unwrap();
        assert_eq!(config.connection_string("main"), Some("Server=extra".to_string()));
    }

    #[test]
    fn test_post_action_errors_propagate() {
        let err = no_env()
            .with_add_post_configuration(|_| Err(ConfigError::Config("boom".to_string())))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Config(_)));
    }

    #[test]
    fn test_blank_base_path() {
        let bb = no_env().with_base_path("/srv/app").with_base_path("");
        assert_eq!(bb.base_path(), None);
        let bb = no_env().with_base_path("/srv/app").with_base_path(" \t ");
        assert_eq!(bb.base_path(), None);
        let bb = no_env().with_base_path("relative");
        assert!(bb.base_path().unwrap().is_absolute());
    }

    #[test]
    fn test_dotenv_in_base_path() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(DOTENV_FILE),
            "APP__MODE=dotenv\nAPP__LEVEL=3\nConnectionStrings__Main=Server=dotenv\n",
        )
        .unwrap();

        let mut bb = ConfigurationBuilderBuilder::new()
            .with_environment_variables([("APP__MODE", "env")])
            .with_base_path(dir.path());
        let config = bb.build().unwrap();

        assert_eq!(config.get("App:Mode"), Some("env".to_string()));
        assert_eq!(config.get("App:Level"), Some("3".to_string()));
        assert_eq!(config.connection_string("Main"), Some("Server=dotenv".to_string()));

        let config = no_env().with_base_path(dir.path()).with_command_lines(["--App:Level=cli"]).build().unwrap();
        assert_eq!(config.get("App:Level"), Some("cli".to_string()));
    }
}
