//! Source adding configuration files listed in a configuration section
//!
//! Each child of the section is one of:
//!
//! - a plain value: the path of a file, using the default settings
//! - an object with `Type: Settings`: the default `Optional`,
//!   `ReloadOnChange`, `LoggingLevel` and `ThrowIfNotSupport`
//! - an object with `Path`: a file with its own overrides
//!
//! ```yaml
//! AddFile:
//!   - Type: Settings
//!     Optional: false
//!   - secrets.json
//!   - Path: tuning.ini
//!     LoggingLevel: debug
//! ```

use layerconf_core::{
    ChainedProvider, ConfigError, Configuration, ConfigurationBuilder, ConfigurationProvider,
    ConfigurationSection, ConfigurationSource, Result, SourceKind,
};
use layerconf_parser::file::extension_of;
use layerconf_parser::{FileFormat, FileSource};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, trace, warn};

/// Default key of the section listing the files
pub const DEFAULT_SECTION_KEY: &str = "AddFile";

/// Logging level of an entry, as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingLevel {
    Trace,
    Debug,
    #[default]
    Information,
    Warning,
    Error,
    Critical,
    None,
}

impl FromStr for LoggingLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LoggingLevel::Trace),
            "debug" => Ok(LoggingLevel::Debug),
            "information" => Ok(LoggingLevel::Information),
            "warning" => Ok(LoggingLevel::Warning),
            "error" => Ok(LoggingLevel::Error),
            "critical" => Ok(LoggingLevel::Critical),
            "none" => Ok(LoggingLevel::None),
            _ => Err(format!("Unknown logging level: {}", s)),
        }
    }
}

impl LoggingLevel {
    /// Unknown or missing levels fall back to `Information`
    pub fn parse_or_default(level: Option<&str>) -> Self {
        level.and_then(|l| l.parse().ok()).unwrap_or_default()
    }

    pub fn is_enabled(&self) -> bool {
        *self != LoggingLevel::None
    }
}

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LoggingLevel::Trace => trace!($($arg)+),
            LoggingLevel::Debug => debug!($($arg)+),
            LoggingLevel::Information => info!($($arg)+),
            LoggingLevel::Warning => warn!($($arg)+),
            LoggingLevel::Error | LoggingLevel::Critical => error!($($arg)+),
            LoggingLevel::None => {}
        }
    };
}

/// A file to add
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddFileEntry {
    pub path: PathBuf,
    pub optional: bool,
    pub reload_on_change: bool,
    pub logging_level: LoggingLevel,
}

/// Adds the file of an entry to a builder
pub type AddFileFn = dyn Fn(&mut ConfigurationBuilder, &AddFileEntry) + Send + Sync;

/// Options of an add-file source
#[derive(Clone)]
pub struct AddFileOptions {
    pub section_key: String,
    /// Fail on unsupported extensions; a `Type: Settings` entry overrides it
    pub throw_if_not_supported: Option<bool>,
    providers: Vec<(String, Arc<AddFileFn>)>,
}

impl Default for AddFileOptions {
    fn default() -> Self {
        Self::new(DEFAULT_SECTION_KEY)
    }
}

impl fmt::Debug for AddFileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddFileOptions")
            .field("section_key", &self.section_key)
            .field("throw_if_not_supported", &self.throw_if_not_supported)
            .field(
                "providers",
                &self.providers.iter().map(|(ext, _)| ext.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn normalize_extension(extension: &str) -> String {
    format!(".{}", extension.trim().trim_start_matches('.').to_ascii_lowercase())
}

impl AddFileOptions {
    pub fn new(section_key: impl Into<String>) -> Self {
        Self {
            section_key: section_key.into(),
            throw_if_not_supported: None,
            providers: Vec::new(),
        }
    }

    pub fn throw_if_not_supported(mut self, throw: Option<bool>) -> Self {
        self.throw_if_not_supported = throw;
        self
    }

    /// Handle `extension` with `add_file`, replacing any previous handler
    pub fn add_provider<F>(mut self, extension: &str, add_file: F) -> Self
    where
        F: Fn(&mut ConfigurationBuilder, &AddFileEntry) + Send + Sync + 'static,
    {
        let extension = normalize_extension(extension);
        self.providers.retain(|(ext, _)| *ext != extension);
        self.providers.push((extension, Arc::new(add_file)));
        self
    }

    /// Handle `extension` with `add_file` unless it is already supported
    pub fn try_add_provider<F>(self, extension: &str, add_file: F) -> Self
    where
        F: Fn(&mut ConfigurationBuilder, &AddFileEntry) + Send + Sync + 'static,
    {
        if self.supports(extension) {
            return self;
        }
        self.add_provider(extension, add_file)
    }

    /// Read files with `extension` as `format`
    pub fn add_format(self, extension: &str, format: FileFormat) -> Self {
        self.add_provider(extension, move |builder, entry| {
            builder.add(
                FileSource::new(&entry.path, format)
                    .optional(entry.optional)
                    .reload_on_change(entry.reload_on_change),
            );
        })
    }

    /// True when files with `extension` can be added
    pub fn supports(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        self.provider(&extension).is_some() || FileFormat::from_extension(&extension).is_some()
    }

    fn provider(&self, extension: &str) -> Option<&Arc<AddFileFn>> {
        self.providers
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, provider)| provider)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SettingsEntry {
    optional: Option<bool>,
    reload_on_change: Option<bool>,
    logging_level: Option<String>,
    throw_if_not_support: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FileEntry {
    path: String,
    optional: Option<bool>,
    reload_on_change: Option<bool>,
    logging_level: Option<String>,
}

/// Effective default settings
#[derive(Debug, Clone)]
struct Defaults {
    optional: bool,
    reload_on_change: bool,
    logging_level: LoggingLevel,
    throw_if_not_supported: Option<bool>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            optional: true,
            reload_on_change: true,
            logging_level: LoggingLevel::Information,
            throw_if_not_supported: None,
        }
    }
}

/// The files of a section and the settings that apply to them
#[derive(Debug)]
struct Plan {
    defaults: Defaults,
    entries: Vec<AddFileEntry>,
}

fn plan(section: &ConfigurationSection) -> Result<Plan> {
    let mut defaults = Defaults::default();
    let children = section.children();

    for child in &children {
        if child.value().is_some() {
            continue;
        }
        let Some(kind) = child.get("Type") else {
            continue;
        };
        if kind.eq_ignore_ascii_case("Settings") {
            let settings: SettingsEntry = child.get_as()?;
            defaults.optional = settings.optional.unwrap_or(defaults.optional);
            defaults.reload_on_change = settings.reload_on_change.unwrap_or(defaults.reload_on_change);
            defaults.logging_level = LoggingLevel::parse_or_default(settings.logging_level.as_deref());
            defaults.throw_if_not_supported = settings.throw_if_not_support.or(defaults.throw_if_not_supported);
            info!(
                "AddFile default settings: optional={} reload_on_change={} logging_level={:?}",
                defaults.optional, defaults.reload_on_change, defaults.logging_level
            );
        } else {
            error!("AddFile unknown type entry '{}': {:?}", child.path(), child.entries());
        }
    }

    let mut entries = Vec::new();
    for child in &children {
        if let Some(path) = child.value() {
            entries.push(AddFileEntry {
                path: PathBuf::from(path),
                optional: defaults.optional,
                reload_on_change: defaults.reload_on_change,
                logging_level: defaults.logging_level,
            });
        } else if child.get("Type").is_some() {
            // settings and typed entries were handled above
        } else if child.get("Path").is_some() {
            let entry: FileEntry = child.get_as()?;
            entries.push(AddFileEntry {
                path: PathBuf::from(entry.path),
                optional: entry.optional.unwrap_or(defaults.optional),
                reload_on_change: entry.reload_on_change.unwrap_or(defaults.reload_on_change),
                logging_level: entry
                    .logging_level
                    .as_deref()
                    .map(|l| LoggingLevel::parse_or_default(Some(l)))
                    .unwrap_or(defaults.logging_level),
            });
        } else if defaults.logging_level.is_enabled() {
            error!("AddFile unknown entry '{}'", child.path());
        }
    }

    Ok(Plan { defaults, entries })
}

/// Textual snapshot of every value in the section, used to detect changes
fn snapshot(section: &ConfigurationSection) -> String {
    section
        .entries()
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug)]
struct CachedFiles {
    state: String,
    configuration: Configuration,
}

/// Adds the files listed in a section of an already-built configuration
#[derive(Clone)]
pub struct AddFileSource {
    section: ConfigurationSection,
    options: AddFileOptions,
    cache: Arc<Mutex<Option<CachedFiles>>>,
}

impl fmt::Debug for AddFileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddFileSource")
            .field("section", &self.section.path())
            .field("options", &self.options)
            .finish()
    }
}

impl AddFileSource {
    /// Read the entries from `options.section_key` of `configuration`
    pub fn new(configuration: &Configuration, options: AddFileOptions) -> Self {
        Self {
            section: configuration.section(&options.section_key),
            options,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// The configuration of the listed files, reused while the section is
    /// unchanged. The flag is true when it was freshly built.
    fn files(&self, base_path: Option<&Path>) -> Result<(Configuration, bool)> {
        let state = snapshot(&self.section);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = cache.as_ref().filter(|c| c.state == state) {
            trace!("AddFile configuration uses cache");
            return Ok((cached.configuration.clone(), false));
        }

        let configuration = self.build_files(base_path)?;
        *cache = Some(CachedFiles {
            state,
            configuration: configuration.clone(),
        });
        Ok((configuration, true))
    }

    fn build_files(&self, base_path: Option<&Path>) -> Result<Configuration> {
        let plan = plan(&self.section)?;
        let mut builder = ConfigurationBuilder::new();
        if let Some(base_path) = base_path {
            builder.set_base_path(base_path);
        }

        for entry in &plan.entries {
            let extension = extension_of(&entry.path).to_ascii_lowercase();

            if let Some(provider) = self.options.provider(&extension) {
                log_at!(entry.logging_level, "Add configuration file {}", entry.path.display());
                provider(&mut builder, entry);
            } else if let Some(format) = FileFormat::from_extension(&extension) {
                log_at!(entry.logging_level, "Add configuration file {}", entry.path.display());
                builder.add(
                    FileSource::new(&entry.path, format)
                        .optional(entry.optional)
                        .reload_on_change(entry.reload_on_change),
                );
            } else {
                if entry.logging_level.is_enabled() {
                    error!(
                        "AddFile is not supported file extension '{}' with '{}'",
                        extension,
                        entry.path.display()
                    );
                }
                let throw = plan
                    .defaults
                    .throw_if_not_supported
                    .or(self.options.throw_if_not_supported)
                    .unwrap_or(false);
                if throw {
                    return Err(ConfigError::UnsupportedExtension {
                        extension,
                        path: entry.path.clone(),
                    });
                }
            }
        }

        builder.build()
    }
}

impl ConfigurationSource for AddFileSource {
    fn build(&self, builder: &ConfigurationBuilder) -> Result<Box<dyn ConfigurationProvider>> {
        Ok(Box::new(AddFileProvider {
            source: self.clone(),
            base_path: builder.base_path().map(Path::to_path_buf),
            inner: None,
        }))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::AddFile
    }

    fn watch_paths(&self, builder: &ConfigurationBuilder) -> Vec<PathBuf> {
        match plan(&self.section) {
            Ok(plan) => plan
                .entries
                .iter()
                .filter(|e| e.reload_on_change)
                .map(|e| builder.resolve_path(&e.path))
                .collect(),
            Err(e) => {
                warn!("AddFile entries could not be read: {}", e);
                Vec::new()
            }
        }
    }
}

/// Serves the values of the added files
#[derive(Debug)]
pub struct AddFileProvider {
    source: AddFileSource,
    base_path: Option<PathBuf>,
    inner: Option<ChainedProvider>,
}

impl ConfigurationProvider for AddFileProvider {
    fn load(&mut self) -> Result<()> {
        let reloading = self.inner.is_some();
        if reloading {
            self.source.section.configuration().reload()?;
        }

        let (configuration, fresh) = self.source.files(self.base_path.as_deref())?;
        if reloading && !fresh {
            configuration.reload()?;
        }
        self.inner = Some(ChainedProvider::new(configuration));
        Ok(())
    }

    fn try_get(&self, key: &str) -> Option<String> {
        self.inner.as_ref().and_then(|inner| inner.try_get(key))
    }

    fn child_keys(&self, parent_path: Option<&str>) -> Vec<String> {
        self.inner
            .as_ref()
            .map(|inner| inner.child_keys(parent_path))
            .unwrap_or_default()
    }
}
