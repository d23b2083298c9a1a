//! Environment variable source

use layerconf_core::{
    key, ConfigData, ConfigurationBuilder, ConfigurationProvider, ConfigurationSource, Result,
    SourceKind,
};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Prefixes used by hosting platforms to publish connection strings, with the
/// provider name each implies
const CONNECTION_STRING_PREFIXES: &[(&str, Option<&str>)] = &[
    ("MYSQLCONNSTR_", Some("MySql.Data.MySqlClient")),
    ("SQLAZURECONNSTR_", Some("System.Data.SqlClient")),
    ("SQLCONNSTR_", Some("System.Data.SqlClient")),
    ("POSTGRESQLCONNSTR_", Some("Npgsql")),
    ("CUSTOMCONNSTR_", None),
];

/// Source reading environment variables.
///
/// `__` in a variable name maps to the `:` key delimiter. When a prefix is
/// set, only matching variables are kept and the prefix is removed.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    prefix: Option<String>,
    vars: Option<Vec<(String, String)>>,
    dotenv: Option<PathBuf>,
}

impl EnvSource {
    /// Read all process environment variables
    pub fn new() -> Self {
        Self::default()
    }

    /// Only keep variables starting with `prefix` (case-insensitive)
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    /// Use a fixed set of variables instead of the process environment
    pub fn vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Merge variables from a `.env` file; variables already set take
    /// precedence
    pub fn dotenv(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = Some(path.into());
        self
    }
}

impl ConfigurationSource for EnvSource {
    fn build(&self, builder: &ConfigurationBuilder) -> Result<Box<dyn ConfigurationProvider>> {
        Ok(Box::new(EnvProvider {
            prefix: self.prefix.clone().unwrap_or_default(),
            vars: self.vars.clone(),
            dotenv: self.dotenv.as_ref().map(|p| builder.resolve_path(p)),
            data: ConfigData::new(),
        }))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Environment
    }
}

#[derive(Debug)]
pub struct EnvProvider {
    prefix: String,
    vars: Option<Vec<(String, String)>>,
    dotenv: Option<PathBuf>,
    data: ConfigData,
}

impl EnvProvider {
    fn collect_vars(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = match &self.vars {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };

        if let Some(path) = self.dotenv.as_ref().filter(|p| p.is_file()) {
            match dotenvy::from_path_iter(path) {
                Ok(iter) => {
                    for item in iter {
                        match item {
                            Ok((k, v)) => {
                                if !vars.iter().any(|(existing, _)| existing == &k) {
                                    vars.push((k, v));
                                }
                            }
                            Err(e) => warn!("Skipping entry in '{}': {}", path.display(), e),
                        }
                    }
                }
                Err(e) => warn!("Failed to read '{}': {}", path.display(), e),
            }
        }

        vars
    }

    fn add_if_prefixed(&mut self, key: String, value: &str) {
        if self.prefix.is_empty() {
            self.data.set(key, value);
        } else if key.len() >= self.prefix.len()
            && key.is_char_boundary(self.prefix.len())
            && key[..self.prefix.len()].eq_ignore_ascii_case(&self.prefix)
        {
            self.data.set(&key[self.prefix.len()..], value);
        }
    }
}

/// Map `__` to the key delimiter
fn normalize(name: &str) -> String {
    name.replace("__", &key::KEY_DELIMITER.to_string())
}

fn connection_string_prefix(name: &str) -> Option<(&'static str, Option<&'static str>)> {
    CONNECTION_STRING_PREFIXES.iter().copied().find(|(prefix, _)| {
        name.len() >= prefix.len()
            && name.is_char_boundary(prefix.len())
            && name[..prefix.len()].eq_ignore_ascii_case(prefix)
    })
}

impl ConfigurationProvider for EnvProvider {
    fn load(&mut self) -> Result<()> {
        self.data.clear();
        for (name, value) in self.collect_vars() {
            match connection_string_prefix(&name) {
                Some((prefix, provider)) => {
                    let conn_key = key::combine("ConnectionStrings", &normalize(&name[prefix.len()..]));
                    self.add_if_prefixed(conn_key.clone(), &value);
                    if let Some(provider) = provider {
                        self.add_if_prefixed(format!("{}_ProviderName", conn_key), provider);
                    }
                }
                None => self.add_if_prefixed(normalize(&name), &value),
            }
        }
        debug!("Loaded {} environment keys", self.data.len());
        Ok(())
    }

    fn try_get(&self, key: &str) -> Option<String> {
        self.data.get(key).map(str::to_string)
    }

    fn child_keys(&self, parent_path: Option<&str>) -> Vec<String> {
        self.data.child_keys(parent_path)
    }
}
