//! Command-line argument source

use layerconf_core::{
    ConfigData, ConfigError, ConfigurationBuilder, ConfigurationProvider, ConfigurationSource,
    Result, SourceKind,
};
use tracing::debug;

/// Source reading `key=value` style arguments.
///
/// Accepted forms: `key=value`, `--key=value`, `/key=value`, `--key value`
/// and `/key value`. Short switches (`-k`) and aliases must be listed in the
/// switch mappings.
#[derive(Debug, Clone, Default)]
pub struct CommandLineSource {
    args: Vec<String>,
    switch_mappings: Vec<(String, String)>,
}

impl CommandLineSource {
    pub fn new<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            switch_mappings: Vec::new(),
        }
    }

    /// Map switches such as `-e` or `--env` to configuration keys.
    ///
    /// Every switch must start with `-` and appear only once (ignoring case).
    pub fn with_switch_mappings<K, V>(
        mut self,
        mappings: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (switch, key) in mappings {
            let switch = switch.into();
            if !switch.starts_with('-') {
                return Err(ConfigError::CommandLine(format!(
                    "The switch '{}' must start with '-' or '--'",
                    switch
                )));
            }
            if self
                .switch_mappings
                .iter()
                .any(|(existing, _)| existing.eq_ignore_ascii_case(&switch))
            {
                return Err(ConfigError::CommandLine(format!(
                    "Duplicate switch mapping '{}'",
                    switch
                )));
            }
            self.switch_mappings.push((switch, key.into()));
        }
        Ok(self)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl ConfigurationSource for CommandLineSource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Result<Box<dyn ConfigurationProvider>> {
        Ok(Box::new(CommandLineProvider {
            source: self.clone(),
            data: ConfigData::new(),
        }))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::CommandLine
    }
}

#[derive(Debug)]
pub struct CommandLineProvider {
    source: CommandLineSource,
    data: ConfigData,
}

impl CommandLineProvider {
    fn mapped(&self, switch: &str) -> Option<&str> {
        self.source
            .switch_mappings
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(switch))
            .map(|(_, key)| key.as_str())
    }
}

/// Parse arguments into key/value pairs
fn parse_args(provider: &CommandLineProvider) -> Result<ConfigData> {
    let mut data = ConfigData::new();
    let mut args = provider.source.args.iter();

    while let Some(raw) = args.next() {
        let (arg, key_start) = if let Some(rest) = raw.strip_prefix('/') {
            (format!("--{}", rest), 2)
        } else if raw.starts_with("--") {
            (raw.clone(), 2)
        } else if raw.starts_with('-') {
            (raw.clone(), 1)
        } else {
            (raw.clone(), 0)
        };

        let (key, value) = match arg.find('=') {
            None => {
                // a bare word without a switch prefix is not a key
                if key_start == 0 {
                    continue;
                }
                let key = match provider.mapped(&arg) {
                    Some(mapped) => mapped.to_string(),
                    None if key_start == 1 => {
                        return Err(ConfigError::CommandLine(format!(
                            "The short switch '{}' is not defined in the switch mappings",
                            raw
                        )))
                    }
                    None => arg[key_start..].to_string(),
                };
                let Some(value) = args.next() else {
                    break;
                };
                (key, value.clone())
            }
            Some(separator) => {
                let segment = &arg[..separator];
                let key = match provider.mapped(segment) {
                    Some(mapped) => mapped.to_string(),
                    None if key_start == 1 => {
                        return Err(ConfigError::CommandLine(format!(
                            "The short switch '{}' is not defined in the switch mappings",
                            raw
                        )))
                    }
                    None => arg[key_start..separator].to_string(),
                };
                (key, arg[separator + 1..].to_string())
            }
        };

        data.set(key, value);
    }

    Ok(data)
}

impl ConfigurationProvider for CommandLineProvider {
    fn load(&mut self) -> Result<()> {
        self.data = parse_args(self)?;
        debug!("Loaded {} command-line keys", self.data.len());
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

    fn build(source: CommandLineSource) -> Result<layerconf_core::Configuration> {
        let mut builder = ConfigurationBuilder::new();
        builder.add(source);
        builder.build()
    }

    #[test]
    fn test_argument_forms() {
        let config = build(CommandLineSource::new([
            "Name=svc",
            "--Logging:Level=Debug",
            "/Port=8080",
            "--environment",
            "Staging",
            "/Region",
            "eu",
            "stray",
        ]))
        .unwrap();

        assert_eq!(config.get("Name"), Some("svc".to_string()));
        assert_eq!(config.get("Logging:Level"), Some("Debug".to_string()));
        assert_eq!(config.get("Port"), Some("8080".to_string()));
        assert_eq!(config.get("environment"), Some("Staging".to_string()));
        assert_eq!(config.get("Region"), Some("eu".to_string()));
        assert_eq!(config.get("stray"), None);
    }

    #[test]
    fn test_switch_mappings() {
        let source = CommandLineSource::new(["-e", "Development", "--cs=Server=x"])
            .with_switch_mappings([("-e", "environment"), ("--cs", "ConnectionStrings:Default")])
            .unwrap();
        let config = build(source).unwrap();
        assert_eq!(config.get("environment"), Some("Development".to_string()));
        assert_eq!(config.connection_string("Default"), Some("Server=x".to_string()));
    }

    #[test]
    fn test_unmapped_short_switch_fails() {
        let err = build(CommandLineSource::new(["-x", "1"])).unwrap_err();
        assert!(matches!(err, ConfigError::CommandLine(_)));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_invalid_switch_mappings() {
        assert!(CommandLineSource::new(Vec::<String>::new())
            .with_switch_mappings([("e", "environment")])
            .is_err());
        assert!(CommandLineSource::new(Vec::<String>::new())
            .with_switch_mappings([("-e", "a"), ("-E", "b")])
            .is_err());
    }

    #[test]
    fn test_trailing_key_without_value_is_ignored() {
        let config = build(CommandLineSource::new(["a=1", "--last"])).unwrap();
        assert_eq!(config.get("a"), Some("1".to_string()));
        assert_eq!(config.get("last"), None);
    }
}
