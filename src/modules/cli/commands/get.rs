//! Get command implementation

use clap::Args;
use layerconf_core::{ConfigError, Configuration};

/// Get command arguments
#[derive(Args, Debug)]
pub struct GetCommand {
    /// Full `:`-delimited key, matched case-insensitively
    pub key: String,
}

impl GetCommand {
    pub fn execute(&self, configuration: &Configuration) -> Result<(), ConfigError> {
        println!("{}", self.lookup(configuration)?);
        Ok(())
    }

    pub fn lookup(&self, configuration: &Configuration) -> Result<String, ConfigError> {
        configuration
            .get(&self.key)
            .ok_or_else(|| ConfigError::Config(format!("Key '{}' not found", self.key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerconf_core::ConfigurationBuilder;

    #[test]
    fn test_lookup() {
        let mut builder = ConfigurationBuilder::new();
        builder.add_in_memory([("Db:Host", "localhost")]);
        let config = builder.build().unwrap();

        let found = GetCommand { key: "DB:HOST".to_string() };
        assert_eq!(found.lookup(&config).unwrap(), "localhost");

        let missing = GetCommand { key: "Db".to_string() };
        assert!(matches!(missing.lookup(&config), Err(ConfigError::Config(_))));
    }
}
