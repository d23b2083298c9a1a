//! Connstr command implementation

use clap::Args;
use layerconf_connstr::{ConnectionStringManager, ProviderConnectionString};
use layerconf_core::{ConfigError, Configuration, CONNECTION_STRINGS_SECTION};
use serde_json::json;

/// Connstr command arguments
#[derive(Args, Debug)]
pub struct ConnstrCommand {
    /// Names to look up; the first one found is printed. Prints all
    /// connection strings when empty.
    pub names: Vec<String>,

    /// Only consider this provider (e.g. `sqlserver`, `npgsql`, `mysql`,
    /// or any custom name)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Section holding the connection strings; empty for the root
    #[arg(short, long, default_value = CONNECTION_STRINGS_SECTION)]
    pub section: String,

    /// Match names without trimming surrounding whitespace
    #[arg(long)]
    pub preserve_space: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

fn describe(connection: &ProviderConnectionString) -> serde_json::Value {
    json!({
        "name": connection.name(),
        "provider": connection.kind().to_string(),
        "customProvider": connection.custom_name(),
        "value": connection.value(),
    })
}

fn line(connection: &ProviderConnectionString) -> String {
    format!("{} [{}] = {}", connection.name(), connection.provider(), connection.value())
}

impl ConnstrCommand {
    pub fn execute(&self, configuration: &Configuration) -> Result<(), ConfigError> {
        println!("{}", self.render(configuration)?);
        Ok(())
    }

    fn manager(&self, configuration: &Configuration) -> ConnectionStringManager {
        let mut manager = ConnectionStringManager::new(configuration, &self.section);
        if self.preserve_space {
            manager = manager.clone_with_key_preserve_space();
        }
        manager.clone_with_provider(self.provider.clone())
    }

    pub fn render(&self, configuration: &Configuration) -> Result<String, ConfigError> {
        let manager = self.manager(configuration);

        if let Some((first, fallbacks)) = self.names.split_first() {
            let fallbacks: Vec<Option<&str>> = fallbacks.iter().map(|n| Some(n.as_str())).collect();
            let found = manager.get(Some(first.as_str()), &fallbacks).ok_or_else(|| {
                ConfigError::Config(format!(
                    "Connection string not found: {}",
                    self.names.join(", ")
                ))
            })?;
            return Ok(if self.json {
                serde_json::to_string_pretty(&describe(&found))?
            } else {
                found.value().to_string()
            });
        }

        let connections = manager.connection_strings();
        if self.json {
            let all: Vec<serde_json::Value> = connections.iter().map(describe).collect();
            return Ok(serde_json::to_string_pretty(&all)?);
        }
        Ok(connections.iter().map(line).collect::<Vec<_>>().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerconf_core::ConfigurationBuilder;

    fn configuration() -> Configuration {
        let mut builder = ConfigurationBuilder::new();
        builder.add_in_memory([
            ("ConnectionStrings:Host", "db.local"),
            ("ConnectionStrings:Main_mssql", "Server=${Host}"),
            ("ConnectionStrings:Reports", "Host=${Host}"),
            ("ConnectionStrings:Reports_ProviderName", "Npgsql"),
            ("ConnectionStrings:Docs_cosmos", "AccountEndpoint=x"),
        ]);
        builder.build().unwrap()
    }

    fn command(names: &[&str], provider: Option<&str>) -> ConnstrCommand {
        ConnstrCommand {
            names: names.iter().map(|n| n.to_string()).collect(),
            provider: provider.map(str::to_string),
            section: CONNECTION_STRINGS_SECTION.to_string(),
            preserve_space: false,
            json: false,
        }
    }

    #[test]
    fn test_lookup_with_fallbacks() {
        let config = configuration();
        assert_eq!(command(&["missing", "main"], None).render(&config).unwrap(), "Server=db.local");
        assert!(command(&["main"], Some("postgresql")).render(&config).is_err());
        assert_eq!(command(&["reports"], None).render(&config).unwrap(), "Host=db.local");
        // tokens only resolve against connection strings of the selected provider
        assert_eq!(
            command(&["reports"], Some("postgresql")).render(&config).unwrap(),
            "Host=${Host}"
        );
    }

    #[test]
    fn test_list_by_provider() {
        let config = configuration();
        // unnamed custom entries take the name of the selected custom provider
        assert_eq!(
            command(&[], Some("Cosmos")).render(&config).unwrap(),
            "Host [custom(Cosmos)] = db.local\n\
             Docs [custom(cosmos)] = AccountEndpoint=x\n\
             Docs_cosmos [custom(Cosmos)] = AccountEndpoint=x"
        );
        assert_eq!(
            command(&[], Some("sqlserver")).render(&config).unwrap(),
            "Main [sqlserver] = Server=${Host}"
        );
    }

    #[test]
    fn test_json_output() {
        let mut cmd = command(&["Main"], None);
        cmd.json = true;
        let rendered: serde_json::Value = serde_json::from_str(&cmd.render(&configuration()).unwrap()).unwrap();
        assert_eq!(rendered["name"], "Main");
        assert_eq!(rendered["provider"], "sqlserver");
        assert_eq!(rendered["customProvider"], serde_json::Value::Null);
        assert_eq!(rendered["value"], "Server=db.local");
    }
}
