//! CLI commands

mod cert;
mod completion;
mod connstr;
mod get;
mod show;
mod watch;

pub use cert::CertCommand;
pub use completion::CompletionCommand;
pub use connstr::ConnstrCommand;
pub use get::GetCommand;
pub use show::ShowCommand;
pub use watch::WatchCommand;

use clap::{Parser, Subcommand};
use layerconf_hosting::{AddFileOptions, ConfigurationBuilderBuilder};

/// layerconf - Inspect layered configuration and connection strings
#[derive(Parser, Debug)]
#[command(name = "layerconf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding appsettings files (defaults to the current directory)
    #[arg(short = 'b', long = "base-path", global = true)]
    pub base_path: Option<String>,

    /// Environment name, selects `appsettings.<ENV>.json`
    #[arg(short = 'e', long = "environment", global = true)]
    pub environment: Option<String>,

    /// Override a key, e.g. `--set ConnectionStrings:Main=Server=db`
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    pub set: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the composed configuration
    Show(ShowCommand),

    /// Print a single value
    Get(GetCommand),

    /// Print resolved connection strings
    Connstr(ConnstrCommand),

    /// Load the certificate file a section describes
    Cert(CertCommand),

    /// Re-print the configuration whenever a watched file changes
    Watch(WatchCommand),

    #[command(hide = true)]
    Completion(CompletionCommand),
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The composition described by the global options. `--set` overrides
    /// are applied as command-line arguments, above every file and variable.
    pub fn configuration_builder(&self) -> ConfigurationBuilderBuilder {
        let mut builder = ConfigurationBuilderBuilder::create(self.set.iter().cloned());
        builder = match &self.base_path {
            Some(base_path) => builder.with_base_path(base_path),
            None => builder.with_current_directory(),
        };
        if let Some(environment) = &self.environment {
            builder = builder.with_environment(environment);
        }
        builder
            .with_add_file_configuration(AddFileOptions::default())
            .with_transform_configuration(None)
            .with_map_configuration(None)
    }
}
