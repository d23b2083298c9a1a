//! layerconf CLI
//!
//! Command-line interface for layered configuration and connection strings.

use clap::Parser;
use layerconf_cli::{Cli, Commands};
use layerconf_core::ConfigError;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run() -> Result<(), ConfigError> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut builder = cli.configuration_builder();

    // Execute command
    match &cli.command {
        Commands::Show(cmd) => {
            cmd.execute(&builder.build()?)?;
        }
        Commands::Get(cmd) => {
            cmd.execute(&builder.build()?)?;
        }
        Commands::Connstr(cmd) => {
            cmd.execute(&builder.build()?)?;
        }
        Commands::Cert(cmd) => {
            let configuration = builder.build()?;
            cmd.execute(&configuration, builder.base_path())?;
        }
        Commands::Watch(cmd) => {
            cmd.execute(builder).await?;
        }
        Commands::Completion(cmd) => {
            cmd.execute();
        }
    }

    Ok(())
}
