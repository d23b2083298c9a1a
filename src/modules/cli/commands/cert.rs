//! Cert command implementation

use clap::Args;
use layerconf_core::{ConfigError, Configuration};
use layerconf_hosting::certificate::DEFAULT_SECTION_KEY;
use layerconf_hosting::{load_certificate, CertificateConfig};
use std::path::Path;

/// Cert command arguments
#[derive(Args, Debug)]
pub struct CertCommand {
    /// Section describing the certificate
    #[arg(default_value = DEFAULT_SECTION_KEY)]
    pub section: String,

    /// Accept a certificate without private key
    #[arg(long)]
    pub public_only: bool,
}

impl CertCommand {
    pub fn execute(&self, configuration: &Configuration, base_path: Option<&Path>) -> Result<(), ConfigError> {
        println!("{}", self.render(configuration, base_path)?);
        Ok(())
    }

    pub fn render(&self, configuration: &Configuration, base_path: Option<&Path>) -> Result<String, ConfigError> {
        let config = CertificateConfig::from_section(&configuration.section(&self.section))?;
        let certificate = load_certificate(&config, &self.section, base_path, !self.public_only)?
            .ok_or_else(|| ConfigError::Config(format!("No certificate configured in '{}'", self.section)))?;

        Ok(format!(
            "{}\ncertificates: {}\nprivate key: {}",
            certificate.path().display(),
            certificate.chain().len(),
            if certificate.has_private_key() { "yes" } else { "no" }
        ))
    }
}
