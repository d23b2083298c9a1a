//! Certificates described by a configuration section
//!
//! ```yaml
//! Certificate:
//!   Path: server.pfx
//!   Password: secret
//! ```
//!
//! `Path` alone (plus `KeyPath` when the key lives in another file) loads
//! PEM; `Path` with `Password` loads PKCS#12. `Thumbprint` and `Subject`
//! name certificates in an OS store, which is not available here.

use layerconf_core::{ConfigError, ConfigurationSection, Result};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default key of the section describing a certificate
pub const DEFAULT_SECTION_KEY: &str = "Certificate";

const PEM_EXTENSIONS: &[&str] = &["pem", "crt", "cer"];

/// Where to find a certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CertificateConfig {
    pub path: Option<String>,
    /// PEM private key; defaults to `path`
    pub key_path: Option<String>,
    pub password: Option<String>,
    /// Force PEM (`true`) or PKCS#12 (`false`); detected from the extension
    /// of `path` when unset
    pub is_pem: Option<bool>,
    pub thumbprint: Option<String>,
    pub subject: Option<String>,
    pub store: Option<String>,
    pub location: Option<String>,
    pub allow_invalid: Option<bool>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.is_empty())
}

impl CertificateConfig {
    /// Bind the section, e.g. `configuration.section("Certificate")`
    pub fn from_section(section: &ConfigurationSection) -> Result<Self> {
        section.get_as()
    }

    pub fn is_file_cert(&self) -> bool {
        present(&self.path)
    }

    pub fn is_store_thumbprint(&self) -> bool {
        present(&self.thumbprint)
    }

    pub fn is_store_subject(&self) -> bool {
        present(&self.subject)
    }

    fn is_pem_file(&self, path: &Path) -> bool {
        self.is_pem.unwrap_or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| PEM_EXTENSIONS.iter().any(|p| p.eq_ignore_ascii_case(e)))
        })
    }
}

impl fmt::Display for CertificateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = if self.is_file_cert() {
            &self.path
        } else if self.is_store_thumbprint() {
            &self.thumbprint
        } else {
            &self.subject
        };
        f.write_str(shown.as_deref().unwrap_or_default())
    }
}

/// A loaded certificate chain, leaf first, with its private key if any
#[derive(Debug)]
pub struct Certificate {
    path: PathBuf,
    chain: Vec<CertificateDer<'static>>,
    private_key: Option<PrivateKeyDer<'static>>,
}

impl Certificate {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    pub fn leaf(&self) -> Option<&CertificateDer<'static>> {
        self.chain.first()
    }

    pub fn private_key(&self) -> Option<&PrivateKeyDer<'static>> {
        self.private_key.as_ref()
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }
}

fn resolve(path: &str, base_path: Option<&Path>) -> PathBuf {
    let path = Path::new(path);
    match base_path {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::Io(e),
    })
}

fn load_pem(config: &CertificateConfig, path: &Path, base_path: Option<&Path>, required_private_key: bool) -> Result<Certificate> {
    let content = read(path)?;
    let chain = rustls_pemfile::certs(&mut content.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::parse(path, format!("PEM error: {}", e)))?;
    if chain.is_empty() {
        return Err(ConfigError::parse(path, "no certificate found"));
    }

    let mut private_key = None;
    if required_private_key {
        let key_path = match config.key_path.as_deref().filter(|k| !k.is_empty()) {
            Some(key_path) => resolve(key_path, base_path),
            None => path.to_path_buf(),
        };
        let key_file = if key_path == path { None } else { Some(read(&key_path)?) };
        let key_content = key_file.as_deref().unwrap_or(&content);
        private_key = rustls_pemfile::private_key(&mut &key_content[..])
            .map_err(|e| ConfigError::parse(&key_path, format!("PEM error: {}", e)))?;
        if private_key.is_none() && present(&config.password) {
            return Err(ConfigError::Config(format!(
                "Encrypted PEM private keys are not supported, use PKCS#12 for '{}'",
                key_path.display()
            )));
        }
    }

    Ok(Certificate {
        path: path.to_path_buf(),
        chain,
        private_key,
    })
}

fn pkcs12_error(path: &Path, e: impl fmt::Debug) -> ConfigError {
    ConfigError::parse(path, format!("PKCS#12 error: {:?}", e))
}

fn load_pkcs12(config: &CertificateConfig, path: &Path) -> Result<Certificate> {
    let content = read(path)?;
    let password = config.password.as_deref().unwrap_or_default();
    let pfx = p12::PFX::parse(&content).map_err(|e| pkcs12_error(path, e))?;
    if !pfx.verify_mac(password) {
        return Err(ConfigError::Config(format!(
            "The password of certificate '{}' is not correct",
            path.display()
        )));
    }

    let chain: Vec<CertificateDer<'static>> = pfx
        .cert_x509_bags(password)
        .map_err(|e| pkcs12_error(path, e))?
        .into_iter()
        .map(CertificateDer::from)
        .collect();
    if chain.is_empty() {
        return Err(ConfigError::parse(path, "no certificate found"));
    }
    let private_key = pfx
        .key_bags(password)
        .map_err(|e| pkcs12_error(path, e))?
        .into_iter()
        .next()
        .map(|der| PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(der)));

    Ok(Certificate {
        path: path.to_path_buf(),
        chain,
        private_key,
    })
}

/// Load the certificate described by `config`.
///
/// Relative paths resolve against `base_path`. Returns `Ok(None)` when no
/// source is configured, and an error when more than one is, when the
/// certificate lives in an OS store, or when `required_private_key` is set
/// and the file has no key.
pub fn load_certificate(
    config: &CertificateConfig,
    description: &str,
    base_path: Option<&Path>,
    required_private_key: bool,
) -> Result<Option<Certificate>> {
    let sources = [config.is_file_cert(), config.is_store_thumbprint(), config.is_store_subject()];
    if sources.iter().filter(|s| **s).count() > 1 {
        return Err(ConfigError::Config(format!(
            "The source {} specified multiple certificate sources",
            description
        )));
    }

    let Some(path) = config.path.as_deref().filter(|p| !p.is_empty()) else {
        if config.is_store_thumbprint() || config.is_store_subject() {
            return Err(ConfigError::Config(format!(
                "The source {} names certificate '{}' in a certificate store; only files can be loaded",
                description, config
            )));
        }
        return Ok(None);
    };

    let path = resolve(path, base_path);
    let certificate = if config.is_pem_file(&path) {
        load_pem(config, &path, base_path, required_private_key)?
    } else {
        load_pkcs12(config, &path)?
    };

    if required_private_key && !certificate.has_private_key() {
        return Err(ConfigError::Config(format!(
            "The certificate '{}' doesn't have private key",
            path.display()
        )));
    }

    debug!(
        "Loaded {} certificates from '{}' for {}",
        certificate.chain().len(),
        path.display(),
        description
    );
    Ok(Some(certificate))
}
