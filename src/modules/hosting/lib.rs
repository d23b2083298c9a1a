//! Application configuration for layerconf
//!
//! [`ConfigurationBuilderBuilder`] composes the usual layers (settings
//! files, environment variables, command line) and can add sources that
//! post-process what was composed so far:
//!
//! - [`AddFileSource`] adds the files listed in an `AddFile` section
//! - [`TransformSource`] derives keys from a `Transform` section
//! - [`MapSource`] copies values as listed in a `MapConfiguration` section
//!
//! [`load_certificate`] reads the certificate file a section describes.

pub mod add_file;
pub mod builder;
pub mod certificate;
pub mod extensions;
pub mod map;
pub mod transform;

pub use add_file::{AddFileEntry, AddFileOptions, AddFileSource, LoggingLevel};
pub use builder::ConfigurationBuilderBuilder;
pub use certificate::{load_certificate, Certificate, CertificateConfig};
pub use extensions::ConfigurationBuilderExt;
pub use map::MapSource;
pub use transform::TransformSource;
