//! Core configuration model for layerconf
//!
//! This crate contains the configuration tree (ordered providers merged into a
//! single `:`-delimited key space), the builder that composes sources, serde
//! binding of configuration subtrees, and the shared error type.

pub mod config;
pub mod error;

pub use config::*;
pub use error::{ConfigError, Result};
