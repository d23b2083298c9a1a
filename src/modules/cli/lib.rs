//! layerconf CLI
//!
//! This crate provides the command-line interface for inspecting a composed
//! configuration:
//! - show: Print every key and value
//! - get: Print one value
//! - connstr: Print resolved connection strings
//! - watch: Re-print the configuration when files change

pub mod commands;

pub use commands::{Cli, Commands};
