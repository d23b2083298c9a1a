//! Type definitions for layerconf
//!
//! This crate contains the small value types shared across the layerconf
//! workspace: database provider kinds, provider names and provider selectors.

pub mod provider;
pub mod selector;

pub use provider::{DbProvider, ProviderName};
pub use selector::Selector;
