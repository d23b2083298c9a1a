//! Configuration tree and composition

mod bind;
mod builder;
mod chained;
mod data;
pub mod key;
mod memory;
mod provider;
mod root;
mod section;

pub use builder::ConfigurationBuilder;
pub use chained::{ChainedProvider, ChainedSource};
pub use data::ConfigData;
pub use memory::{MemoryProvider, MemorySource};
pub use provider::{ConfigurationProvider, ConfigurationSource, SourceKind};
pub use root::{Configuration, CONNECTION_STRINGS_SECTION};
pub use section::ConfigurationSection;
