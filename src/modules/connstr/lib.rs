//! Connection strings for layerconf
//!
//! Reads the `ConnectionStrings` section of a configuration and turns it into
//! named, provider-classified connection strings:
//!
//! - a `<name>_<provider>` key or a sibling `<name>_ProviderName` key sets
//!   the provider of `<name>`
//! - `${other}` style tokens in a value are replaced by the resolved value of
//!   another connection string
//! - results are cached per provider selection
//!
//! ```no_run
//! use layerconf_connstr::ConnectionStringManager;
//! use layerconf_core::ConfigurationBuilder;
//! use layerconf_types::DbProvider;
//!
//! let mut builder = ConfigurationBuilder::new();
//! builder.add_in_memory([("ConnectionStrings:Main_mssql", "Server=db")]);
//! let configuration = builder.build().unwrap();
//!
//! let manager = ConnectionStringManager::from_configuration(&configuration)
//!     .clone_with_provider(DbProvider::SqlServer);
//! let main = manager.get(Some("main"), &[]).unwrap();
//! assert_eq!(main.value(), "Server=db");
//! ```

pub mod expander;
pub mod manager;
pub mod model;
pub mod parser;
pub mod root;
pub mod scanner;
pub mod utilities;

pub use manager::ConnectionStringManager;
pub use model::{ConnectionStrings, KeyNormalizer, ProviderConnectionString};
pub use parser::ConnectionStringParser;
pub use root::{ConnectionStringFactory, ConnectionStringsRoot};
