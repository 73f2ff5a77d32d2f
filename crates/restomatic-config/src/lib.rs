//! # Restomatic Configuration
//!
//! Typed configuration for the query compositor (`DatabaseConfig`) and the
//! endpoint router (`RouterConfig`), plus a loader that reads either from a
//! TOML, YAML or JSON file.
//!
//! ```rust,no_run
//! use restomatic_config::ConfigLoader;
//!
//! let config = ConfigLoader::load_from_file("restomatic.toml")?;
//! println!("database at {}", config.database.path.display());
//! # Ok::<(), restomatic_config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod database;
mod error;
mod loader;
mod router;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, RestomaticConfig};
pub use router::RouterConfig;
