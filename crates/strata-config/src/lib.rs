//! Layered configuration loading and typed property binding.
//!
//! Configuration is merged from three kinds of sources, in increasing
//! priority: compiled-in struct defaults, named profile documents discovered
//! on a search path, and process environment variables. The merged settings
//! tree is then bound, prefix by prefix, into strongly-typed property groups.
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use strata_config::{Loader, LoaderOptions, Properties, Registration};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! #[serde(default)]
//! struct DatasourceProperties {
//!     url: String,
//!     max_connections: u32,
//! }
//!
//! impl Default for DatasourceProperties {
//!     fn default() -> Self {
//!         Self {
//!             url: "postgres://localhost/app".to_string(),
//!             max_connections: 10,
//!         }
//!     }
//! }
//!
//! impl Properties for DatasourceProperties {
//!     fn prefix() -> &'static str {
//!         "app.datasource"
//!     }
//! }
//!
//! # fn main() -> Result<(), strata_config::ConfigError> {
//! let loader = Loader::new(
//!     LoaderOptions::default(),
//!     vec![Registration::of::<DatasourceProperties>()],
//! )?;
//! let bound = loader.bind()?;
//! let datasource = bound.get::<DatasourceProperties>().expect("registered");
//! println!("connecting to {}", datasource.url);
//! # Ok(())
//! # }
//! ```

mod error;
mod loader;
mod placeholder;
mod props;

/// Public error type returned by loading and binding APIs.
pub use error::{ConfigError, HookError};
/// Loader surface and profile format selection.
pub use loader::{ConfigFormat, Loader, LoaderOptions};
/// Placeholder substitution helper for post-binding hooks.
pub use placeholder::resolve_placeholder;
/// Property group trait, registration descriptors, and bound output.
pub use props::{BoundProperties, Properties, Registration};

/// Serde adapter for duration fields with unit-suffix syntax (`"5s"`,
/// `"250ms"`); annotate fields with `#[serde(with = "strata_config::humantime_serde")]`
/// so property groups need no direct dependency of their own.
pub use humantime_serde;
