//! Configuration for kiln: `kiln.toml` discovery, `KILN_` environment
//! overrides and named profiles.

pub mod config;
pub mod discovery;
pub mod error;
pub mod settings;

pub use config::{CacheSection, KilnConfig, OrderSection};
pub use discovery::{CONFIG_FILE, ConfigDiscovery, ENV_PREFIX, discover, discover_with_profile};
pub use error::{ConfigError, Result};
pub use settings::{GlobalSettings, LOG_LEVELS};
