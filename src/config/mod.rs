//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, path from --config / NODE_CONFIG_PATH)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → NodeConfig (validated)
//!     → blockchain::contracts (fills ENS-resolved addresses)
//!     → handed by value to the service factory
//! ```
//!
//! # Design Decisions
//! - Config is loaded once per process run; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{config_path_from_env, load_config, ConfigError};
pub use schema::{
    ChainConfig, EnsConfig, HealthConfig, LogConfig, NodeConfig, ObservabilityConfig,
    RegistryConfig, SupervisorConfig,
};
pub use validation::ValidationError;
