//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → one ListenerSpec handed to each listener at startup
//! ```
//!
//! # Design Decisions
//! - Config is loaded once; there is no reload
//! - Optional sections have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, ConfigFormat};
pub use schema::{
    ListenerSpec, ObservabilityConfig, RouteEntry, RouterConfig, ShutdownConfig, WebSocketConfig,
    DEFAULT_TARGET_HOST,
};
