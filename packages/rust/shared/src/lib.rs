//! Shared types, error model, and configuration for KrishiMitra+.
//!
//! This crate is the foundation depended on by all other KrishiMitra crates.
//! It provides:
//! - [`KrishiMitraError`] is the unified error type
//! - Domain types ([`Coordinates`], [`Alert`], [`SessionContext`])
//! - Configuration ([`AppConfig`], [`ServerConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiKeysConfig, AppConfig, FallbackPolicy, HttpConfig, MarketConfig, ServerConfig,
    ServicesConfig, WeatherConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_api_key,
};
pub use error::{KrishiMitraError, Result};
pub use types::{Alert, AlertSeverity, Coordinates, SessionContext, UserProfile};
