//! # Project Constructor Common Library
//!
//! Shared code for the project constructor engine and its hosts:
//! - Error types (`Error`, `Result`)
//! - Engine configuration loading (TOML)
//! - Event types (`ConstructorEvent`) and the `EventBus`
//! - Source tier table (`SourceTier`)

pub mod config;
pub mod error;
pub mod events;
pub mod tier;

pub use config::{EngineConfig, LoggingConfig, SyncConfig};
pub use error::{Error, Result};
pub use events::{ConstructorEvent, EventBus};
pub use tier::SourceTier;
