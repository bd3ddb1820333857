//! Common error types for the project constructor

use thiserror::Error;

/// Common result type for constructor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors the constructor can report to its host
///
/// Priority rejections and field-level validation problems are NOT errors:
/// they are returned as values (`accepted: false`, verdict errors). Everything
/// here is either a wiring defect or a caller contract violation.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration could not be parsed
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Host forgot to register a schema for a step
    #[error("No schema registered for step {0}")]
    SchemaNotRegistered(u8),

    /// Step id outside the configured wizard range
    #[error("Unknown step: {0}")]
    UnknownStep(u8),

    /// Coupling rule does not match the registered schemas
    #[error("Invalid sync rule: {0}")]
    InvalidSyncRule(String),
}
