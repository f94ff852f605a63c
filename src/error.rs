//! Error types for Floodgate.

use thiserror::Error;

/// Main error type for Floodgate operations.
///
/// The limiters themselves never fail; these errors come from the
/// configuration layer and the command-line driver.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unrecognised policy names
    #[error("Unknown policy '{0}'")]
    UnknownPolicy(String),

    /// Malformed driver commands
    #[error("Invalid command: {0}")]
    Command(String),

    /// Layered settings could not be loaded
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;
