//! Error handling for the element template updater.
//!
//! This module defines the main error type `Error` used by the configuration
//! layer and the collaborator adapters, along with a convenient `Result` type
//! alias. The update engine itself never returns these to its callers: every
//! failure during a reconciliation cycle is turned into a warning string.
//!
//! # Examples
//!
//! ```
//! use element_template_updater::core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     // Operations that might fail...
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type for template updater operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for template updater operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Transport-level HTTP error (connection, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new HTTP transport error
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Self::Http(msg.into())
    }
}
