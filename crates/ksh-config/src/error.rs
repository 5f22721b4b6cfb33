use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading settings or resolving a launch
/// configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The specified settings file was not found.
    #[error("settings file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to create the default settings file.
    #[error("failed to create default settings: {0}")]
    CreateDefault(String),

    /// TOML or JSON parsing failed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A required launch attribute is absent.
    #[error("Please specify \"{0}\" in launch.json.")]
    MissingField(&'static str),

    /// A launch attribute that has been renamed.
    #[error("`{old}` is deprecated. Use `{new}` instead.")]
    Deprecated {
        /// The retired key.
        old: &'static str,
        /// Its replacement.
        new: &'static str,
    },

    /// A value failed validation.
    #[error("validation error: {field}: {message}")]
    Validation {
        /// The dotted field path (e.g. `log.level`).
        field: String,
        /// Human-readable description of the violation.
        message: String,
    },

    /// An I/O error occurred while reading or writing settings files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
