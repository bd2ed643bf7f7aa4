//! Core error types for adherence-core.
//!
//! Constraint violations are not errors: they are returned as
//! [`DosageCheckResult`](crate::dosage::DosageCheckResult) values. The types here
//! cover configuration that must be rejected before evaluation ever runs.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for adherence-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Dosage constraint configuration errors
    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while building a dosage constraint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    /// A duration, count or amount that must be positive was not
    #[error("Invalid constraint configuration for '{field}': {message}")]
    InvalidConstraintConfiguration { field: String, message: String },
}

impl ConstraintError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConstraintError::InvalidConstraintConfiguration {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Regeneration counters out of order or zero
    #[error(
        "Invalid regeneration state: last_full_regen_number ({last_full}) must be between 1 and generation_number ({generation})"
    )]
    InvalidRegenerationState { generation: u32, last_full: u32 },

    /// Regeneration interval must be positive
    #[error("Full regeneration interval must be positive, got {0}")]
    InvalidInterval(u32),}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
