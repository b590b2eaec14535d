//! Error types for Synheart Thermal
//!
//! Numeric degeneracies inside the models are handled by clamping or
//! substitution and never surface here. These variants cover caller-facing
//! failures: malformed input documents and unusable run options.

use thiserror::Error;

/// Errors that can occur while configuring or driving a simulation
#[derive(Debug, Error)]
pub enum ThermalError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Expected {expected} values for {field}, got {actual}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Integration error: {0}")]
    IntegrationError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
