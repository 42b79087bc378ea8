//! Error types for the decision point.
//!
//! Errors raised while evaluating a target or condition never escape a
//! combining algorithm: they are folded into an `Indeterminate` decision with
//! the status code returned by [`Error::status_code`].

use crate::policy::{MissingAttributeDetail, StatusCode};
use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the decision point.
#[derive(Error, Debug)]
pub enum Error {
    /// Error during policy validation
    #[error("Policy validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
        /// Field that caused the error, if applicable
        field: Option<String>,
    },

    /// Error during policy parsing
    #[error("Policy parse error: {message}")]
    Parse {
        /// Detailed error message
        message: String,
    },

    /// Error during target or condition evaluation
    #[error("Evaluation error: {message}")]
    Evaluation {
        /// Detailed error message
        message: String,
    },

    /// Malformed condition expression
    #[error("Expression error: {message}")]
    Expression {
        /// Detailed error message
        message: String,
        /// The expression that failed
        expression: Option<String>,
    },

    /// A must-be-present attribute could not be resolved
    #[error("Missing attribute: {0}")]
    MissingAttribute(MissingAttributeDetail),

    /// A caller handed a combining algorithm an ill-formed child list
    #[error("Illegal state: {message}")]
    IllegalState {
        /// Detailed error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Detailed error message
        message: String,
        /// Configuration key that caused the error
        key: Option<String>,
    },

    /// Cache operation error
    #[error("Cache error: {message}")]
    Cache {
        /// Detailed error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error (unexpected condition)
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field context.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    /// Create an evaluation error.
    pub fn evaluation(message: impl Into<String>) -> Self {
        Error::Evaluation {
            message: message.into(),
        }
    }

    /// Create an expression error with expression context.
    pub fn expression_with_expr(message: impl Into<String>, expression: impl Into<String>) -> Self {
        Error::Expression {
            message: message.into(),
            expression: Some(expression.into()),
        }
    }

    /// Create an expression error.
    pub fn expression(message: impl Into<String>) -> Self {
        Error::Expression {
            message: message.into(),
            expression: None,
        }
    }

    /// Create a missing attribute error.
    pub fn missing_attribute(detail: MissingAttributeDetail) -> Self {
        Error::MissingAttribute(detail)
    }

    /// Create an illegal state error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Error::IllegalState {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error with key context.
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Error::Cache {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Cache { .. } | Error::MissingAttribute(_))
    }

    /// The status an evaluation reports when this error stops it.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingAttribute(_) => StatusCode::MissingAttribute,
            Error::Validation { .. }
            | Error::Parse { .. }
            | Error::Expression { .. }
            | Error::IllegalState { .. } => StatusCode::SyntaxError,
            _ => StatusCode::ProcessingError,
        }
    }

    /// Get the error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation",
            Error::Parse { .. } => "parse",
            Error::Evaluation { .. } => "evaluation",
            Error::Expression { .. } => "expression",
            Error::MissingAttribute(_) => "missing_attribute",
            Error::IllegalState { .. } => "illegal_state",
            Error::Config { .. } => "config",
            Error::Cache { .. } => "cache",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Yaml(_) => "yaml",
            Error::Internal { .. } => "internal",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::config(err.to_string())
    }
}
