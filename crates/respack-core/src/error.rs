//! Error types for the respack core library
//!
//! Every error raised by the engine is a programmer or configuration error.
//! None of them are retried or defaulted internally; they surface to the
//! caller of `response`/`quote` as soon as they are detected.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for respack operations
#[derive(Error, Debug)]
pub enum Error {
    /// A declared key has no matching entry in the input resource set
    #[error("Resource not found: no input resource for declared key \"{key}\"")]
    ResourceNotFound { key: String },

    /// More than one declared entry targets the root of the output tree
    #[error("Output declaration can only have 1 root key, {count} are defined")]
    MultipleRootKeys { count: usize },

    /// More than one input resource is paginated
    #[error("Resources can only have 1 paginator, {count} are defined")]
    MultiplePaginators { count: usize },

    /// The same lookup key was declared twice
    #[error("Output declaration defines key \"{key}\" more than once")]
    DuplicateKey { key: String },

    /// A fallible handler returned an error
    #[error("Handler for \"{key}\" failed: {source}")]
    Handler {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing errors
    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// TOML parsing errors
    #[error("TOML error: {message}")]
    Toml {
        message: String,
        #[source]
        source: toml::de::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The output declaration or engine configuration is ambiguous or invalid
    Configuration,
    /// The input resource set has an unsupported shape
    InputShape,
    /// A declared key could not be resolved against the inputs
    Lookup,
    /// A user handler failed
    Handler,
    /// Reading or decoding external data failed
    Io,
}

impl Error {
    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MultipleRootKeys { .. }
            | Error::DuplicateKey { .. }
            | Error::Configuration { .. } => ErrorCategory::Configuration,
            Error::MultiplePaginators { .. } => ErrorCategory::InputShape,
            Error::ResourceNotFound { .. } => ErrorCategory::Lookup,
            Error::Handler { .. } => ErrorCategory::Handler,
            Error::Json { .. } | Error::Yaml { .. } | Error::Toml { .. } | Error::Io { .. } => {
                ErrorCategory::Io
            }
        }
    }

    /// Shorthand for a configuration error without a source
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::InputShape => write!(f, "input-shape"),
            ErrorCategory::Lookup => write!(f, "lookup"),
            ErrorCategory::Handler => write!(f, "handler"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}
