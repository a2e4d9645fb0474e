//! Error handling for CDN classification.
//!
//! This module defines the error type shared by the whole library, from
//! malformed CIDR literals at startup to failures inside individual workers.

use std::fmt;
use std::time::Duration;

/// Main error type for classification operations.
///
/// Resolution failures (a name that simply does not resolve) are not errors:
/// they are counted as unresolved by the classifier and never show up here.
#[derive(Debug, Clone)]
pub enum CdnCheckError {
    /// Malformed dotted-quad IPv4 address
    InvalidAddress { input: String, reason: String },

    /// Malformed CIDR literal (`a.b.c.d/n`)
    InvalidCidr { input: String, reason: String },

    /// Network-related errors while fetching the CIDR list
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// Unexpected failure while looking up a single domain
    Lookup { domain: String, message: String },

    /// Configuration errors (invalid settings, unreadable TOML, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading domain or range lists
    FileError { path: String, message: String },

    /// Timeout errors when operations take too long
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl CdnCheckError {
    /// Create a new invalid address error.
    pub fn invalid_address<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        Self::InvalidAddress {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid CIDR error.
    pub fn invalid_cidr<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        Self::InvalidCidr {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new per-domain lookup error.
    pub fn lookup<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::Lookup {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error comes from fetching remote data.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkError { .. } | Self::Timeout { .. })
    }

    /// Process exit code the CLI uses when this error aborts a run.
    ///
    /// - `2`: the CIDR list could not be fetched
    /// - `1`: everything else (bad input, config, files)
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NetworkError { .. } | Self::Timeout { .. } => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CdnCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress { input, reason } => {
                write!(f, "Invalid IPv4 address '{}': {}", input, reason)
            }
            Self::InvalidCidr { input, reason } => {
                write!(f, "Invalid CIDR '{}': {}", input, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::Lookup { domain, message } => {
                write!(f, "Lookup of '{}' failed unexpectedly: {}", domain, message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for CdnCheckError {}

impl From<reqwest::Error> for CdnCheckError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(10))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<std::io::Error> for CdnCheckError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<toml::de::Error> for CdnCheckError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}
