//! Error types for the push gateway
//!
//! Variants are grouped by the layer that raises them so callers can tell a
//! rejected request from a provider failure from a storage problem.

use std::path::PathBuf;
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Invalid configuration value for '{key}': {value}")]
    InvalidConfigValue { key: String, value: String },

    // Request validation errors
    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Unknown platform: {name}")]
    UnknownPlatform { name: String },

    #[error("No provider registered for platform '{name}'")]
    ProviderNotRegistered { name: String },

    #[error("Unknown metric: {name}")]
    UnknownMetric { name: String },

    // Provider errors
    #[error("Provider returned status {code}: {message}")]
    ProviderStatus { code: i32, message: String },

    #[error("Provider error: {message}")]
    Provider {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Aggregated failure of a dispatch; the message is already de-duplicated
    #[error("{message}")]
    Dispatch {
        message: String,
        failed: usize,
        total: usize,
    },

    // Counter storage errors
    #[error("Storage error at '{path}': {operation}")]
    Storage {
        path: PathBuf,
        operation: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Counter store is closed")]
    StoreClosed,

    // I/O errors
    #[error("File I/O error for '{path}': {operation}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Serialization errors
    #[error("TOML parsing error: {context}")]
    TomlParsing {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Network and HTTP errors
    #[error("HTTP request failed: {method} {url}")]
    HttpRequest {
        method: String,
        url: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Network timeout after {timeout_secs} seconds")]
    NetworkTimeout { timeout_secs: u64 },

    #[error("Parse error for '{input}': {expected}")]
    Parse {
        input: String,
        expected: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new Config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_config_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a request validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn provider_status(code: i32, message: impl Into<String>) -> Self {
        Self::ProviderStatus {
            code,
            message: message.into(),
        }
    }

    /// Create a new Provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new Provider error with source
    pub fn provider_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Provider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new Storage error
    pub fn storage(path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            operation: operation.into(),
            source: None,
        }
    }

    /// Create a new Storage error with source
    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            path: path.into(),
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new I/O error with source
    pub fn io_with_source(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the request was rejected before any provider was contacted
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::UnknownPlatform { .. } | Self::ProviderNotRegistered { .. }
        )
    }

    /// Get the error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } | Self::InvalidConfigValue { .. } => "config",
            Self::Validation { .. }
            | Self::UnknownPlatform { .. }
            | Self::ProviderNotRegistered { .. }
            | Self::UnknownMetric { .. } => "validation",
            Self::ProviderStatus { .. } | Self::Provider { .. } => "provider",
            Self::Dispatch { .. } => "dispatch",
            Self::Storage { .. } | Self::StoreClosed => "storage",
            Self::Io { .. } => "io",
            Self::TomlParsing { .. } => "serialization",
            Self::HttpRequest { .. } | Self::NetworkTimeout { .. } => "network",
            Self::Parse { .. } => "parse",
            Self::Internal { .. } => "internal",
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlParsing {
            context: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Transport failures; callers that know the request timeout map timeouts themselves
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Self::HttpRequest {
            method: "POST".to_string(),
            url,
            source: Some(Box::new(err)),
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        Self::Parse {
            input: "URL".to_string(),
            expected: "valid URL format".to_string(),
            source: Some(Box::new(err)),
        }
    }
}
