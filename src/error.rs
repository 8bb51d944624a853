//! Error types for sf-export
//!
//! This module defines the error taxonomy for the whole pipeline.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Only `Config` errors abort a run before dispatch; every other variant
//! is terminal for a single object-type export only.

use thiserror::Error;

/// The main error type for sf-export
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Invalid configuration value
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with it
        message: String,
    },

    /// A required config field is absent or empty
    #[error("Missing required config field: {field}")]
    MissingConfigField {
        /// Name of the missing field
        field: String,
    },

    /// JSON (de)serialization failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A URL failed to parse
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Remote Query Errors
    // ============================================================================
    /// The OAuth token grant was rejected
    #[error("Authentication failed: {message}")]
    Auth {
        /// The server's explanation
        message: String,
    },

    /// A query failed for one object type
    #[error("Query failed for '{object_type}': {message}")]
    RemoteQuery {
        /// Object type whose query failed
        object_type: String,
        /// The underlying failure
        message: String,
    },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Status code returned
        status: u16,
        /// Response body, if any
        body: String,
    },

    /// A request exceeded its deadline
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Deadline in milliseconds
        timeout_ms: u64,
    },

    /// The transport retry budget ran out
    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded {
        /// Retries attempted after the first try
        max_retries: u32,
    },

    // ============================================================================
    // Encoding Errors
    // ============================================================================
    /// A batch could not be encoded to Parquet
    #[error("Encoding failed: {message}")]
    Encoding {
        /// What prevented the encoding
        message: String,
    },

    /// Arrow array or schema construction failed
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet serialization failed
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    // ============================================================================
    // Upload Errors
    // ============================================================================
    /// An artifact could not be stored
    #[error("Upload failed: {message}")]
    Upload {
        /// Key and underlying failure
        message: String,
    },

    /// The object store backend failed
    #[error("Object store error: {0}")]
    Store(#[from] object_store::Error),

    // ============================================================================
    // Orchestration Errors
    // ============================================================================
    /// The run was cancelled before this work started
    #[error("Export cancelled")]
    Cancelled,

    // ============================================================================
    // I/O and Generic Errors
    // ============================================================================
    /// Filesystem I/O failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything without a more precise variant
    #[error("{0}")]
    Other(String),

    /// Wrapped error from embedding code
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a remote query error
    pub fn remote_query(object_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteQuery {
            object_type: object_type.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create an upload error
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            message: message.into(),
        }
    }

    /// Check if this error is a transient failure worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            Error::Store(e) => is_retryable_store(e),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Check if an object store error is transient
///
/// `Generic` covers network and throttling failures in the store backends;
/// everything else (not found, invalid path, permissions) fails immediately.
pub(crate) fn is_retryable_store(error: &object_store::Error) -> bool {
    matches!(error, object_store::Error::Generic { .. })
}

/// Result type alias for sf-export
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }
}
