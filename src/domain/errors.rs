//! Domain error types
//!
//! This module defines the error hierarchy for Bazaar. Errors are domain-specific and
//! don't expose third-party types (HTTP client, database driver).

use std::fmt;
use thiserror::Error;

/// Main Bazaar error type
///
/// This is the primary error type used throughout the application. Variants follow the
/// ingestion pipeline: transport, fetch, report, reconciliation and persistence failures,
/// plus the usual configuration/validation/serialization errors.
#[derive(Debug, Error)]
pub enum BazaarError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network/HTTP failure after the retry policy was exhausted
    #[error("Transport error after {attempts} attempt(s): {source}")]
    Transport {
        /// Number of attempts made before giving up
        attempts: u32,
        /// Last underlying error
        #[source]
        source: TransportError,
    },

    /// A fetch job aborted before all pages/IDs were collected
    #[error("Partial fetch: collected {collected} of {expected} before failure: {source}")]
    PartialFetch {
        /// Records collected before the failure
        collected: usize,
        /// Records (or IDs) the job expected
        expected: usize,
        /// Error that aborted the job
        #[source]
        source: Box<BazaarError>,
    },

    /// Report state machine failure
    #[error("Report error at {stage} stage: {message}")]
    Report {
        /// Stage that failed
        stage: ReportStage,
        /// Failure description
        message: String,
    },

    /// Correlation key to durable identifier mapping is incomplete or ambiguous
    #[error("Reconciliation error: {0}")]
    Reconciliation(String),

    /// Relational sink write failure
    #[error("Persistence error on table '{table}': {message}")]
    Persistence {
        /// Table being written
        table: String,
        /// Failure description
        message: String,
    },

    /// Database connection/pool errors
    #[error("Database error: {0}")]
    Database(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation interrupted by a shutdown signal
    #[error("Operation cancelled after collecting {collected} record(s)")]
    Cancelled {
        /// Records collected before cancellation
        collected: usize,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl BazaarError {
    /// Shorthand for a report failure at `stage`
    pub fn report(stage: ReportStage, message: impl Into<String>) -> Self {
        BazaarError::Report {
            stage,
            message: message.into(),
        }
    }

    /// Shorthand for a persistence failure on `table`
    pub fn persistence(table: impl Into<String>, message: impl Into<String>) -> Self {
        BazaarError::Persistence {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from a shutdown signal rather than a failure
    pub fn is_cancelled(&self) -> bool {
        match self {
            BazaarError::Cancelled { .. } => true,
            BazaarError::PartialFetch { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Transport-level errors
///
/// Errors that occur when talking to the upstream marketplace or report endpoints.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to connect to the remote host
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Non-2xx response
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be read or parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request could not be built (bad URL, bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 2xx response whose envelope reports an application error
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },
}

impl TransportError {
    /// Whether another attempt could succeed
    ///
    /// Network failures, timeouts, non-2xx statuses and unreadable bodies are retried;
    /// malformed requests and application-level errors are not.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            TransportError::InvalidRequest(_) | TransportError::Api { .. }
        )
    }

    /// Map a reqwest error without leaking the type
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::ConnectionFailed(err.to_string())
        } else if err.is_decode() || err.is_body() {
            TransportError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::ConnectionFailed(err.to_string())
        }
    }
}

/// Stage of the report lifecycle at which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    /// create-report call
    Create,
    /// status poll
    Poll,
    /// document lookup or byte download
    Download,
    /// decompression or content decoding
    Decode,
}

impl fmt::Display for ReportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportStage::Create => "create",
            ReportStage::Poll => "poll",
            ReportStage::Download => "download",
            ReportStage::Decode => "decode",
        };
        f.write_str(name)
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for BazaarError {
    fn from(err: std::io::Error) -> Self {
        BazaarError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for BazaarError {
    fn from(err: serde_json::Error) -> Self {
        BazaarError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for BazaarError {
    fn from(err: toml::de::Error) -> Self {
        BazaarError::Configuration(format!("TOML parse error: {err}"))
    }
}
