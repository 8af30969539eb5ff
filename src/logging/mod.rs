//! Logging and observability
//!
//! Structured logging built on `tracing`:
//! - Console output for interactive runs
//! - JSON-formatted file logs with rotation
//! - Configurable log levels (`RUST_LOG` overrides the configured level)
//! - One span per ingest run carrying the operation and a run identifier
//!
//! # Example
//!
//! ```no_run
//! use bazaar::logging::init_logging;
//! use bazaar::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{ingest_span, init_logging, LoggingGuard};

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use bazaar::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, 4000u64, "HTTP 503");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $delay_ms:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_ms = $delay_ms,
            reason = %$reason,
            "Retrying request after error"
        );
    };
}

/// Log progress of a fetch job
///
/// # Example
///
/// ```no_run
/// use bazaar::log_fetch_progress;
///
/// log_fetch_progress!("page", 150usize, 1000usize);
/// ```
#[macro_export]
macro_rules! log_fetch_progress {
    ($mode:expr, $collected:expr, $expected:expr) => {
        tracing::debug!(
            mode = $mode,
            collected = $collected,
            expected = $expected,
            progress_pct = ($collected as f64 / ($expected as f64).max(1.0) * 100.0),
            "Fetch progress"
        );
    };
}

/// Log a report state transition
///
/// # Example
///
/// ```no_run
/// use bazaar::log_report_transition;
///
/// log_report_transition!("GET_SALES_AND_TRAFFIC_REPORT", "Polling", "Ready");
/// ```
#[macro_export]
macro_rules! log_report_transition {
    ($report_type:expr, $from:expr, $to:expr) => {
        tracing::info!(
            report_type = %$report_type,
            from = %$from,
            to = %$to,
            "Report state transition"
        );
    };
}
