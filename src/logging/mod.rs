//! Logging and observability
//!
//! Operational logs go through `tracing` (console plus an optional rolling JSON
//! file). The business-visible record of each invocation is the audit entry written
//! through [`AuditSink`](crate::adapters::store::AuditSink), not these logs.
//!
//! # Example
//!
//! ```no_run
//! use skiplot::logging::init_logging;
//! use skiplot::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(sample_id = 1201, "Processing sample");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of an engine invocation
///
/// # Example
///
/// ```no_run
/// use skiplot::log_invocation_start;
///
/// log_invocation_start!(1201);
/// ```
#[macro_export]
macro_rules! log_invocation_start {
    ($sample_id:expr) => {
        tracing::info!(sample_id = %$sample_id, "Starting skip-lot invocation");
    };
}

/// Log the end of an engine invocation with its outcome
///
/// # Example
///
/// ```no_run
/// use skiplot::log_invocation_complete;
/// use std::time::Duration;
///
/// log_invocation_complete!("attached", Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_invocation_complete {
    ($outcome:expr, $duration:expr) => {
        tracing::info!(
            outcome = %$outcome,
            duration_ms = $duration.as_millis() as u64,
            "Skip-lot invocation completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use skiplot::log_error_with_context;
/// use skiplot::domain::SkipLotError;
///
/// let error = SkipLotError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use skiplot::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
