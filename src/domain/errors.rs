//! Domain error types
//!
//! This module defines the error hierarchy for skiplot. Adapter errors are converted
//! at the adapter boundary so no third-party error type leaks into the engine, but the
//! original driver error is kept as a `#[source]` so the full cause chain survives up
//! to the audit log.

use crate::domain::ids::SampleId;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed driver error kept as the source of a [`StoreError::Backend`]
pub type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Main skiplot error type
///
/// This is the primary error type used throughout the engine and its adapters.
#[derive(Debug, Error)]
pub enum SkipLotError {
    /// A required option is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Persistent store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// LIMS business API errors
    #[error("LIMS API error: {0}")]
    Lims(#[from] LimsApiError),

    /// The triggering sample does not exist in the store
    #[error("Sample {0} not found")]
    SampleNotFound(SampleId),

    /// Message persistence or dispatch failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Wraps an error with the label of the engine action that was running
    #[error("Action '{action}' failed")]
    Action {
        action: String,
        #[source]
        source: Box<SkipLotError>,
    },
}

impl SkipLotError {
    /// Attach the label of the action in progress to this error
    pub fn in_action(self, action: impl Into<String>) -> Self {
        match self {
            // Keep the innermost label, it names the call that actually failed
            err @ SkipLotError::Action { .. } => err,
            err => SkipLotError::Action {
                action: action.into(),
                source: Box::new(err),
            },
        }
    }

    /// Returns the action label if this error was raised inside a labelled action
    pub fn action(&self) -> Option<&str> {
        match self {
            SkipLotError::Action { action, .. } => Some(action.as_str()),
            _ => None,
        }
    }

    /// Whether this is a configuration error, looking through action wrappers
    pub fn is_configuration(&self) -> bool {
        match self {
            SkipLotError::Configuration(_) => true,
            SkipLotError::Action { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

/// Store-specific errors
///
/// Raised by the persistence adapters (PostgreSQL, in-memory).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to obtain a connection
    #[error("Failed to connect to store: {0}")]
    ConnectionFailed(String),

    /// A query or statement failed in the driver
    #[error("{context}")]
    Backend {
        context: String,
        #[source]
        source: BoxedSource,
    },

    /// A referenced record does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A row could not be mapped to a domain type
    #[error("Invalid row data: {0}")]
    InvalidData(String),

    /// The batch lock could not be acquired or released
    #[error("Batch lock error: {0}")]
    Lock(String),
}

impl StoreError {
    /// Wrap a driver error with a description of what was being done
    pub fn backend(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        StoreError::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// LIMS business API errors
///
/// Errors that occur when calling the host's HTTP API. These errors don't expose
/// the HTTP client types.
#[derive(Debug, Error)]
pub enum LimsApiError {
    /// Failed to reach the API
    #[error("Failed to connect to LIMS API: {0}")]
    ConnectionFailed(String),

    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Invalid response from LIMS API: {0}")]
    InvalidResponse(String),

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl LimsApiError {
    /// Whether the request may succeed if retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LimsApiError::ConnectionFailed(_)
                | LimsApiError::ServerError { .. }
                | LimsApiError::Timeout(_)
        )
    }
}

/// Collects the message of an error and of every error in its source chain,
/// outermost first.
pub fn cause_chain(err: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}

/// Renders the cause chain as a single line
pub fn render_chain(err: &(dyn StdError + 'static)) -> String {
    cause_chain(err).join(" ")
}

// Conversion from std::io::Error
impl From<std::io::Error> for SkipLotError {
    fn from(err: std::io::Error) -> Self {
        SkipLotError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SkipLotError {
    fn from(err: serde_json::Error) -> Self {
        SkipLotError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SkipLotError {
    fn from(err: toml::de::Error) -> Self {
        SkipLotError::Configuration(format!("TOML parse error: {err}"))
    }
}
