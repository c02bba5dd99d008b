//! Error types for TraceMatrix.

use thiserror::Error;

/// Result type for library operations.
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors raised by the tracking, sink and aggregation layers.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted call record could not be decoded
    #[error("Malformed call record {line:?}: {reason}")]
    MalformedRecord {
        /// The offending line
        line: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration could not be read or parsed
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Pending writes did not drain within the grace period
    #[error("Event sink did not finish within {ms}ms ({pending} lines pending)")]
    Timeout {
        /// Grace period in milliseconds
        ms: u64,
        /// Lines still queued when the writer was cancelled
        pending: usize,
    },

    /// The sink has already been shut down
    #[error("Event sink is closed")]
    SinkClosed,
}
