use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- ProducerError ---------------------------------------------------------

/// Failure reported by a single broker connection.
///
/// The pool hands these back to the caller untouched; it never wraps, retries
/// or swaps them for an error from another connection.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("not connected")]
    NotConnected,

    #[error("producer stopped")]
    Stopped,

    #[error("producer closing")]
    Closing,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

// -----------------------------------------------------------------------------
// ----- PoolError -------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("connection count must be at least 1, got {count}")]
    InvalidConnectionCount { count: usize },

    #[error("no tokio runtime available to run the pool scheduler")]
    NoRuntime,

    #[error("failed to create connection {index} to {addr}: {source}")]
    Connect {
        index: usize,
        addr: String,
        source: ProducerError,
    },
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
