/*!
Common error types for the trace decoding components.
*/

use thiserror::Error;

/// Common result type used throughout the shared library
pub type Result<T> = std::result::Result<T, SharedError>;

/// Comprehensive error type for all shared operations
#[derive(Error, Debug)]
pub enum SharedError {
    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PNG encoding errors
    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),

    /// The waveform file could not be read
    #[error("Trace error: {0}")]
    Trace(String),

    /// A required signal is absent from the trace
    #[error("Could not find signal '{name}' ({} signals available)", .available.len())]
    MissingSignal {
        name: String,
        available: Vec<String>,
    },

    /// A bare signal name matches several recorded signals
    #[error("Signal '{name}' is ambiguous, it matches {}", .matches.join(", "))]
    AmbiguousSignal {
        name: String,
        matches: Vec<String>,
    },
}

impl SharedError {
    /// Create a new trace loading error
    pub fn trace(msg: impl Into<String>) -> Self {
        Self::Trace(msg.into())
    }

    /// Create a new missing signal error
    pub fn missing_signal(name: impl Into<String>, available: Vec<String>) -> Self {
        Self::MissingSignal {
            name: name.into(),
            available,
        }
    }
}
