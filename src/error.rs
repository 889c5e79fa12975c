//! Error types for coincidence counting

use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for counting operations
pub type Result<T> = std::result::Result<T, CountError>;

/// Errors that can occur while counting coincidences
#[derive(Error, Debug)]
pub enum CountError {
    /// The event stream could not be opened
    #[error("Failed to open event stream '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No COUNTED output is attached to the session
    #[error("No output file to close")]
    NoOutputOpen,

    /// The sparse pattern index could not be allocated
    #[error("Out of memory while collecting {patterns} nonzero patterns")]
    Allocation {
        patterns: usize,
        #[source]
        source: TryReserveError,
    },

    /// Malformed record or COUNTED data
    #[error("Parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// Output write or flush failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Building or storing a DataFrame failed
    #[error("DataFrame error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    /// Session configuration could not be decoded
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A configuration value is out of range
    #[error("Invalid {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

impl CountError {
    /// Whether the session can keep going after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CountError::Open { .. } | CountError::NoOutputOpen)
    }
}
