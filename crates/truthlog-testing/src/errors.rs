//! Harness error types.

use std::path::PathBuf;

use thiserror::Error;
use truthlog_core::{EncodeError, SettingsError};

/// Errors raised while configuring a test logger or parsing log lines.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// More than one truth transcript was registered.
    #[error("multiple truth sources provided")]
    MultipleTruthSources,

    /// The truth file exists but could not be read.
    #[error("failed to read truth file {}: {source}", .path.display())]
    ReadTruth {
        /// Truth file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The actual-output file could not be created or written.
    #[error("failed to write actual output file {}: {source}", .path.display())]
    ActualOutput {
        /// Actual-output file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A line body could not be encoded or parsed.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Harness settings could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The current thread's name does not identify a test.
    #[error("cannot derive a test name from thread {0:?}; pass the name explicitly")]
    NoTestName(String),

    /// A log line did not match `LEVEL SP+ JSON`.
    #[error("malformed log line: {0:?}")]
    MalformedLine(String),
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
