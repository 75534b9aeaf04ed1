//! Acquisition error types.
//!
//! These errors are designed to be serializable and not depend on external
//! error types like `std::io::Error`. For I/O errors, we capture the kind
//! and message as strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for acquisition operations.
///
/// Serializable across process/API boundaries without depending on
/// non-serializable types like `std::io::Error`.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum AcquireError {
    /// I/O error during file operations.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "NotFound", "PermissionDenied").
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// The supplied content key failed validation.
    #[error("Invalid content key: {value:?}")]
    InvalidKey {
        /// The rejected input.
        value: String,
    },

    /// The source resolver could not produce a locator for the key.
    #[error("Source resolution failed: {message}")]
    Resolution {
        /// The resolver's failure reason.
        message: String,
    },

    /// The downloader executable could not be launched.
    #[error("Failed to launch downloader: {message}")]
    Spawn {
        /// Detailed error message.
        message: String,
    },

    /// The downloader process terminated unsuccessfully.
    #[error("Downloader failed: {message}")]
    Process {
        /// Exit code, if the process exited rather than being killed.
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        /// Captured failure detail (stderr tail or wait error).
        message: String,
    },

    /// The downloader exited successfully but wrote no output files.
    #[error("Downloader produced no output files")]
    NoOutput,

    /// The artifact downloaded but could not be persisted.
    #[error("Commit to record store failed: {message}")]
    Commit {
        /// The record store's failure reason.
        message: String,
    },

    /// The acquisition was cancelled by a caller.
    #[error("Acquisition cancelled")]
    Cancelled,

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl AcquireError {
    /// Create an I/O error from kind and message strings.
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    ///
    /// This captures the error kind name and message for serialization.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Create an invalid key error.
    pub fn invalid_key(value: impl Into<String>) -> Self {
        Self::InvalidKey {
            value: value.into(),
        }
    }

    /// Create a resolution failure.
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
        }
    }

    /// Create a spawn failure.
    pub fn spawn(message: impl Into<String>) -> Self {
        Self::Spawn {
            message: message.into(),
        }
    }

    /// Create a process failure.
    pub fn process(exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self::Process {
            exit_code,
            message: message.into(),
        }
    }

    /// Create a commit failure.
    pub fn commit(message: impl Into<String>) -> Self {
        Self::Commit {
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Io { message, .. } => format!("File operation failed: {message}"),
            Self::InvalidKey { value } => {
                format!("'{value}' is not a valid content key. Keys are alphanumeric hashes.")
            }
            Self::Resolution { message } => format!("Could not locate a source: {message}"),
            Self::Spawn { message } => format!("Could not start the downloader: {message}"),
            Self::Process {
                exit_code: Some(code),
                message,
            } => format!("Download failed (exit code {code}): {message}"),
            Self::Process { message, .. } => format!("Download failed: {message}"),
            Self::NoOutput => "The download finished but produced no files.".to_string(),
            Self::Commit { message } => {
                format!("The file downloaded but could not be saved to the library: {message}")
            }
            Self::Cancelled => "Download was cancelled.".to_string(),
            Self::Other { message } => message.clone(),
        }
    }
}

/// Convenience result type for acquisition operations.
pub type AcquireResult<T> = Result<T, AcquireError>;
