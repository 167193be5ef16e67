//! Sync error types.
//!
//! These errors are serializable and do not wrap foreign error types like
//! `std::io::Error` or `reqwest::Error`; the kind and message are captured
//! as strings instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised while synchronizing a single presentation.
///
/// The batch loader never inspects the variant; it hands the error to the
/// retry policy and, if the item is abandoned, to the observer.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncError {
    /// I/O error while writing or unpacking content.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "`NotFound`", "`PermissionDenied`").
        kind: String,
        message: String,
    },

    /// Network/HTTP error while fetching the package.
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// HTTP status code if available.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// Package not found on the remote service (HTTP 404 or 410).
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The presentation has no content package to fetch.
    #[error("Presentation {id} has no content package")]
    NoContentPackage { id: i64 },

    /// The downloaded archive could not be unpacked.
    #[error("Unpack failed: {message}")]
    Unpack { message: String },

    /// Transfer was cancelled.
    #[error("Sync cancelled")]
    Cancelled,

    #[error("{message}")]
    Other { message: String },
}

impl SyncError {
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Capture a `std::io::Error` as kind and message strings.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        Self::io(format!("{:?}", err.kind()), err.to_string())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn no_content_package(id: i64) -> Self {
        Self::NoContentPackage { id }
    }

    pub fn unpack(message: impl Into<String>) -> Self {
        Self::Unpack {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Io { .. })
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short message suitable for a progress screen.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Io { message, .. } => format!("Could not save presentation content: {message}"),
            Self::Network {
                message,
                status_code: Some(code),
            } => format!("Network error (HTTP {code}): {message}"),
            Self::Network { message, .. } => format!("Network error: {message}"),
            Self::NotFound { message } => format!("Presentation package not found: {message}"),
            Self::NoContentPackage { .. } => {
                "This presentation has no content to download.".to_string()
            }
            Self::Unpack { .. } => {
                "The downloaded package is damaged. Try updating again.".to_string()
            }
            Self::Cancelled => "Update was cancelled.".to_string(),
            Self::Other { message } => message.clone(),
        }
    }
}

/// Convenience result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
