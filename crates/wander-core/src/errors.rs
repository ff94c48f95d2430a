//! Shared error types for the engagement collaborators

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport outcome of a failed engagement API call
///
/// Carries what the conflict classifier needs: the HTTP status when one
/// was received and any human-readable message the server body supplied.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ApiError {
    /// Server answered with a non-success status
    #[error("HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Human-readable server message, when the body carried one
        message: Option<String>,
    },
    /// Connection could not be established or broke mid-request
    #[error("connection failed: {reason}")]
    Connection {
        /// Transport-level failure description
        reason: String,
    },
    /// No response within the client deadline
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Deadline that elapsed
        timeout_ms: u64,
    },
}

impl ApiError {
    /// Non-success status error with a server message
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            message: Some(message.into()),
        }
    }

    /// Non-success status error without a body message
    pub fn bare_status(status: u16) -> Self {
        ApiError::Status {
            status,
            message: None,
        }
    }

    /// HTTP status code, when the failure carries one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided message, when present
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Failure raised by the realtime bus
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BusError {
    /// Subscription handshake failed
    #[error("subscribe failed for {channel}: {reason}")]
    Subscribe {
        /// Channel the handshake was for
        channel: String,
        /// Transport failure description
        reason: String,
    },
    /// The connection is gone and this handle will not redeliver
    #[error("realtime channel closed")]
    Closed,
}
