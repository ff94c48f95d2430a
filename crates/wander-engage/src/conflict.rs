//! API failure classification
//!
//! Splits toggle failures into two camps: pending follow requests, which
//! park the button in its requested state, and hard failures, which roll
//! the optimistic flip back. Private-account backends are inconsistent
//! about how they report an already-pending request, so both the status
//! code and known message markers are checked.

use wander_core::ApiError;

/// Fallback toast for failures whose server message is missing.
const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Message fragments some backends use instead of a conflict status.
const PENDING_MARKERS: [&str; 2] = ["request already pending", "already sent"];

// =============================================================================
// Classification
// =============================================================================

/// How a failed toggle should settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictClass {
    /// The follow request is parked server-side awaiting approval.
    Pending {
        /// User-facing explanation
        message: String,
    },
    /// The toggle failed outright and must be rolled back.
    Hard {
        /// User-facing explanation
        message: String,
    },
}

/// Classify a toggle failure.
///
/// A 409 status always means the follow request is pending. Backends
/// that answer with a different status but a recognizable message are
/// folded into the same class.
pub fn classify(error: &ApiError) -> ConflictClass {
    let pending = error.status_code() == Some(409)
        || error.server_message().is_some_and(|message| {
            let lowered = message.to_lowercase();
            PENDING_MARKERS.iter().any(|marker| lowered.contains(marker))
        });

    if pending {
        let message = error
            .server_message()
            .unwrap_or("Follow request already pending")
            .to_string();
        tracing::debug!(error = %error, "toggle conflict: follow request pending");
        return ConflictClass::Pending { message };
    }

    let message = error.server_message().unwrap_or(GENERIC_FAILURE).to_string();
    tracing::warn!(error = %error, "toggle failed");
    ConflictClass::Hard { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_status_is_pending() {
        let class = classify(&ApiError::bare_status(409));
        assert_eq!(
            class,
            ConflictClass::Pending {
                message: "Follow request already pending".to_string()
            }
        );
    }

    #[test]
    fn conflict_status_keeps_the_server_message() {
        let class = classify(&ApiError::status(409, "Request already sent to @sol"));
        assert_eq!(
            class,
            ConflictClass::Pending {
                message: "Request already sent to @sol".to_string()
            }
        );
    }

    #[test]
    fn pending_marker_overrides_a_plain_error_status() {
        let class = classify(&ApiError::status(400, "Follow REQUEST ALREADY PENDING"));
        assert!(matches!(class, ConflictClass::Pending { .. }));
    }

    #[test]
    fn other_statuses_are_hard_failures() {
        let class = classify(&ApiError::status(500, "database unavailable"));
        assert_eq!(
            class,
            ConflictClass::Hard {
                message: "database unavailable".to_string()
            }
        );
    }

    #[test]
    fn transport_errors_fall_back_to_the_generic_message() {
        let class = classify(&ApiError::Timeout { timeout_ms: 8_000 });
        assert_eq!(
            class,
            ConflictClass::Hard {
                message: GENERIC_FAILURE.to_string()
            }
        );
    }
}
