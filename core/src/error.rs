//! Error taxonomy for the ticket history subsystem.

use crate::ids::{EmployeeId, TicketId};
use crate::status::StatusCode;
use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for helpdesk operations.
pub type Result<T> = std::result::Result<T, HelpdeskError>;

/// Machine-checkable code reported for successful operations.
pub const SUCCESS_CODE: &str = "op_exitosa";

/// Errors raised by the allocator, the history log, the guard and the registration
/// service.
///
/// Allocation and guard failures are decided where they are detected and surfaced as
/// values; nothing falls back to a guessed identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HelpdeskError {
    /// A required field is missing or malformed.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The referenced ticket does not exist.
    #[error("Ticket not found: {0}")]
    TicketNotFound(TicketId),

    /// The referenced employee does not exist.
    #[error("Employee not found: {0}")]
    EmployeeNotFound(EmployeeId),

    /// The requested status is not reachable from the current one.
    #[error("Transition denied: {current} -> {requested}")]
    TransitionDenied {
        /// Status of the latest record
        current: StatusCode,
        /// Status the caller asked for
        requested: StatusCode,
    },

    /// The store is unreachable or a write failed mid-transaction.
    ///
    /// The unit of work has been rolled back in full.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Two writers raced for the same identifier.
    #[error("Concurrency conflict on {key}: {detail}")]
    ConcurrencyConflict {
        /// Allocation key (`ticket:<id>` or `folio:<day>`)
        key: String,
        /// What collided
        detail: String,
    },

    /// Every 4-digit folio of the day has been issued.
    #[error("No folios left for {day}")]
    FolioSpaceExhausted {
        /// Day whose counter overflowed
        day: NaiveDate,
    },
}

impl HelpdeskError {
    /// Shorthand for a [`HelpdeskError::Validation`].
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Machine-checkable code carried in the `message` of a failed result.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::TicketNotFound(_) | Self::EmployeeNotFound(_) => "not_found",
            Self::TransitionDenied { .. } => "transition_denied",
            Self::Persistence(_) => "persistence_error",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::FolioSpaceExhausted { .. } => "folio_exhausted",
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Store internals never appear here; they go to the logs instead.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { field, message } => format!("Please check {field}: {message}."),
            Self::TicketNotFound(_) => "The ticket does not exist.".to_string(),
            Self::EmployeeNotFound(_) => "The employee does not exist.".to_string(),
            Self::TransitionDenied { current, requested } => {
                format!("A ticket in status {current} cannot be moved to {requested}.")
            }
            Self::Persistence(_) | Self::ConcurrencyConflict { .. } => {
                "The changes could not be saved, please try again.".to_string()
            }
            Self::FolioSpaceExhausted { .. } => {
                "No more tickets can be registered today.".to_string()
            }
        }
    }

    /// Whether repeating the whole operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::ConcurrencyConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_denied_names_both_statuses() {
        let error = HelpdeskError::TransitionDenied {
            current: StatusCode::new("TMN"),
            requested: StatusCode::new("ABT"),
        };
        let display = format!("{error}");
        assert!(display.contains("TMN"));
        assert!(display.contains("ABT"));
        assert_eq!(error.code(), "transition_denied");
        assert!(!error.is_retryable());
    }

    #[test]
    fn persistence_detail_stays_out_of_user_message() {
        let error = HelpdeskError::Persistence("connection refused (os error 111)".to_string());
        assert!(error.is_retryable());
        assert!(!error.user_message().contains("os error"));
        assert!(format!("{error}").contains("os error"));
    }

    #[test]
    fn not_found_variants_share_code() {
        assert_eq!(HelpdeskError::TicketNotFound(TicketId::new(9)).code(), "not_found");
        assert_eq!(
            HelpdeskError::EmployeeNotFound(EmployeeId::new("E1")).code(),
            "not_found"
        );
    }
}
