//! Caller-facing result shape.

use helpdesk_core::error::{HelpdeskError, Result, SUCCESS_CODE};
use serde::Serialize;

/// Outcome of an operation as reported to callers.
///
/// `message` is a machine code (`op_exitosa` on success, [`HelpdeskError::code`] on
/// failure). `error` is safe to show to end users; store internals only reach the logs.
///
/// # Example
///
/// ```
/// use helpdesk_core::error::HelpdeskError;
/// use helpdesk_service::response::OperationResult;
///
/// let failed: OperationResult<()> = HelpdeskError::Persistence("timeout".to_string()).into();
/// assert!(!failed.success);
/// assert_eq!(failed.message, "persistence_error");
/// assert!(!failed.error.unwrap().contains("timeout"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OperationResult<T> {
    /// Whether the operation took effect
    pub success: bool,
    /// Machine-checkable outcome code
    pub message: String,
    /// Human-readable failure description
    pub error: Option<String>,
    /// Payload of a successful operation
    pub data: Option<T>,
}

impl<T> OperationResult<T> {
    /// A successful result carrying `data`.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: SUCCESS_CODE.to_string(),
            error: None,
            data: Some(data),
        }
    }

    /// A failed result describing `error`.
    #[must_use]
    pub fn failure(error: &HelpdeskError) -> Self {
        Self {
            success: false,
            message: error.code().to_string(),
            error: Some(error.user_message()),
            data: None,
        }
    }

    /// Convert a service result.
    #[must_use]
    pub fn from_result(result: Result<T>) -> Self {
        result.map_or_else(|e| Self::failure(&e), Self::ok)
    }

    /// Transform the payload of a successful result.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        OperationResult {
            success: self.success,
            message: self.message,
            error: self.error,
            data: self.data.map(f),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        Self::from_result(result)
    }
}

impl<T> From<HelpdeskError> for OperationResult<T> {
    fn from(error: HelpdeskError) -> Self {
        Self::failure(&error)
    }
}
