//! Mapping of sqlx errors onto the helpdesk taxonomy.

use helpdesk_core::error::HelpdeskError;

/// Any database failure: logged, then reported without further detail to callers.
pub(crate) fn persistence(context: &'static str) -> impl FnOnce(sqlx::Error) -> HelpdeskError {
    move |e| {
        tracing::error!(error = %e, "{context}");
        HelpdeskError::Persistence(format!("{context}: {e}"))
    }
}

/// Like [`persistence`], except that a unique violation on `key` is a lost allocation
/// race.
pub(crate) fn write_failure(
    key: String,
    context: &'static str,
) -> impl FnOnce(sqlx::Error) -> HelpdeskError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return conflict(key, db_err.message().to_string());
            }
        }
        persistence(context)(e)
    }
}

/// A `ConcurrencyConflict`, counted.
pub(crate) fn conflict(key: String, detail: String) -> HelpdeskError {
    tracing::warn!(key = %key, detail = %detail, "Identifier allocation conflict");
    metrics::counter!("helpdesk.allocation.conflicts").increment(1);
    HelpdeskError::ConcurrencyConflict { key, detail }
}

/// Allocation key of a ticket's record sequence.
pub(crate) fn ticket_key(ticket_id: impl std::fmt::Display) -> String {
    format!("ticket:{ticket_id}")
}
