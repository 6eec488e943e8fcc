//! # Helpdesk Core
//!
//! Domain types and abstractions for the helpdesk ticket history.
//!
//! A support ticket is written once; everything that happens to it afterwards is an
//! immutable [`record::Record`] appended to its history. The current status and owner of
//! a ticket are never stored on the ticket itself: they are whatever the record with the
//! highest id says.
//!
//! ## Modules
//!
//! - [`ids`]: ticket ids, per-ticket record ids, folios, employee and area codes
//! - [`status`]: status codes, the status catalog and the transition guard
//! - [`ticket`]: the ticket entity and its inputs
//! - [`record`]: history records
//! - [`store`]: allocator, history log and unit-of-work traits
//! - [`error`]: the error taxonomy
//! - [`environment`]: injected dependencies such as the clock
//!
//! ## Example
//!
//! ```
//! use helpdesk_core::status::{StatusCode, TransitionGuard};
//!
//! let guard = TransitionGuard::default();
//! assert!(guard.check(&StatusCode::open(), &StatusCode::assigned()).is_ok());
//! assert!(guard.check(&StatusCode::completed(), &StatusCode::open()).is_err());
//! ```

pub mod error;
pub mod ids;
pub mod record;
pub mod status;
pub mod store;
pub mod ticket;

pub use error::{HelpdeskError, Result, SUCCESS_CODE};
pub use ids::{AreaCode, EmployeeId, Folio, RecordId, TicketId};
pub use record::{Classification, NewRecord, Record};
pub use status::{StatusCatalog, StatusCode, TransitionGuard};
pub use store::{
    CreatedTicket, EmployeeDirectory, HistoryLog, IdentifierAllocator, TicketSnapshot,
    TicketStore, WriteContext,
};
pub use ticket::{NewTicket, Requester, RequesterContact, Ticket};

/// Environment module - Dependency injection traits
///
/// All sources of non-determinism are abstracted behind traits and injected, so tests
/// can pin them.
pub mod environment {
    use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::FixedOffset;
    /// use helpdesk_core::environment::{Clock, SystemClock};
    ///
    /// let offset = FixedOffset::west_opt(6 * 3600).unwrap();
    /// let day = SystemClock.today(offset);
    /// assert!(SystemClock.now().with_timezone(&offset).date_naive() >= day);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;

        /// Calendar day of `now()` as seen at `offset`.
        ///
        /// Folios are numbered per local calendar day, not per UTC day.
        fn today(&self, offset: FixedOffset) -> NaiveDate {
            local_day(self.now(), offset)
        }
    }

    /// Calendar day of `at` as seen at `offset`.
    #[must_use]
    pub fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
        at.with_timezone(&offset).date_naive()
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

}
