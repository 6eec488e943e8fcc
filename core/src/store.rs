//! Store abstractions: identifier allocation, the history log and ticket units of work.
//!
//! # Design
//!
//! Three traits split the store along the lines the subsystem reasons about:
//!
//! - [`IdentifierAllocator`]: read-only previews of the next folio and record id
//! - [`HistoryLog`]: the append-only record collection
//! - [`TicketStore`]: ticket reads plus the three atomic units of work
//!
//! Each unit of work allocates its identifiers, checks the transition guard and writes
//! every row inside one transaction. Allocation is serialised per key (calendar day for
//! folios, ticket for records), so concurrent writers never observe the same count.
//!
//! # Implementations
//!
//! - `PostgresTicketStore` (in `helpdesk-postgres`): production implementation
//! - `InMemoryTicketStore` (in `helpdesk-testing`): deterministic tests with fault injection
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` so the service can hold `Arc<dyn TicketStore>`.

use crate::error::{HelpdeskError, Result};
use crate::ids::{EmployeeId, Folio, MAX_DAILY_FOLIO, RecordId, TicketId};
use crate::record::{NewRecord, Record};
use crate::status::{StatusCode, TransitionGuard};
use crate::ticket::{NewTicket, RequesterContact, Ticket};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Identifiers assigned to a freshly registered ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTicket {
    /// The persisted ticket
    pub ticket: Ticket,
    /// Its first history record
    pub first_record: Record,
}

/// Ticket state right after an update, with the record that captured it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSnapshot {
    /// Ticket after the contact update
    pub ticket: Ticket,
    /// Record appended by the update
    pub record: Record,
}

/// Inputs a unit of work needs from its caller: the clock reading and the guard.
#[derive(Clone, Debug)]
pub struct WriteContext {
    /// Timestamp stamped on written rows
    pub at: DateTime<Utc>,
    /// Calendar day used for folio allocation
    pub day: NaiveDate,
    /// Guard checked against the latest record before appending
    pub guard: TransitionGuard,
}

impl WriteContext {
    /// Accept or reject a requested status given the ticket's latest record.
    ///
    /// A ticket without records only needs a status from the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::TransitionDenied`] or [`HelpdeskError::Validation`].
    pub fn admit(&self, latest: Option<&Record>, requested: &StatusCode) -> Result<()> {
        self.guard.admit(latest.map(|record| &record.status), requested)
    }
}

/// Turn the value of a day's folio counter into a folio.
///
/// # Errors
///
/// Returns [`HelpdeskError::FolioSpaceExhausted`] once the counter leaves the 4-digit
/// range.
pub fn folio_from_counter(day: NaiveDate, counter: i64) -> Result<Folio> {
    u32::try_from(counter)
        .ok()
        .filter(|n| *n <= MAX_DAILY_FOLIO)
        .and_then(|n| Folio::compose(day, n))
        .ok_or(HelpdeskError::FolioSpaceExhausted { day })
}

/// Read-only previews of the identifiers the next write would receive.
///
/// These never reserve anything. Allocation proper happens inside the
/// [`TicketStore`] units of work.
pub trait IdentifierAllocator: Send + Sync {
    /// Folio the next ticket registered on `day` would get.
    ///
    /// Reflects committed tickets only.
    ///
    /// # Errors
    ///
    /// - `Persistence`: store unreachable
    /// - `FolioSpaceExhausted`: every folio of the day has been issued
    fn next_folio(
        &self,
        day: NaiveDate,
    ) -> Pin<Box<dyn Future<Output = Result<Folio>> + Send + '_>>;

    /// Record id the next append to `ticket_id` would get: existing records plus one.
    ///
    /// # Errors
    ///
    /// - `Persistence`: store unreachable
    fn next_record_sequence(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<RecordId>> + Send + '_>>;
}

/// Append-only log of ticket records keyed by `(ticket_id, record_id)`.
///
/// There is deliberately no update or delete.
pub trait HistoryLog: Send + Sync {
    /// Append a fully numbered record.
    ///
    /// The record id must equal the ticket's next record sequence at append time. A
    /// writer that numbered its record from a stale count is rejected instead of
    /// producing a duplicate. The record's status is checked by `guard` against the
    /// ticket's latest record under the same lock.
    ///
    /// # Errors
    ///
    /// - `TicketNotFound`: the owning ticket does not exist
    /// - `TransitionDenied`: the latest status does not allow the record's status
    /// - `Validation`: the record's status is outside the catalog
    /// - `ConcurrencyConflict`: the record id is not the next in sequence
    /// - `Persistence`: store failure
    fn append(
        &self,
        record: Record,
        guard: TransitionGuard,
    ) -> Pin<Box<dyn Future<Output = Result<RecordId>> + Send + '_>>;

    /// All records of a ticket, oldest first. Unknown tickets yield an empty list.
    ///
    /// # Errors
    ///
    /// - `Persistence`: store failure
    fn list_by_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>>> + Send + '_>>;

    /// The record with the highest id for a ticket, if any.
    ///
    /// # Errors
    ///
    /// - `Persistence`: store failure
    fn latest_by_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Record>>> + Send + '_>>;
}

/// Ticket persistence with all-or-nothing units of work.
pub trait TicketStore: IdentifierAllocator + HistoryLog {
    /// Load a ticket.
    ///
    /// # Errors
    ///
    /// - `Persistence`: store failure
    fn find_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>>> + Send + '_>>;

    /// Register a ticket and its first record (id 1) in one transaction.
    ///
    /// The folio is allocated for `ctx.day` under the day's counter lock.
    ///
    /// # Errors
    ///
    /// - `Validation`: first record status outside the catalog
    /// - `FolioSpaceExhausted`: no folio left for the day
    /// - `ConcurrencyConflict`: identifier collision detected by the store
    /// - `Persistence`: store failure; nothing was written
    fn create_ticket(
        &self,
        ticket: NewTicket,
        first_record: NewRecord,
        ctx: WriteContext,
    ) -> Pin<Box<dyn Future<Output = Result<CreatedTicket>> + Send + '_>>;

    /// Update requester contact fields and append a record in one transaction.
    ///
    /// # Errors
    ///
    /// - `TicketNotFound`: nothing was written
    /// - `TransitionDenied` / `Validation`: rejected by the guard, nothing was written
    /// - `ConcurrencyConflict`, `Persistence`: rolled back
    fn update_ticket(
        &self,
        ticket_id: TicketId,
        contact: RequesterContact,
        record: NewRecord,
        ctx: WriteContext,
    ) -> Pin<Box<dyn Future<Output = Result<TicketSnapshot>> + Send + '_>>;

    /// Append a history-only record, numbering it under the ticket lock.
    ///
    /// # Errors
    ///
    /// Same as [`TicketStore::update_ticket`].
    fn append_record(
        &self,
        ticket_id: TicketId,
        record: NewRecord,
        ctx: WriteContext,
    ) -> Pin<Box<dyn Future<Output = Result<Record>> + Send + '_>>;
}

/// Directory of employees whose display names are kept in sync with assignments.
pub trait EmployeeDirectory: Send + Sync {
    /// Set the display name of an employee.
    ///
    /// # Errors
    ///
    /// - `EmployeeNotFound`: no such employee
    /// - `Persistence`: store failure
    fn update_employee(
        &self,
        employee_id: EmployeeId,
        full_name: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::ids::TicketId;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn counter_maps_to_folio() {
        assert_eq!(folio_from_counter(day(), 2).unwrap().as_str(), "202401150002");
    }

    #[test]
    fn counter_overflow_is_reported() {
        assert_eq!(
            folio_from_counter(day(), 10_000).unwrap_err(),
            HelpdeskError::FolioSpaceExhausted { day: day() }
        );
        assert!(folio_from_counter(day(), 0).is_err());
        assert!(folio_from_counter(day(), -1).is_err());
    }

    #[test]
    fn admit_uses_latest_status() {
        let ctx = WriteContext {
            at: Utc::now(),
            day: day(),
            guard: TransitionGuard::default(),
        };
        let done = NewRecord::with_status(StatusCode::completed(), "u1").into_record(
            TicketId::new(1),
            RecordId::new(3),
            Utc::now(),
        );
        assert!(ctx.admit(Some(&done), &StatusCode::open()).is_err());
        assert!(ctx.admit(Some(&done), &StatusCode::completed()).is_ok());
        assert!(ctx.admit(None, &StatusCode::open()).is_ok());
    }
}
