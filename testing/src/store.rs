//! In-memory ticket store.
//!
//! Every unit of work runs against a staged copy of the tables and replaces the live
//! tables only when it finishes, which gives the same all-or-nothing behaviour as a
//! database transaction. The whole unit runs under one lock, so allocation is serialised
//! exactly like the row locks of the Postgres store.
//!
//! Faults can be injected to exercise rollback paths:
//!
//! ```
//! use helpdesk_testing::{FailPoint, InMemoryTicketStore};
//!
//! let store = InMemoryTicketStore::new();
//! store.fail_next(FailPoint::AfterTicketInsert);
//! assert_eq!(store.ticket_count(), 0);
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_core::ids::{Folio, RecordId, TicketId};
use helpdesk_core::record::{NewRecord, Record};
use helpdesk_core::status::TransitionGuard;
use helpdesk_core::store::{
    CreatedTicket, HistoryLog, IdentifierAllocator, TicketSnapshot, TicketStore, WriteContext,
    folio_from_counter,
};
use helpdesk_core::ticket::{NewTicket, RequesterContact, Ticket};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Point inside a unit of work where an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// After the ticket row of `create_ticket` is staged, before its first record
    AfterTicketInsert,
    /// After the contact update of `update_ticket` is staged, before its record
    AfterTicketUpdate,
    /// When any unit of work is about to commit
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    tickets: BTreeMap<TicketId, Ticket>,
    records: BTreeMap<TicketId, Vec<Record>>,
    folio_counters: HashMap<NaiveDate, i64>,
    last_ticket_id: i64,
}

impl Tables {
    fn latest(&self, ticket_id: TicketId) -> Option<&Record> {
        self.records.get(&ticket_id).and_then(|log| log.last())
    }

    fn next_sequence(&self, ticket_id: TicketId) -> Result<RecordId> {
        let count = self.records.get(&ticket_id).map_or(0, Vec::len);
        i32::try_from(count).map(RecordId::after_count).map_err(|_| {
            HelpdeskError::Persistence(format!("record sequence overflow on ticket {ticket_id}"))
        })
    }

    fn push_next(
        &mut self,
        ticket_id: TicketId,
        record: NewRecord,
        at: DateTime<Utc>,
    ) -> Result<Record> {
        let id = self.next_sequence(ticket_id)?;
        let record = record.into_record(ticket_id, id, at);
        self.records.entry(ticket_id).or_default().push(record.clone());
        Ok(record)
    }
}

#[derive(Debug, Default)]
struct Faults {
    offline: AtomicBool,
    armed: Mutex<Option<FailPoint>>,
}

impl Faults {
    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(HelpdeskError::Persistence("store unreachable".to_string()))
        } else {
            Ok(())
        }
    }

    /// Fire (and disarm) the injected failure if it is armed for `point`.
    fn trip(&self, point: FailPoint) -> Result<()> {
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        if *armed == Some(point) {
            *armed = None;
            return Err(HelpdeskError::Persistence(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

/// In-memory [`TicketStore`] for tests.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with a persistence error, as if the database were down.
    pub fn set_offline(&self, offline: bool) {
        self.faults.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next unit of work that reaches `point`.
    pub fn fail_next(&self, point: FailPoint) {
        *self.faults.armed.lock().unwrap_or_else(PoisonError::into_inner) = Some(point);
    }

    /// Number of committed tickets.
    #[must_use]
    pub fn ticket_count(&self) -> usize {
        self.read(|tables| tables.tickets.len())
    }

    /// Number of committed records across all tickets.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.read(|tables| tables.records.values().map(Vec::len).sum())
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&self.tables.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn query<T: Send + 'static>(
        &self,
        f: impl FnOnce(&Tables) -> Result<T> + Send + 'static,
    ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + '_>> {
        let tables = Arc::clone(&self.tables);
        let faults = Arc::clone(&self.faults);
        Box::pin(async move {
            faults.ensure_online()?;
            let tables = tables.lock().unwrap_or_else(PoisonError::into_inner);
            f(&tables)
        })
    }

    fn unit_of_work<T: Send + 'static>(
        &self,
        work: impl FnOnce(&mut Tables, &Faults) -> Result<T> + Send + 'static,
    ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + '_>> {
        let tables = Arc::clone(&self.tables);
        let faults = Arc::clone(&self.faults);
        Box::pin(async move {
            faults.ensure_online()?;
            let mut live = tables.lock().unwrap_or_else(PoisonError::into_inner);
            let mut staged = live.clone();
            let value = work(&mut staged, &faults)?;
            faults.trip(FailPoint::Commit)?;
            *live = staged;
            Ok(value)
        })
    }
}

impl IdentifierAllocator for InMemoryTicketStore {
    fn next_folio(
        &self,
        day: NaiveDate,
    ) -> Pin<Box<dyn Future<Output = Result<Folio>> + Send + '_>> {
        self.query(move |tables| {
            let issued = tables.folio_counters.get(&day).copied().unwrap_or(0);
            folio_from_counter(day, issued + 1)
        })
    }

    fn next_record_sequence(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<RecordId>> + Send + '_>> {
        self.query(move |tables| tables.next_sequence(ticket_id))
    }
}

impl HistoryLog for InMemoryTicketStore {
    fn append(
        &self,
        record: Record,
        guard: TransitionGuard,
    ) -> Pin<Box<dyn Future<Output = Result<RecordId>> + Send + '_>> {
        self.unit_of_work(move |tables, _| {
            let ticket_id = record.ticket_id;
            if !tables.tickets.contains_key(&ticket_id) {
                return Err(HelpdeskError::TicketNotFound(ticket_id));
            }
            let current = tables.latest(ticket_id).map(|latest| &latest.status);
            guard.admit(current, &record.status)?;
            let expected = tables.next_sequence(ticket_id)?;
            if record.id != expected {
                return Err(HelpdeskError::ConcurrencyConflict {
                    key: format!("ticket:{ticket_id}"),
                    detail: format!("record {} offered, next is {expected}", record.id),
                });
            }
            let id = record.id;
            tables.records.entry(ticket_id).or_default().push(record);
            Ok(id)
        })
    }

    fn list_by_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>>> + Send + '_>> {
        self.query(move |tables| Ok(tables.records.get(&ticket_id).cloned().unwrap_or_default()))
    }

    fn latest_by_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Record>>> + Send + '_>> {
        self.query(move |tables| Ok(tables.latest(ticket_id).cloned()))
    }
}

impl TicketStore for InMemoryTicketStore {
    fn find_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>>> + Send + '_>> {
        self.query(move |tables| Ok(tables.tickets.get(&ticket_id).cloned()))
    }

    fn create_ticket(
        &self,
        ticket: NewTicket,
        first_record: NewRecord,
        ctx: WriteContext,
    ) -> Pin<Box<dyn Future<Output = Result<CreatedTicket>> + Send + '_>> {
        self.unit_of_work(move |tables, faults| {
            ctx.admit(None, &first_record.status)?;

            let counter = tables.folio_counters.entry(ctx.day).or_insert(0);
            *counter += 1;
            let folio = folio_from_counter(ctx.day, *counter)?;

            tables.last_ticket_id += 1;
            let id = TicketId::new(tables.last_ticket_id);
            let ticket = ticket.into_ticket(id, folio, ctx.at);
            tables.tickets.insert(id, ticket.clone());
            faults.trip(FailPoint::AfterTicketInsert)?;

            let first_record = tables.push_next(id, first_record, ctx.at)?;
            Ok(CreatedTicket {
                ticket,
                first_record,
            })
        })
    }

    fn update_ticket(
        &self,
        ticket_id: TicketId,
        contact: RequesterContact,
        record: NewRecord,
        ctx: WriteContext,
    ) -> Pin<Box<dyn Future<Output = Result<TicketSnapshot>> + Send + '_>> {
        self.unit_of_work(move |tables, faults| {
            if !tables.tickets.contains_key(&ticket_id) {
                return Err(HelpdeskError::TicketNotFound(ticket_id));
            }
            ctx.admit(tables.latest(ticket_id), &record.status)?;

            let ticket = tables
                .tickets
                .get_mut(&ticket_id)
                .ok_or(HelpdeskError::TicketNotFound(ticket_id))?;
            ticket.apply_contact(&contact);
            let ticket = ticket.clone();
            faults.trip(FailPoint::AfterTicketUpdate)?;

            let record = tables.push_next(ticket_id, record, ctx.at)?;
            Ok(TicketSnapshot { ticket, record })
        })
    }

    fn append_record(
        &self,
        ticket_id: TicketId,
        record: NewRecord,
        ctx: WriteContext,
    ) -> Pin<Box<dyn Future<Output = Result<Record>> + Send + '_>> {
        self.unit_of_work(move |tables, _| {
            if !tables.tickets.contains_key(&ticket_id) {
                return Err(HelpdeskError::TicketNotFound(ticket_id));
            }
            ctx.admit(tables.latest(ticket_id), &record.status)?;
            tables.push_next(ticket_id, record, ctx.at)
        })
    }
}
