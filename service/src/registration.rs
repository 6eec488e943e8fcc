//! Ticket registration service.
//!
//! Validates requests, stamps them with the clock, and hands each write to the store as a
//! single unit of work. Allocation races are retried as a whole; everything else is
//! surfaced to the caller as a [`HelpdeskError`].

use crate::config::HelpdeskConfig;
use crate::retry::{RetryPolicy, retry_on_conflict};
use chrono::FixedOffset;
use helpdesk_core::environment::{Clock, local_day};
use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_core::ids::{EmployeeId, TicketId};
use helpdesk_core::record::{NewRecord, Record};
use helpdesk_core::status::{StatusCode, TransitionGuard};
use helpdesk_core::store::{
    CreatedTicket, EmployeeDirectory, TicketSnapshot, TicketStore, WriteContext,
};
use helpdesk_core::ticket::{NewTicket, RequesterContact, Ticket};
use serde::Serialize;
use std::sync::Arc;

/// A ticket as shown on its detail page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TicketDetails {
    /// The ticket itself
    pub ticket: Ticket,
    /// Its most recent record, which defines status and owner
    pub latest: Option<Record>,
    /// Statuses a new record may carry
    pub allowed_statuses: Vec<StatusCode>,
}

impl TicketDetails {
    /// Current status, if the ticket has any record.
    #[must_use]
    pub fn current_status(&self) -> Option<&StatusCode> {
        self.latest.as_ref().map(|record| &record.status)
    }

    /// Employee the ticket is currently assigned to.
    #[must_use]
    pub fn current_owner(&self) -> Option<&EmployeeId> {
        self.latest
            .as_ref()
            .and_then(|record| record.assigned_employee.as_ref())
    }
}

/// Orchestrates ticket creation and history appends.
///
/// # Example
///
/// ```ignore
/// let clock = Arc::new(SystemClock);
/// let service = TicketRegistrationService::new(store, directory, clock, &config.helpdesk);
/// let created = service.create_ticket(new_ticket, first_record).await?;
/// println!("registered {}", created.ticket.folio);
/// ```
#[derive(Clone)]
pub struct TicketRegistrationService {
    store: Arc<dyn TicketStore>,
    directory: Arc<dyn EmployeeDirectory>,
    clock: Arc<dyn Clock>,
    guard: TransitionGuard,
    utc_offset: FixedOffset,
    retry: RetryPolicy,
}

impl TicketRegistrationService {
    /// Create a service over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        directory: Arc<dyn EmployeeDirectory>,
        clock: Arc<dyn Clock>,
        config: &HelpdeskConfig,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            guard: TransitionGuard::new(config.status_catalog.clone()),
            utc_offset: config.utc_offset,
            retry: RetryPolicy::with_max_retries(config.conflict_retries),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The transition guard used for every write.
    #[must_use]
    pub const fn guard(&self) -> &TransitionGuard {
        &self.guard
    }

    fn write_context(&self) -> WriteContext {
        let at = self.clock.now();
        WriteContext {
            at,
            day: local_day(at, self.utc_offset),
            guard: self.guard.clone(),
        }
    }

    /// Register a ticket together with its first record.
    ///
    /// The folio is allocated for the local calendar day and the first record gets id 1.
    ///
    /// # Errors
    ///
    /// - `Validation`: missing requester or content fields, unknown status
    /// - `FolioSpaceExhausted`: the day's folios are used up
    /// - `ConcurrencyConflict`: still conflicting after the configured retries
    /// - `Persistence`: nothing was written
    pub async fn create_ticket(
        &self,
        ticket: NewTicket,
        first_record: NewRecord,
    ) -> Result<CreatedTicket> {
        ticket.validate()?;
        first_record.validate(self.guard.catalog())?;

        let created = retry_on_conflict(&self.retry, "create_ticket", || {
            self.store
                .create_ticket(ticket.clone(), first_record.clone(), self.write_context())
        })
        .await
        .inspect_err(|e| log_failure("create_ticket", None, e))?;

        tracing::info!(
            ticket_id = %created.ticket.id,
            folio = %created.ticket.folio,
            status = %created.first_record.status,
            "Ticket registered"
        );
        Ok(created)
    }

    /// Update the requester's contact details and append a record, atomically.
    ///
    /// When the record assigns an employee and `employee_name` is given, the employee
    /// directory is updated after the ticket write commits. A directory failure is logged
    /// and does not undo the ticket update.
    ///
    /// # Errors
    ///
    /// - `Validation`: malformed contact or record
    /// - `TicketNotFound`: nothing was written
    /// - `TransitionDenied`: the ticket is completed and the status is locked
    /// - `ConcurrencyConflict`, `Persistence`: nothing was written
    pub async fn update_ticket_details(
        &self,
        ticket_id: TicketId,
        contact: RequesterContact,
        record: NewRecord,
        employee_name: Option<String>,
    ) -> Result<TicketSnapshot> {
        contact.validate()?;
        record.validate(self.guard.catalog())?;

        let snapshot = retry_on_conflict(&self.retry, "update_ticket_details", || {
            self.store.update_ticket(
                ticket_id,
                contact.clone(),
                record.clone(),
                self.write_context(),
            )
        })
        .await
        .inspect_err(|e| log_failure("update_ticket_details", Some(ticket_id), e))?;

        tracing::info!(
            ticket_id = %ticket_id,
            record_id = %snapshot.record.id,
            status = %snapshot.record.status,
            "Ticket details updated"
        );

        if let (Some(employee), Some(name)) = (&snapshot.record.assigned_employee, employee_name) {
            self.sync_employee_name(employee.clone(), name).await;
        }
        Ok(snapshot)
    }

    async fn sync_employee_name(&self, employee: EmployeeId, name: String) {
        if name.trim().is_empty() {
            return;
        }
        if let Err(e) = self.directory.update_employee(employee.clone(), name).await {
            tracing::warn!(
                employee_id = %employee,
                error = %e,
                "Employee directory update failed; ticket update kept"
            );
        }
    }

    /// Append a history-only record (status change, reassignment, annotation).
    ///
    /// # Errors
    ///
    /// - `Validation`: malformed record
    /// - `TicketNotFound`: nothing was written
    /// - `TransitionDenied`: the ticket is completed and the status is locked
    /// - `ConcurrencyConflict`, `Persistence`: nothing was written
    pub async fn append_record(&self, ticket_id: TicketId, record: NewRecord) -> Result<Record> {
        record.validate(self.guard.catalog())?;

        let appended = retry_on_conflict(&self.retry, "append_record", || {
            self.store
                .append_record(ticket_id, record.clone(), self.write_context())
        })
        .await
        .inspect_err(|e| log_failure("append_record", Some(ticket_id), e))?;

        tracing::info!(
            ticket_id = %ticket_id,
            record_id = %appended.id,
            status = %appended.status,
            "Record added to ticket history"
        );
        Ok(appended)
    }

    /// The ticket, its latest record and the statuses it may move to.
    ///
    /// # Errors
    ///
    /// - `TicketNotFound`: no such ticket
    /// - `Persistence`: store failure
    pub async fn ticket_details(&self, ticket_id: TicketId) -> Result<TicketDetails> {
        let ticket = self
            .store
            .find_ticket(ticket_id)
            .await?
            .ok_or(HelpdeskError::TicketNotFound(ticket_id))?;
        let latest = self.store.latest_by_ticket(ticket_id).await?;
        let allowed_statuses = match &latest {
            Some(record) => self.guard.allowed_next_statuses(&record.status),
            None => self.guard.catalog().codes().to_vec(),
        };

        Ok(TicketDetails {
            ticket,
            latest,
            allowed_statuses,
        })
    }

    /// Full history of a ticket, oldest record first.
    ///
    /// # Errors
    ///
    /// - `TicketNotFound`: no such ticket
    /// - `Persistence`: store failure
    pub async fn history(&self, ticket_id: TicketId) -> Result<Vec<Record>> {
        if self.store.find_ticket(ticket_id).await?.is_none() {
            return Err(HelpdeskError::TicketNotFound(ticket_id));
        }
        self.store.list_by_ticket(ticket_id).await
    }
}

fn log_failure(operation: &'static str, ticket_id: Option<TicketId>, error: &HelpdeskError) {
    let ticket_id = ticket_id.map(|id| id.value());
    match error {
        HelpdeskError::Persistence(_) | HelpdeskError::FolioSpaceExhausted { .. } => {
            tracing::error!(operation, ticket_id, error = %error, "Ticket write failed");
        }
        HelpdeskError::TransitionDenied { .. } | HelpdeskError::ConcurrencyConflict { .. } => {
            tracing::warn!(operation, ticket_id, error = %error, "Ticket write rejected");
        }
        _ => tracing::debug!(operation, ticket_id, error = %error, "Ticket write rejected"),
    }
}
