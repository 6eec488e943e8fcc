//! Ownership and area resolution.
//!
//! A ticket's owner and status are whatever its latest record says. Nothing here takes
//! locks, so answers may trail a concurrent write by one record.

use helpdesk_core::error::Result;
use helpdesk_core::ids::{AreaCode, EmployeeId, TicketId};
use helpdesk_core::status::StatusCode;
use helpdesk_core::store::TicketStore;
use std::sync::Arc;

/// Read-side queries over the history log.
#[derive(Clone)]
pub struct OwnershipResolver {
    store: Arc<dyn TicketStore>,
}

impl OwnershipResolver {
    /// Create a resolver reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Whether the latest record assigns the ticket to `user`.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on store failure.
    pub async fn is_owner(&self, ticket_id: TicketId, user: &EmployeeId) -> Result<bool> {
        Ok(self.current_owner(ticket_id).await?.as_ref() == Some(user))
    }

    /// Whether the ticket belongs to `area`.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on store failure.
    pub async fn is_in_area(&self, ticket_id: TicketId, area: &AreaCode) -> Result<bool> {
        let ticket = self.store.find_ticket(ticket_id).await?;
        Ok(ticket.is_some_and(|ticket| &ticket.area == area))
    }

    /// Status of the latest record.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on store failure.
    pub async fn current_status(&self, ticket_id: TicketId) -> Result<Option<StatusCode>> {
        let latest = self.store.latest_by_ticket(ticket_id).await?;
        Ok(latest.map(|record| record.status))
    }

    /// Employee assigned by the latest record.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on store failure.
    pub async fn current_owner(&self, ticket_id: TicketId) -> Result<Option<EmployeeId>> {
        let latest = self.store.latest_by_ticket(ticket_id).await?;
        Ok(latest.and_then(|record| record.assigned_employee))
    }

    /// Whether `user`, working in `area`, may act on the ticket: its owner or anyone in
    /// its area.
    ///
    /// Fails closed: a store error is logged and denies access.
    pub async fn can_access(
        &self,
        ticket_id: TicketId,
        user: &EmployeeId,
        area: &AreaCode,
    ) -> bool {
        let decision = match self.is_owner(ticket_id, user).await {
            Ok(true) => Ok(true),
            Ok(false) => self.is_in_area(ticket_id, area).await,
            Err(e) => Err(e),
        };

        decision.unwrap_or_else(|e| {
            tracing::warn!(
                ticket_id = %ticket_id,
                user = %user,
                error = %e,
                "Access check failed, denying"
            );
            false
        })
    }
}
