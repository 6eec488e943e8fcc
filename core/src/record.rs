//! History records: one immutable fact about a ticket's state at a point in time.

use crate::error::Result;
use crate::ids::{EmployeeId, RecordId, TicketId};
use crate::status::{StatusCatalog, StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Service classification attached to a record. Every code is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Service
    pub service_id: Option<i32>,
    /// Sub-service
    pub sub_service_id: Option<i32>,
    /// Priority
    pub priority_id: Option<String>,
    /// Category
    pub category_id: Option<String>,
}

/// A persisted history entry.
///
/// Records are written once and never updated or deleted. The record with the highest
/// [`RecordId`] of a ticket defines its current status and owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Sequence number within the ticket
    pub id: RecordId,
    /// When the change happened
    pub activity_at: DateTime<Utc>,
    /// Description of the activity
    pub content: String,
    /// Free-text note
    pub note: Option<String>,
    /// Status of the ticket as of this record
    pub status: StatusCode,
    /// Employee the ticket is assigned to as of this record
    pub assigned_employee: Option<EmployeeId>,
    /// Service classification
    pub classification: Classification,
    /// User who made the change
    pub updated_by: String,
}

/// A record about to be appended; the store assigns ticket, id and timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Description of the activity
    pub content: String,
    /// Free-text note
    pub note: Option<String>,
    /// Requested status
    pub status: StatusCode,
    /// Employee to assign
    pub assigned_employee: Option<EmployeeId>,
    /// Service classification
    pub classification: Classification,
    /// User making the change
    pub updated_by: String,
}

impl NewRecord {
    /// A bare record carrying only a status and the acting user.
    #[must_use]
    pub fn with_status(status: StatusCode, updated_by: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            note: None,
            status,
            assigned_employee: None,
            classification: Classification::default(),
            updated_by: updated_by.into(),
        }
    }

    /// Set the activity description.
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Attach a note.
    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Assign the ticket to `employee`.
    #[must_use]
    pub fn assign_to(mut self, employee: EmployeeId) -> Self {
        self.assigned_employee = Some(employee);
        self
    }

    /// Set the classification.
    #[must_use]
    pub fn classified(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    /// Check the status against the catalog and require an acting user.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::HelpdeskError::Validation`] for an unknown status or a
    /// blank `updated_by`.
    pub fn validate(&self, catalog: &StatusCatalog) -> Result<()> {
        catalog.validate(&self.status)?;
        if self.updated_by.trim().is_empty() {
            return Err(crate::error::HelpdeskError::validation("updated by", "is required"));
        }
        Ok(())
    }

    /// Materialise the record once its position in the log is known.
    #[must_use]
    pub fn into_record(
        self,
        ticket_id: TicketId,
        id: RecordId,
        activity_at: DateTime<Utc>,
    ) -> Record {
        Record {
            ticket_id,
            id,
            activity_at,
            content: self.content,
            note: self.note,
            status: self.status,
            assigned_employee: self.assigned_employee,
            classification: self.classification,
            updated_by: self.updated_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_optional_fields() {
        let record = NewRecord::with_status(StatusCode::assigned(), "helpdesk-admin")
            .content("Assigned to field support")
            .note("User called twice")
            .assign_to(EmployeeId::new("E042"));
        assert_eq!(record.assigned_employee, Some(EmployeeId::new("E042")));
        assert_eq!(record.note.as_deref(), Some("User called twice"));

        let persisted = record.into_record(TicketId::new(7), RecordId::new(2), Utc::now());
        assert_eq!(persisted.ticket_id, TicketId::new(7));
        assert_eq!(persisted.id, RecordId::new(2));
        assert_eq!(persisted.status, StatusCode::assigned());
    }

    #[test]
    fn validation_requires_known_status_and_user() {
        let catalog = StatusCatalog::default();
        assert!(NewRecord::with_status(StatusCode::open(), "u1").validate(&catalog).is_ok());
        assert!(
            NewRecord::with_status(StatusCode::new("NOPE"), "u1")
                .validate(&catalog)
                .is_err()
        );
        assert!(
            NewRecord::with_status(StatusCode::open(), " ")
                .validate(&catalog)
                .is_err()
        );
    }
}
