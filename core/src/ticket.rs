//! Ticket entity and the inputs that create or amend it.
//!
//! A ticket holds the descriptive and requester data of a support request. It carries no
//! status or assignee: those live in the history log and are resolved from the latest
//! record.

use crate::error::{HelpdeskError, Result};
use crate::ids::{AreaCode, Folio, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Person who raised the ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Full name
    pub full_name: String,
    /// Contact email
    pub email: String,
    /// Phone extension
    pub extension: Option<i32>,
    /// Phone number
    pub phone: Option<String>,
    /// Department or area the requester works in
    pub area: Option<String>,
    /// Physical location
    pub location: Option<String>,
}

/// A persisted support ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Surrogate key
    pub id: TicketId,
    /// Human-facing identifier
    pub folio: Folio,
    /// Subject line
    pub title: String,
    /// Description of the problem
    pub content: String,
    /// Who asked for help
    pub requester: Requester,
    /// Area responsible for the ticket
    pub area: AreaCode,
    /// When the ticket was registered
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Apply mutable contact fields. Name, title and content are fixed at creation.
    pub fn apply_contact(&mut self, contact: &RequesterContact) {
        self.requester.email.clone_from(&contact.email);
        self.requester.extension = contact.extension;
        self.requester.phone.clone_from(&contact.phone);
        self.requester.area.clone_from(&contact.area);
        self.requester.location.clone_from(&contact.location);
    }
}

/// Fields of a ticket about to be registered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    /// Subject line
    pub title: String,
    /// Description of the problem
    pub content: String,
    /// Who asked for help
    pub requester: Requester,
    /// Area responsible for the ticket
    pub area: AreaCode,
}

impl NewTicket {
    /// Check required requester and content fields.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Validation`] naming the first missing or malformed field.
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("content", &self.content)?;
        require("requester name", &self.requester.full_name)?;
        validate_email(&self.requester.email)?;
        require("area", self.area.as_str())
    }

    /// Materialise the ticket once the store has assigned its identifiers.
    #[must_use]
    pub fn into_ticket(self, id: TicketId, folio: Folio, created_at: DateTime<Utc>) -> Ticket {
        Ticket {
            id,
            folio,
            title: self.title,
            content: self.content,
            requester: self.requester,
            area: self.area,
            created_at,
        }
    }
}

/// Requester contact fields that may change after registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterContact {
    /// Contact email
    pub email: String,
    /// Phone extension
    pub extension: Option<i32>,
    /// Phone number
    pub phone: Option<String>,
    /// Department or area the requester works in
    pub area: Option<String>,
    /// Physical location
    pub location: Option<String>,
}

impl RequesterContact {
    /// Check the contact fields.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Validation`] if the email is missing or malformed.
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)
    }
}

fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(HelpdeskError::validation(field, "is required"))
    } else {
        Ok(())
    }
}

/// Validate a requester email address.
///
/// Basic structural check: one `@`, non-empty local part, a dotted domain and a sane
/// length.
///
/// # Errors
///
/// Returns [`HelpdeskError::Validation`] for a missing or malformed address.
///
/// # Examples
///
/// ```
/// use helpdesk_core::ticket::validate_email;
///
/// assert!(validate_email("ana.lopez@example.com").is_ok());
/// assert!(validate_email("").is_err());
/// assert!(validate_email("ana@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(HelpdeskError::validation("requester email", "is required"));
    }
    if email.len() < 3 || email.len() > 255 {
        return Err(HelpdeskError::validation("requester email", "has an invalid length"));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(HelpdeskError::validation("requester email", "is missing '@'"));
    };

    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
        && domain.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '-');
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'));

    if local_ok && domain_ok {
        Ok(())
    } else {
        Err(HelpdeskError::validation("requester email", "is malformed"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    fn new_ticket() -> NewTicket {
        NewTicket {
            title: "Printer offline".to_string(),
            content: "The second floor printer does not respond".to_string(),
            requester: Requester {
                full_name: "Ana Lopez".to_string(),
                email: "ana.lopez@example.com".to_string(),
                extension: Some(1234),
                phone: None,
                area: Some("Finance".to_string()),
                location: Some("Floor 2".to_string()),
            },
            area: AreaCode::new("IT"),
        }
    }

    #[test]
    fn complete_ticket_validates() {
        assert!(new_ticket().validate().is_ok());
    }

    #[test]
    fn missing_email_is_reported() {
        let mut ticket = new_ticket();
        ticket.requester.email = "  ".to_string();
        let err = ticket.validate().unwrap_err();
        assert!(matches!(
            err,
            HelpdeskError::Validation { field: "requester email", .. }
        ));
    }

    #[test]
    fn missing_content_is_reported_before_requester() {
        let mut ticket = new_ticket();
        ticket.content = String::new();
        ticket.requester.full_name = String::new();
        let err = ticket.validate().unwrap_err();
        assert!(matches!(err, HelpdeskError::Validation { field: "content", .. }));
    }

    #[test]
    fn email_shapes() {
        assert!(validate_email("user+tag@sub.example.com").is_ok());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_email("user@example..com").is_err());
    }

    #[test]
    fn contact_update_keeps_name() {
        let mut ticket = new_ticket().into_ticket(
            TicketId::new(1),
            "202401150001".parse().unwrap(),
            Utc::now(),
        );
        ticket.apply_contact(&RequesterContact {
            email: "ana@example.org".to_string(),
            extension: None,
            phone: Some("555-0101".to_string()),
            area: None,
            location: Some("Floor 3".to_string()),
        });
        assert_eq!(ticket.requester.full_name, "Ana Lopez");
        assert_eq!(ticket.requester.email, "ana@example.org");
        assert_eq!(ticket.requester.extension, None);
        assert_eq!(ticket.requester.location.as_deref(), Some("Floor 3"));
    }
}
