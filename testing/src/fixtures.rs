//! Ready-made inputs for tests.

use helpdesk_core::environment::Clock;
use helpdesk_core::ids::AreaCode;
use helpdesk_core::record::NewRecord;
use helpdesk_core::status::{StatusCode, TransitionGuard};
use helpdesk_core::store::WriteContext;
use helpdesk_core::ticket::{NewTicket, Requester, RequesterContact};

/// Area every fixture ticket belongs to.
pub const AREA: &str = "IT";

/// User recorded as author of fixture records.
pub const AGENT: &str = "helpdesk-agent";

/// A complete requester.
#[must_use]
pub fn requester() -> Requester {
    Requester {
        full_name: "Ana Lopez".to_string(),
        email: "ana.lopez@example.com".to_string(),
        extension: Some(4021),
        phone: Some("555-0100".to_string()),
        area: Some("Finance".to_string()),
        location: Some("Building A, floor 2".to_string()),
    }
}

/// A valid ticket for the [`AREA`] area.
#[must_use]
pub fn new_ticket() -> NewTicket {
    NewTicket {
        title: "Printer offline".to_string(),
        content: "The shared printer on floor 2 does not respond".to_string(),
        requester: requester(),
        area: AreaCode::new(AREA),
    }
}

/// The usual first record of a ticket: open, unassigned.
#[must_use]
pub fn opening_record() -> NewRecord {
    NewRecord::with_status(StatusCode::open(), AGENT).content("Ticket registered")
}

/// A record moving the ticket to `status`.
#[must_use]
pub fn status_record(status: StatusCode) -> NewRecord {
    NewRecord::with_status(status, AGENT)
}

/// New contact details for the fixture requester.
#[must_use]
pub fn contact() -> RequesterContact {
    RequesterContact {
        email: "ana.lopez@example.org".to_string(),
        extension: Some(4099),
        phone: None,
        area: Some("Treasury".to_string()),
        location: Some("Building B, floor 1".to_string()),
    }
}

/// A write context stamped from `clock`, using the UTC calendar day and the default
/// catalog.
#[must_use]
pub fn write_context(clock: &dyn Clock) -> WriteContext {
    let at = clock.now();
    WriteContext {
        at,
        day: at.date_naive(),
        guard: TransitionGuard::default(),
    }
}
