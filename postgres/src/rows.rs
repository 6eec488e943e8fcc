//! Row decoding for tickets and records.

use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_core::ids::{AreaCode, EmployeeId, Folio, RecordId, TicketId};
use helpdesk_core::record::{Classification, Record};
use helpdesk_core::status::StatusCode;
use helpdesk_core::ticket::{Requester, Ticket};
use sqlx::postgres::PgRow;
use sqlx::{Decode, Postgres, Row, Type};

/// Columns selected for a [`Ticket`], in the order [`ticket_from_row`] expects by name.
pub(crate) const TICKET_COLUMNS: &str = "ticket_id, folio, title, content, requester_name, \
     requester_email, requester_extension, requester_phone, requester_area, \
     requester_location, area_code, created_at";

/// Columns selected for a [`Record`].
pub(crate) const RECORD_COLUMNS: &str = "ticket_id, record_id, activity_at, content, note, \
     status_code, assigned_employee, service_id, sub_service_id, priority_id, category_id, \
     updated_by";

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| HelpdeskError::Persistence(format!("Failed to read column {name}: {e}")))
}

pub(crate) fn ticket_from_row(row: &PgRow) -> Result<Ticket> {
    let folio: String = column(row, "folio")?;
    let folio: Folio = folio
        .parse()
        .map_err(|e| HelpdeskError::Persistence(format!("Corrupt ticket row: {e}")))?;

    Ok(Ticket {
        id: TicketId::new(column(row, "ticket_id")?),
        folio,
        title: column(row, "title")?,
        content: column(row, "content")?,
        requester: Requester {
            full_name: column(row, "requester_name")?,
            email: column(row, "requester_email")?,
            extension: column(row, "requester_extension")?,
            phone: column(row, "requester_phone")?,
            area: column(row, "requester_area")?,
            location: column(row, "requester_location")?,
        },
        area: AreaCode::new(column::<String>(row, "area_code")?),
        created_at: column(row, "created_at")?,
    })
}

pub(crate) fn record_from_row(row: &PgRow) -> Result<Record> {
    let assigned: Option<String> = column(row, "assigned_employee")?;
    Ok(Record {
        ticket_id: TicketId::new(column(row, "ticket_id")?),
        id: RecordId::new(column(row, "record_id")?),
        activity_at: column(row, "activity_at")?,
        content: column(row, "content")?,
        note: column(row, "note")?,
        status: StatusCode::new(column::<String>(row, "status_code")?),
        assigned_employee: assigned.map(EmployeeId::new),
        classification: Classification {
            service_id: column(row, "service_id")?,
            sub_service_id: column(row, "sub_service_id")?,
            priority_id: column(row, "priority_id")?,
            category_id: column(row, "category_id")?,
        },
        updated_by: column(row, "updated_by")?,
    })
}
