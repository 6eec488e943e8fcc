//! `PostgreSQL` ticket store.
//!
//! Every write opens one transaction and commits only once all of its rows are in place.
//! Returning early with `?` drops the transaction, which rolls it back, so callers never
//! see a ticket without its first record or a record without its contact update.
//!
//! Identifier allocation happens inside those transactions:
//!
//! - folios: `INSERT .. ON CONFLICT DO UPDATE` on the day's counter row, which row-locks
//!   the day until commit
//! - record ids: `SELECT .. FOR UPDATE` on the ticket row, then count its records
//!
//! Rolled-back allocations are never observed, so both sequences stay gap-free.

use crate::error::{conflict, persistence, ticket_key, write_failure};
use crate::rows::{RECORD_COLUMNS, TICKET_COLUMNS, record_from_row, ticket_from_row};
use chrono::{NaiveDate, SubsecRound};
use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_core::ids::{EmployeeId, Folio, RecordId, TicketId};
use helpdesk_core::record::{NewRecord, Record};
use helpdesk_core::status::TransitionGuard;
use helpdesk_core::store::{
    CreatedTicket, HistoryLog, IdentifierAllocator, TicketSnapshot, TicketStore, WriteContext,
    folio_from_counter,
};
use helpdesk_core::ticket::{NewTicket, RequesterContact, Ticket};
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::future::Future;
use std::pin::Pin;

/// `PostgreSQL`-backed [`TicketStore`].
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| HelpdeskError::Persistence(format!("Migration failed: {e}")))?;
        Ok(())
    }

    async fn connection(&self) -> Result<PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(persistence("Failed to acquire connection"))
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(persistence("Failed to start transaction"))
    }
}

async fn commit(tx: Transaction<'static, Postgres>) -> Result<()> {
    tx.commit()
        .await
        .map_err(persistence("Failed to commit transaction"))
}

async fn find_ticket(conn: &mut PgConnection, ticket_id: TicketId) -> Result<Option<Ticket>> {
    let row = sqlx::query(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = $1"
    ))
    .bind(ticket_id.value())
    .fetch_optional(&mut *conn)
    .await
    .map_err(persistence("Failed to load ticket"))?;

    row.as_ref().map(ticket_from_row).transpose()
}

/// Load the ticket and hold its row lock until the transaction ends.
async fn lock_ticket(conn: &mut PgConnection, ticket_id: TicketId) -> Result<Ticket> {
    let row = sqlx::query(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = $1 FOR UPDATE"
    ))
    .bind(ticket_id.value())
    .fetch_optional(&mut *conn)
    .await
    .map_err(persistence("Failed to lock ticket"))?;

    match row {
        Some(row) => ticket_from_row(&row),
        None => Err(HelpdeskError::TicketNotFound(ticket_id)),
    }
}

async fn ticket_exists(conn: &mut PgConnection, ticket_id: TicketId) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT ticket_id FROM tickets WHERE ticket_id = $1 FOR UPDATE")
            .bind(ticket_id.value())
            .fetch_optional(&mut *conn)
            .await
            .map_err(persistence("Failed to lock ticket"))?;
    Ok(found.is_some())
}

async fn latest_record(conn: &mut PgConnection, ticket_id: TicketId) -> Result<Option<Record>> {
    let row = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM ticket_records WHERE ticket_id = $1 \
         ORDER BY record_id DESC LIMIT 1"
    ))
    .bind(ticket_id.value())
    .fetch_optional(&mut *conn)
    .await
    .map_err(persistence("Failed to load latest record"))?;

    row.as_ref().map(record_from_row).transpose()
}

async fn next_sequence(conn: &mut PgConnection, ticket_id: TicketId) -> Result<RecordId> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ticket_records WHERE ticket_id = $1")
        .bind(ticket_id.value())
        .fetch_one(&mut *conn)
        .await
        .map_err(persistence("Failed to count records"))?;

    i32::try_from(count).map(RecordId::after_count).map_err(|_| {
        HelpdeskError::Persistence(format!("Record sequence overflow on ticket {ticket_id}"))
    })
}

async fn insert_record(conn: &mut PgConnection, record: &Record) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO ticket_records (
            ticket_id, record_id, activity_at, content, note, status_code,
            assigned_employee, service_id, sub_service_id, priority_id, category_id, updated_by
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ",
    )
    .bind(record.ticket_id.value())
    .bind(record.id.value())
    .bind(record.activity_at)
    .bind(&record.content)
    .bind(record.note.as_deref())
    .bind(record.status.as_str())
    .bind(record.assigned_employee.as_ref().map(EmployeeId::as_str))
    .bind(record.classification.service_id)
    .bind(record.classification.sub_service_id)
    .bind(record.classification.priority_id.as_deref())
    .bind(record.classification.category_id.as_deref())
    .bind(&record.updated_by)
    .execute(&mut *conn)
    .await
    .map_err(write_failure(ticket_key(record.ticket_id), "Failed to insert record"))?;
    Ok(())
}

/// Number and append `record` as the ticket's next entry. The ticket row must already be
/// locked by the caller's transaction.
async fn append_next(
    conn: &mut PgConnection,
    ticket_id: TicketId,
    record: NewRecord,
    ctx: &WriteContext,
) -> Result<Record> {
    let id = next_sequence(conn, ticket_id).await?;
    let record = record.into_record(ticket_id, id, ctx.at.trunc_subsecs(6));
    insert_record(conn, &record).await?;
    Ok(record)
}

/// Take the next folio of `day`, holding the day's counter row until commit.
async fn allocate_folio(conn: &mut PgConnection, day: NaiveDate) -> Result<Folio> {
    let counter: i64 = sqlx::query_scalar(
        r"
        INSERT INTO folio_counters (day, value) VALUES ($1, 1)
        ON CONFLICT (day) DO UPDATE SET value = folio_counters.value + 1
        RETURNING value
        ",
    )
    .bind(day)
    .fetch_one(&mut *conn)
    .await
    .map_err(persistence("Failed to allocate folio"))?;

    folio_from_counter(day, counter)
}

fn record_appended(record: &Record) {
    tracing::info!(
        ticket_id = %record.ticket_id,
        record_id = %record.id,
        status = %record.status,
        "Record appended"
    );
    metrics::counter!("helpdesk.records.appended", "status" => record.status.to_string())
        .increment(1);
}

impl IdentifierAllocator for PostgresTicketStore {
    fn next_folio(
        &self,
        day: NaiveDate,
    ) -> Pin<Box<dyn Future<Output = Result<Folio>> + Send + '_>> {
        Box::pin(async move {
            let issued: Option<i64> =
                sqlx::query_scalar("SELECT value FROM folio_counters WHERE day = $1")
                    .bind(day)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(persistence("Failed to read folio counter"))?;
            folio_from_counter(day, issued.unwrap_or(0) + 1)
        })
    }

    fn next_record_sequence(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<RecordId>> + Send + '_>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            next_sequence(&mut conn, ticket_id).await
        })
    }
}

impl HistoryLog for PostgresTicketStore {
    fn append(
        &self,
        record: Record,
        guard: TransitionGuard,
    ) -> Pin<Box<dyn Future<Output = Result<RecordId>> + Send + '_>> {
        Box::pin(async move {
            let ticket_id = record.ticket_id;
            let mut tx = self.begin().await?;

            if !ticket_exists(&mut tx, ticket_id).await? {
                return Err(HelpdeskError::TicketNotFound(ticket_id));
            }
            let latest = latest_record(&mut tx, ticket_id).await?;
            guard.admit(latest.as_ref().map(|latest| &latest.status), &record.status)?;
            let expected = next_sequence(&mut tx, ticket_id).await?;
            if record.id != expected {
                return Err(conflict(
                    ticket_key(ticket_id),
                    format!("record {} offered, next is {expected}", record.id),
                ));
            }
            insert_record(&mut tx, &record).await?;
            commit(tx).await?;

            record_appended(&record);
            Ok(record.id)
        })
    }

    fn list_by_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>>> + Send + '_>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                "SELECT {RECORD_COLUMNS} FROM ticket_records WHERE ticket_id = $1 \
                 ORDER BY record_id ASC"
            ))
            .bind(ticket_id.value())
            .fetch_all(&self.pool)
            .await
            .map_err(persistence("Failed to load history"))?;

            rows.iter().map(record_from_row).collect()
        })
    }

    fn latest_by_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Record>>> + Send + '_>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            latest_record(&mut conn, ticket_id).await
        })
    }
}

impl TicketStore for PostgresTicketStore {
    fn find_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>>> + Send + '_>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            find_ticket(&mut conn, ticket_id).await
        })
    }

    fn create_ticket(
        &self,
        ticket: NewTicket,
        first_record: NewRecord,
        ctx: WriteContext,
    ) -> Pin<Box<dyn Future<Output = Result<CreatedTicket>> + Send + '_>> {
        Box::pin(async move {
            ctx.admit(None, &first_record.status)?;
            let created_at = ctx.at.trunc_subsecs(6);
            let mut tx = self.begin().await?;

            let folio = allocate_folio(&mut tx, ctx.day).await?;
            let ticket_id: i64 = sqlx::query_scalar(
                r"
                INSERT INTO tickets (
                    folio, title, content, requester_name, requester_email,
                    requester_extension, requester_phone, requester_area, requester_location,
                    area_code, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING ticket_id
                ",
            )
            .bind(folio.as_str())
            .bind(&ticket.title)
            .bind(&ticket.content)
            .bind(&ticket.requester.full_name)
            .bind(&ticket.requester.email)
            .bind(ticket.requester.extension)
            .bind(ticket.requester.phone.as_deref())
            .bind(ticket.requester.area.as_deref())
            .bind(ticket.requester.location.as_deref())
            .bind(ticket.area.as_str())
            .bind(created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(write_failure(format!("folio:{}", ctx.day), "Failed to insert ticket"))?;

            let ticket = ticket.into_ticket(TicketId::new(ticket_id), folio, created_at);
            let first_record = append_next(&mut tx, ticket.id, first_record, &ctx).await?;
            commit(tx).await?;

            tracing::info!(
                ticket_id = %ticket.id,
                folio = %ticket.folio,
                area = %ticket.area,
                "Ticket created"
            );
            metrics::counter!("helpdesk.tickets.created").increment(1);
            record_appended(&first_record);

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
        Box::pin(async move {
            let mut tx = self.begin().await?;

            let mut ticket = lock_ticket(&mut tx, ticket_id).await?;
            let latest = latest_record(&mut tx, ticket_id).await?;
            ctx.admit(latest.as_ref(), &record.status)?;

            ticket.apply_contact(&contact);
            sqlx::query(
                r"
                UPDATE tickets
                SET requester_email = $2,
                    requester_extension = $3,
                    requester_phone = $4,
                    requester_area = $5,
                    requester_location = $6
                WHERE ticket_id = $1
                ",
            )
            .bind(ticket_id.value())
            .bind(&ticket.requester.email)
            .bind(ticket.requester.extension)
            .bind(ticket.requester.phone.as_deref())
            .bind(ticket.requester.area.as_deref())
            .bind(ticket.requester.location.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(persistence("Failed to update ticket"))?;

            let record = append_next(&mut tx, ticket_id, record, &ctx).await?;
            commit(tx).await?;

            tracing::info!(ticket_id = %ticket_id, "Ticket contact updated");
            record_appended(&record);
            Ok(TicketSnapshot { ticket, record })
        })
    }

    fn append_record(
        &self,
        ticket_id: TicketId,
        record: NewRecord,
        ctx: WriteContext,
    ) -> Pin<Box<dyn Future<Output = Result<Record>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self.begin().await?;

            if !ticket_exists(&mut tx, ticket_id).await? {
                return Err(HelpdeskError::TicketNotFound(ticket_id));
            }
            let latest = latest_record(&mut tx, ticket_id).await?;
            ctx.admit(latest.as_ref(), &record.status)?;

            let record = append_next(&mut tx, ticket_id, record, &ctx).await?;
            commit(tx).await?;

            record_appended(&record);
            Ok(record)
        })
    }
}
