//! Wiring of the production collaborators.
//!
//! Connects the pool, applies migrations and assembles the registration service and the
//! resolver over the Postgres store.

use crate::config::{Config, PostgresConfig};
use crate::registration::TicketRegistrationService;
use crate::resolver::OwnershipResolver;
use helpdesk_core::environment::SystemClock;
use helpdesk_postgres::{PostgresEmployeeDirectory, PostgresTicketStore};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Everything a front end needs to serve ticket requests.
#[derive(Clone)]
pub struct Helpdesk {
    /// Write side
    pub registration: TicketRegistrationService,
    /// Read side
    pub resolver: OwnershipResolver,
    /// The store both sides use
    pub store: Arc<PostgresTicketStore>,
}

/// Open a connection pool sized by `config`.
///
/// # Errors
///
/// Returns the sqlx error if the database cannot be reached.
pub async fn connect(config: &PostgresConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .idle_timeout(Duration::from_secs(config.idle_timeout))
        .connect(&config.url)
        .await
}

/// Connect, migrate and assemble the service.
///
/// # Errors
///
/// Fails if the database is unreachable or a migration fails.
pub async fn build(config: &Config) -> anyhow::Result<Helpdesk> {
    info!(
        max_connections = config.postgres.max_connections,
        "Connecting to ticket database..."
    );
    let pool = connect(&config.postgres).await?;

    let store = Arc::new(PostgresTicketStore::new(pool.clone()));
    store.migrate().await?;
    info!("Ticket database migrated");

    let directory = Arc::new(PostgresEmployeeDirectory::new(pool));
    let registration = TicketRegistrationService::new(
        store.clone(),
        directory,
        Arc::new(SystemClock),
        &config.helpdesk,
    );
    let resolver = OwnershipResolver::new(store.clone());

    Ok(Helpdesk {
        registration,
        resolver,
        store,
    })
}
