//! Helpdesk ticket history service.
//!
//! Loads configuration, prepares the database and reports readiness.

use helpdesk_core::environment::{Clock, SystemClock};
use helpdesk_core::status::StatusCode;
use helpdesk_core::store::IdentifierAllocator;
use helpdesk_service::{bootstrap, config::Config, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    info!("Starting helpdesk ticket history service");

    let config = Config::from_env()?;
    let catalog: Vec<&str> = config
        .helpdesk
        .status_catalog
        .codes()
        .iter()
        .map(StatusCode::as_str)
        .collect();
    info!(
        postgres_url = %config.postgres.redacted_url(),
        status_catalog = ?catalog,
        utc_offset = %config.helpdesk.utc_offset,
        conflict_retries = config.helpdesk.conflict_retries,
        "Configuration loaded"
    );

    let helpdesk = bootstrap::build(&config).await?;

    let today = SystemClock.today(config.helpdesk.utc_offset);
    let next_folio = helpdesk.store.next_folio(today).await?;
    info!(%today, %next_folio, "Helpdesk ready");

    Ok(())
}
