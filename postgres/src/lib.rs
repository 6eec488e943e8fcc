//! `PostgreSQL` persistence for the helpdesk ticket history.
//!
//! This crate provides the production implementations of the `helpdesk-core` store traits:
//!
//! - [`PostgresTicketStore`]: tickets, the append-only history log and identifier
//!   allocation, each write running in a single transaction
//! - [`PostgresEmployeeDirectory`]: employee display names
//!
//! The schema lives in `migrations/` and is applied with
//! [`PostgresTicketStore::migrate`]. A trigger rejects `UPDATE` and `DELETE` on history
//! records and `DELETE` on tickets, so the log stays append-only even for writers that
//! bypass this crate.
//!
//! # Example
//!
//! ```no_run
//! use helpdesk_postgres::PostgresTicketStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgres://localhost/helpdesk").await?;
//! let store = PostgresTicketStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod employees;
mod error;
mod rows;
mod store;

pub use employees::PostgresEmployeeDirectory;
pub use store::PostgresTicketStore;
