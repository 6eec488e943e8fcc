//! # Helpdesk Service
//!
//! Application layer of the helpdesk ticket history:
//!
//! - [`registration::TicketRegistrationService`]: creates tickets and appends to their
//!   history, one atomic unit of work per request
//! - [`resolver::OwnershipResolver`]: current status, owner and area checks
//! - [`response::OperationResult`]: the result shape returned to callers
//! - [`config::Config`]: environment-driven configuration
//! - [`bootstrap`]: production wiring over `PostgreSQL`
//!
//! ## Example
//!
//! ```ignore
//! use helpdesk_service::{bootstrap, config::Config, response::OperationResult};
//!
//! let config = Config::from_env()?;
//! let helpdesk = bootstrap::build(&config).await?;
//! let result = OperationResult::from_result(
//!     helpdesk.registration.create_ticket(new_ticket, first_record).await,
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod registration;
pub mod resolver;
pub mod response;
pub mod retry;
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use registration::{TicketDetails, TicketRegistrationService};
pub use resolver::OwnershipResolver;
pub use response::OperationResult;
pub use retry::RetryPolicy;
