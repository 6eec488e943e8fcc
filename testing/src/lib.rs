//! # Helpdesk Testing
//!
//! Testing utilities for the helpdesk ticket history.
//!
//! This crate provides:
//! - [`InMemoryTicketStore`]: a `TicketStore` with transactional semantics and fault
//!   injection
//! - [`FixedClock`]: deterministic, manually advanced time
//! - [`RecordingEmployeeDirectory`]: an employee directory that records updates
//! - [`fixtures`]: ready-made tickets and records
//!
//! ## Example
//!
//! ```ignore
//! use helpdesk_core::store::TicketStore;
//! use helpdesk_testing::{fixtures, test_clock, InMemoryTicketStore};
//!
//! let store = InMemoryTicketStore::new();
//! let created = store
//!     .create_ticket(
//!         fixtures::new_ticket(),
//!         fixtures::opening_record(),
//!         fixtures::write_context(&test_clock()),
//!     )
//!     .await?;
//! assert_eq!(created.ticket.folio.as_str(), "202401150001");
//! ```

pub mod directory;
pub mod fixtures;
pub mod store;

pub use directory::RecordingEmployeeDirectory;
pub use mocks::{FixedClock, test_clock};
pub use store::{FailPoint, InMemoryTicketStore};

/// Mock implementations of Environment traits
pub mod mocks {
    use chrono::{DateTime, Duration, Utc};
    use helpdesk_core::environment::Clock;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until it is moved with [`FixedClock::set`] or
    /// [`FixedClock::advance`]. Clones share the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use helpdesk_core::environment::Clock;
    /// use helpdesk_testing::mocks::FixedClock;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// assert_eq!(before, clock.now());
    /// clock.advance(Duration::days(1));
    /// assert_eq!(clock.now() - before, Duration::days(1));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock to `time`.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }

        /// Move the clock forward by `by`.
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2024-01-15 15:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2024-01-15T15:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, NaiveDate};
    use helpdesk_core::environment::Clock;

    #[test]
    fn test_clock_is_pinned_to_scenario_day() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(
            clock.today(FixedOffset::east_opt(0).unwrap()),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn clones_share_time() {
        let clock = test_clock();
        let other = clock.clone();
        clock.advance(Duration::hours(10));
        assert_eq!(clock.now(), other.now());
    }
}
