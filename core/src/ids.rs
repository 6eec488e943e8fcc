//! Identifier types for tickets, history records, employees and areas.
//!
//! Tickets carry two identifiers: a surrogate [`TicketId`] assigned by the store and a
//! human-facing [`Folio`]. History records are numbered per ticket with [`RecordId`],
//! starting at 1.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest daily counter a folio can carry (four decimal digits).
pub const MAX_DAILY_FOLIO: u32 = 9_999;

const FOLIO_DATE_FORMAT: &str = "%Y%m%d";
const FOLIO_LEN: usize = 12;

/// Error type for [`Folio`] parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid folio: {0}")]
pub struct ParseFolioError(String);

/// Store-assigned surrogate key of a ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketId(i64);

impl TicketId {
    /// Wrap a raw key.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw key value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TicketId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Sequence number of a history record within its ticket.
///
/// Record ids start at [`RecordId::FIRST`] and grow by one with every append, so the
/// ids of a ticket always read `1, 2, 3, …`.
///
/// # Examples
///
/// ```
/// use helpdesk_core::ids::RecordId;
///
/// let first = RecordId::FIRST;
/// assert_eq!(first.value(), 1);
/// assert_eq!(first.next(), RecordId::new(2));
/// assert_eq!(RecordId::after_count(4), RecordId::new(5));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(i32);

impl RecordId {
    /// Id of the record written together with a new ticket.
    pub const FIRST: Self = Self(1);

    /// Wrap a raw sequence number.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Raw sequence number.
    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }

    /// The id that follows this one.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// The id a new record gets when `count` records already exist.
    #[must_use]
    pub const fn after_count(count: i32) -> Self {
        Self(count + 1)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-facing ticket identifier: `YYYYMMDD` followed by a 4-digit daily counter.
///
/// Folios of the same day sort in issue order both numerically and lexicographically,
/// which is why the counter never grows past [`MAX_DAILY_FOLIO`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use helpdesk_core::ids::Folio;
///
/// let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// let folio = Folio::compose(day, 7).unwrap();
/// assert_eq!(folio.as_str(), "202401150007");
///
/// let parsed: Folio = "202401150007".parse().unwrap();
/// assert_eq!(parsed.date(), day);
/// assert_eq!(parsed.sequence(), 7);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Folio(String);

impl Folio {
    /// Build the folio for the `sequence`-th ticket of `day`.
    ///
    /// Returns `None` when `sequence` is zero or does not fit in four digits.
    #[must_use]
    pub fn compose(day: NaiveDate, sequence: u32) -> Option<Self> {
        if sequence == 0 || sequence > MAX_DAILY_FOLIO {
            return None;
        }
        Some(Self(format!("{}{sequence:04}", day.format(FOLIO_DATE_FORMAT))))
    }

    /// Calendar day encoded in the prefix.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        // Only constructed through `compose` or `from_str`, both of which validate the prefix.
        NaiveDate::parse_from_str(&self.0[..8], FOLIO_DATE_FORMAT).unwrap_or_default()
    }

    /// Daily counter encoded in the suffix.
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.0[8..].parse().unwrap_or_default()
    }

    /// Folio as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Folio {
    type Err = ParseFolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != FOLIO_LEN || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseFolioError(s.to_string()));
        }
        let day = NaiveDate::parse_from_str(&s[..8], FOLIO_DATE_FORMAT)
            .map_err(|_| ParseFolioError(s.to_string()))?;
        let sequence: u32 = s[8..].parse().map_err(|_| ParseFolioError(s.to_string()))?;
        Self::compose(day, sequence).ok_or_else(|| ParseFolioError(s.to_string()))
    }
}

impl TryFrom<String> for Folio {
    type Error = ParseFolioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Folio> for String {
    fn from(folio: Folio) -> Self {
        folio.0
    }
}

impl fmt::Display for Folio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an employee in the directory (also used for the logged-in user).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Create a new employee id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Employee id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Area-of-responsibility code of a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaCode(String);

impl AreaCode {
    /// Create a new area code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Area code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AreaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn jan_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn first_folio_of_the_day() {
        let folio = Folio::compose(jan_15(), 1).unwrap();
        assert_eq!(folio.as_str(), "202401150001");
        assert_eq!(folio.date(), jan_15());
        assert_eq!(folio.sequence(), 1);
    }

    #[test]
    fn compose_rejects_out_of_range_counters() {
        assert!(Folio::compose(jan_15(), 0).is_none());
        assert!(Folio::compose(jan_15(), MAX_DAILY_FOLIO).is_some());
        assert!(Folio::compose(jan_15(), MAX_DAILY_FOLIO + 1).is_none());
    }

    #[test]
    fn parse_rejects_malformed_folios() {
        assert!("".parse::<Folio>().is_err());
        assert!("20240115001".parse::<Folio>().is_err());
        assert!("2024011500012".parse::<Folio>().is_err());
        assert!("20241315 001".parse::<Folio>().is_err());
        assert!("202413150001".parse::<Folio>().is_err());
        assert!("202401150000".parse::<Folio>().is_err());
    }

    #[test]
    fn folio_serializes_as_plain_string() {
        let folio = Folio::compose(jan_15(), 42).unwrap();
        let json = serde_json::to_string(&folio).unwrap();
        assert_eq!(json, "\"202401150042\"");
        let back: Folio = serde_json::from_str(&json).unwrap();
        assert_eq!(back, folio);
        assert!(serde_json::from_str::<Folio>("\"not-a-folio\"").is_err());
    }

    #[test]
    fn record_id_sequence() {
        assert_eq!(RecordId::after_count(0), RecordId::FIRST);
        assert_eq!(RecordId::FIRST.next().next(), RecordId::new(3));
    }

    proptest! {
        #[test]
        fn same_day_folios_sort_in_issue_order(
            a in 1u32..=MAX_DAILY_FOLIO,
            b in 1u32..=MAX_DAILY_FOLIO,
        ) {
            let fa = Folio::compose(jan_15(), a).unwrap();
            let fb = Folio::compose(jan_15(), b).unwrap();
            prop_assert_eq!(a.cmp(&b), fa.as_str().cmp(fb.as_str()));
        }

        #[test]
        fn composed_folios_parse_back(
            day_offset in 0i64..20_000,
            seq in 1u32..=MAX_DAILY_FOLIO,
        ) {
            let day = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
                + chrono::Duration::days(day_offset);
            let folio = Folio::compose(day, seq).unwrap();
            let parsed: Folio = folio.as_str().parse().unwrap();
            prop_assert_eq!(parsed.date(), day);
            prop_assert_eq!(parsed.sequence(), seq);
        }
    }
}
