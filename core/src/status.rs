//! Status codes, the status catalog and the transition guard.
//!
//! The catalog is reference data owned by configuration; this module only knows the four
//! codes the lifecycle rules mention. The guard encodes the single rule the system has:
//! once a ticket is completed (`TMN`) it cannot be moved back to open, assigned or
//! escalated through a normal transition.

use crate::error::{HelpdeskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Code of a ticket status, e.g. `ABT` or `TMN`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatusCode(String);

impl StatusCode {
    /// Open, pending acceptance.
    pub const OPEN: &'static str = "ABT";
    /// Assigned, in process.
    pub const ASSIGNED: &'static str = "CDO";
    /// Escalated or suspended.
    pub const ESCALATED: &'static str = "ESU";
    /// Completed. Terminal for normal transitions.
    pub const COMPLETED: &'static str = "TMN";

    /// Create a status code. Surrounding whitespace is trimmed.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.len() == code.len() {
            Self(code)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// `ABT`
    #[must_use]
    pub fn open() -> Self {
        Self::new(Self::OPEN)
    }

    /// `CDO`
    #[must_use]
    pub fn assigned() -> Self {
        Self::new(Self::ASSIGNED)
    }

    /// `ESU`
    #[must_use]
    pub fn escalated() -> Self {
        Self::new(Self::ESCALATED)
    }

    /// `TMN`
    #[must_use]
    pub fn completed() -> Self {
        Self::new(Self::COMPLETED)
    }

    /// Code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the completed status.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.0 == Self::COMPLETED
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of valid status codes, in presentation order.
///
/// # Examples
///
/// ```
/// use helpdesk_core::status::{StatusCatalog, StatusCode};
///
/// let catalog = StatusCatalog::parse("ABT, CDO,ESU,TMN,CNL").unwrap();
/// assert_eq!(catalog.len(), 5);
/// assert!(catalog.contains(&StatusCode::new("CNL")));
/// assert!(StatusCatalog::parse("ABT,ABT").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusCatalog {
    codes: Arc<[StatusCode]>,
}

impl StatusCatalog {
    /// Build a catalog from explicit codes.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Validation`] if the list is empty, holds a blank code or
    /// repeats a code.
    pub fn new(codes: impl IntoIterator<Item = StatusCode>) -> Result<Self> {
        let mut collected: Vec<StatusCode> = Vec::new();
        for code in codes {
            if code.as_str().is_empty() {
                return Err(HelpdeskError::validation("status catalog", "blank status code"));
            }
            if collected.contains(&code) {
                return Err(HelpdeskError::validation(
                    "status catalog",
                    format!("duplicate status code {code}"),
                ));
            }
            collected.push(code);
        }
        if collected.is_empty() {
            return Err(HelpdeskError::validation("status catalog", "no status codes"));
        }
        Ok(Self {
            codes: collected.into(),
        })
    }

    /// Parse a comma-separated list such as `ABT,CDO,ESU,TMN`.
    ///
    /// # Errors
    ///
    /// Same as [`StatusCatalog::new`].
    pub fn parse(list: &str) -> Result<Self> {
        Self::new(list.split(',').map(StatusCode::new))
    }

    /// Whether `code` belongs to the catalog.
    #[must_use]
    pub fn contains(&self, code: &StatusCode) -> bool {
        self.codes.contains(code)
    }

    /// All codes in presentation order.
    #[must_use]
    pub fn codes(&self) -> &[StatusCode] {
        &self.codes
    }

    /// Number of codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Always false for a successfully built catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Reject codes outside the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Validation`] for an unknown code.
    pub fn validate(&self, code: &StatusCode) -> Result<()> {
        if self.contains(code) {
            Ok(())
        } else {
            Err(HelpdeskError::validation(
                "status",
                format!("unknown status code {code}"),
            ))
        }
    }
}

impl Default for StatusCatalog {
    fn default() -> Self {
        Self {
            codes: vec![
                StatusCode::open(),
                StatusCode::assigned(),
                StatusCode::escalated(),
                StatusCode::completed(),
            ]
            .into(),
        }
    }
}

/// Statuses that cannot be entered once a ticket is completed.
const LOCKED_AFTER_COMPLETION: [&str; 3] = [
    StatusCode::OPEN,
    StatusCode::ASSIGNED,
    StatusCode::ESCALATED,
];

/// Decides which statuses a ticket may move to next.
///
/// The same guard instance backs the read path that lists the choices and the write path
/// that accepts them, so a client that ignores the presented choices is still rejected.
#[derive(Clone, Debug, Default)]
pub struct TransitionGuard {
    catalog: StatusCatalog,
}

impl TransitionGuard {
    /// Create a guard over `catalog`.
    #[must_use]
    pub const fn new(catalog: StatusCatalog) -> Self {
        Self { catalog }
    }

    /// Catalog this guard validates against.
    #[must_use]
    pub const fn catalog(&self) -> &StatusCatalog {
        &self.catalog
    }

    /// Statuses reachable from `current`, in catalog order.
    ///
    /// # Examples
    ///
    /// ```
    /// use helpdesk_core::status::{StatusCode, TransitionGuard};
    ///
    /// let guard = TransitionGuard::default();
    /// let from_done = guard.allowed_next_statuses(&StatusCode::completed());
    /// assert_eq!(from_done, vec![StatusCode::completed()]);
    /// assert_eq!(guard.allowed_next_statuses(&StatusCode::open()).len(), 4);
    /// ```
    #[must_use]
    pub fn allowed_next_statuses(&self, current: &StatusCode) -> Vec<StatusCode> {
        self.catalog
            .codes()
            .iter()
            .filter(|candidate| Self::reachable(current, candidate))
            .cloned()
            .collect()
    }

    /// Accept or reject moving from `current` to `requested`.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::Validation`] if `requested` is not in the catalog
    /// - [`HelpdeskError::TransitionDenied`] if `requested` is not reachable
    pub fn check(&self, current: &StatusCode, requested: &StatusCode) -> Result<()> {
        self.catalog.validate(requested)?;
        if Self::reachable(current, requested) {
            Ok(())
        } else {
            Err(HelpdeskError::TransitionDenied {
                current: current.clone(),
                requested: requested.clone(),
            })
        }
    }

    /// Like [`TransitionGuard::check`], for a ticket whose current status may be unknown.
    ///
    /// A ticket without records only needs a status from the catalog.
    ///
    /// # Errors
    ///
    /// Same as [`TransitionGuard::check`].
    pub fn admit(&self, current: Option<&StatusCode>, requested: &StatusCode) -> Result<()> {
        match current {
            Some(current) => self.check(current, requested),
            None => self.catalog.validate(requested),
        }
    }

    fn reachable(current: &StatusCode, candidate: &StatusCode) -> bool {
        !(current.is_completed() && LOCKED_AFTER_COMPLETION.contains(&candidate.as_str()))
    }
}
