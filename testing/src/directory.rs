//! Employee directory double that remembers every rename.

use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_core::ids::EmployeeId;
use helpdesk_core::store::EmployeeDirectory;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory [`EmployeeDirectory`].
///
/// Unknown employees are rejected with `EmployeeNotFound`. A directory built with
/// [`RecordingEmployeeDirectory::failing`] rejects every update with `Persistence`,
/// which is how tests check that directory trouble never undoes a ticket write.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmployeeDirectory {
    names: Arc<Mutex<HashMap<EmployeeId, String>>>,
    updates: Arc<Mutex<Vec<(EmployeeId, String)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingEmployeeDirectory {
    /// Directory knowing the given employees.
    #[must_use]
    pub fn with_employees<I, S>(employees: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let names = employees
            .into_iter()
            .map(|(id, name)| (EmployeeId::new(id), name.into()))
            .collect();
        Self {
            names: Arc::new(Mutex::new(names)),
            ..Self::default()
        }
    }

    /// Directory whose store is down.
    #[must_use]
    pub fn failing() -> Self {
        let directory = Self::default();
        directory.failing.store(true, Ordering::SeqCst);
        directory
    }

    /// Current display name of `employee_id`.
    #[must_use]
    pub fn name_of(&self, employee_id: &EmployeeId) -> Option<String> {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(employee_id)
            .cloned()
    }

    /// Accepted updates, in call order.
    #[must_use]
    pub fn updates(&self) -> Vec<(EmployeeId, String)> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EmployeeDirectory for RecordingEmployeeDirectory {
    fn update_employee(
        &self,
        employee_id: EmployeeId,
        full_name: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(HelpdeskError::Persistence(
                    "employee directory unavailable".to_string(),
                ));
            }
            let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(name) = names.get_mut(&employee_id) else {
                return Err(HelpdeskError::EmployeeNotFound(employee_id));
            };
            name.clone_from(&full_name);
            drop(names);
            self.updates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((employee_id, full_name));
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_employee_is_renamed() {
        let directory = RecordingEmployeeDirectory::with_employees([("E100", "J. Perez")]);
        let id = EmployeeId::new("E100");

        directory
            .update_employee(id.clone(), "Juan Perez".to_string())
            .await
            .unwrap();

        assert_eq!(directory.name_of(&id).as_deref(), Some("Juan Perez"));
        assert_eq!(directory.updates(), vec![(id, "Juan Perez".to_string())]);
    }

    #[tokio::test]
    async fn unknown_employee_is_not_found() {
        let directory = RecordingEmployeeDirectory::default();
        let error = directory
            .update_employee(EmployeeId::new("E404"), "Nobody".to_string())
            .await
            .unwrap_err();

        assert_eq!(error, HelpdeskError::EmployeeNotFound(EmployeeId::new("E404")));
        assert!(directory.updates().is_empty());
    }

    #[tokio::test]
    async fn failing_directory_reports_persistence() {
        let directory = RecordingEmployeeDirectory::failing();
        let error = directory
            .update_employee(EmployeeId::new("E100"), "Juan".to_string())
            .await
            .unwrap_err();

        assert!(matches!(error, HelpdeskError::Persistence(_)));
    }
}
