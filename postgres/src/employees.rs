//! `PostgreSQL` employee directory.

use crate::error::persistence;
use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_core::ids::EmployeeId;
use helpdesk_core::store::EmployeeDirectory;
use sqlx::PgPool;
use std::future::Future;
use std::pin::Pin;

/// Employee display names, stored in the `employees` table.
#[derive(Clone, Debug)]
pub struct PostgresEmployeeDirectory {
    pool: PgPool,
}

impl PostgresEmployeeDirectory {
    /// Create a directory over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add an employee, or rename it if it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Persistence`] if the write fails.
    pub async fn register(&self, employee_id: &EmployeeId, full_name: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO employees (employee_id, full_name) VALUES ($1, $2)
            ON CONFLICT (employee_id) DO UPDATE SET full_name = $2, updated_at = now()
            ",
        )
        .bind(employee_id.as_str())
        .bind(full_name)
        .execute(&self.pool)
        .await
        .map_err(persistence("Failed to register employee"))?;
        Ok(())
    }

    /// Current display name of an employee.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Persistence`] if the query fails.
    pub async fn full_name(&self, employee_id: &EmployeeId) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT full_name FROM employees WHERE employee_id = $1")
            .bind(employee_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence("Failed to load employee"))
    }
}

impl EmployeeDirectory for PostgresEmployeeDirectory {
    fn update_employee(
        &self,
        employee_id: EmployeeId,
        full_name: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE employees
                SET full_name = $2, updated_at = now()
                WHERE employee_id = $1
                ",
            )
            .bind(employee_id.as_str())
            .bind(&full_name)
            .execute(&self.pool)
            .await
            .map_err(persistence("Failed to update employee"))?;

            if result.rows_affected() == 0 {
                return Err(HelpdeskError::EmployeeNotFound(employee_id));
            }
            tracing::debug!(employee_id = %employee_id, "Employee display name updated");
            Ok(())
        })
    }
}
