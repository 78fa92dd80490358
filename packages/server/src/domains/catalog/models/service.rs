use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::common::{DepartmentId, ServiceId};

/// Service model - a bookable government service offered by one department.
///
/// `required_document_types` drives the document verification gate: an
/// appointment is promoted to documents-verified only once every listed
/// type is covered by a verified document.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Service {
    pub id: ServiceId,
    pub department_id: DepartmentId,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub max_daily_appointments: i32,
    pub required_document_types: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// Insert a new service.
    pub async fn create(
        department_id: DepartmentId,
        name: &str,
        description: Option<&str>,
        duration_minutes: i32,
        max_daily_appointments: i32,
        required_document_types: &[String],
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO services (
                department_id,
                name,
                description,
                duration_minutes,
                max_daily_appointments,
                required_document_types
             )
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(department_id)
        .bind(name)
        .bind(description)
        .bind(duration_minutes)
        .bind(max_daily_appointments)
        .bind(required_document_types)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Find service by ID
    pub async fn find_by_id(id: ServiceId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Active services of a department
    pub async fn find_active_by_department(
        department_id: DepartmentId,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM services WHERE department_id = $1 AND active = true ORDER BY name",
        )
        .bind(department_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Read a service inside an open transaction (no lock).
    pub async fn find_on(id: ServiceId, conn: &mut PgConnection) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(Into::into)
    }

    /// Load a service inside an open transaction, locking the row.
    pub async fn find_for_update(id: ServiceId, conn: &mut PgConnection) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM services WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(Into::into)
    }

    /// All services of a department, locked, for the deactivation cascade.
    pub async fn find_by_department_for_update(
        department_id: DepartmentId,
        conn: &mut PgConnection,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM services WHERE department_id = $1 ORDER BY name FOR UPDATE",
        )
        .bind(department_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Required document types inside an open transaction.
    pub async fn required_document_types(
        id: ServiceId,
        conn: &mut PgConnection,
    ) -> Result<Option<Vec<String>>> {
        sqlx::query_scalar::<_, Vec<String>>(
            "SELECT required_document_types FROM services WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Flip the activity flag. Engine-only path: callers go through
    /// `BookingEngine::set_service_active`.
    pub async fn set_active(id: ServiceId, active: bool, conn: &mut PgConnection) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE services SET active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }
}
