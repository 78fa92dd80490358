use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::common::DepartmentId;

/// Department model - SQL persistence layer
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Department {
    /// Insert a new department.
    pub async fn create(
        name: &str,
        description: Option<&str>,
        location: Option<&str>,
        contact_email: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO departments (name, description, location, contact_email)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(name)
        .bind(description)
        .bind(location)
        .bind(contact_email)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Find department by ID
    pub async fn find_by_id(id: DepartmentId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Find department by its unique name
    pub async fn find_by_name(name: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM departments WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// All departments, active first
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM departments ORDER BY active DESC, name")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Load a department inside an open transaction, locking the row.
    pub async fn find_for_update(
        id: DepartmentId,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM departments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(Into::into)
    }

    /// Flip the activity flag. Engine-only path: callers go through
    /// `BookingEngine::set_department_active`.
    pub async fn set_active(
        id: DepartmentId,
        active: bool,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE departments SET active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }
}
