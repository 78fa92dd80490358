use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::common::{DepartmentId, OfficerRoleId, UserId};

/// OfficerRole model - a user's posting as an officer of one department.
///
/// At most one role per user (unique user_id).
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct OfficerRole {
    pub id: OfficerRoleId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub officer_number: String,
    pub designation: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OfficerRole {
    /// Insert a new officer role.
    pub async fn create(
        user_id: UserId,
        department_id: DepartmentId,
        officer_number: &str,
        designation: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO officer_roles (user_id, department_id, officer_number, designation)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(user_id)
        .bind(department_id)
        .bind(officer_number)
        .bind(designation)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Find the role owned by a user, if any.
    pub async fn find_by_user(user_id: UserId, conn: &mut PgConnection) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM officer_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(Into::into)
    }

    /// All roles posted to a department, active or not.
    pub async fn find_by_department(
        department_id: DepartmentId,
        conn: &mut PgConnection,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM officer_roles WHERE department_id = $1 ORDER BY officer_number",
        )
        .bind(department_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Flip one role's activity flag.
    pub async fn set_active(
        id: OfficerRoleId,
        active: bool,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE officer_roles SET active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }
}
