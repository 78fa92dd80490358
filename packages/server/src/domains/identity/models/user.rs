use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::common::UserId;

/// User role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Citizen,
    Officer,
    Admin,
}

impl UserRole {
    /// Officers and admins may act on other users' appointments and on
    /// activity flags.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Officer | UserRole::Admin)
    }
}

/// User model - SQL persistence layer
///
/// Identity columns (name, contact, national id) are stored but opaque to
/// the engine; only `role` and `active` drive engine behavior.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub national_id: String,
    pub role: UserRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Insert a new user.
    pub async fn create(
        username: &str,
        email: &str,
        full_name: &str,
        phone_number: Option<&str>,
        national_id: &str,
        role: UserRole,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO users (username, email, full_name, phone_number, national_id, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(username)
        .bind(email)
        .bind(full_name)
        .bind(phone_number)
        .bind(national_id)
        .bind(role)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Find user by ID
    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Find user by username
    pub async fn find_by_username(username: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Load a user inside an open transaction, locking the row for the rest
    /// of the transaction.
    pub async fn find_for_update(id: UserId, conn: &mut PgConnection) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(Into::into)
    }

    /// Resolve an actor inside an open transaction (no lock; the actor row
    /// itself is not mutated).
    pub async fn find_on(id: UserId, conn: &mut PgConnection) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(Into::into)
    }

    /// Flip the activity flag. Engine-only path: callers go through
    /// `BookingEngine::set_user_active`.
    pub async fn set_active(id: UserId, active: bool, conn: &mut PgConnection) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE users SET active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }
}
