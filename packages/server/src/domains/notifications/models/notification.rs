use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::common::{NotificationId, UserId};

/// Notification kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentConfirmation,
    Reminder,
    StatusUpdate,
    DocumentRequest,
}

/// Notification model - in-app notification row.
///
/// Outbound email/SMS delivery is the dispatcher's concern; these rows are
/// what the user sees in the portal.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Insert a notification inside an open transaction (engine-produced
    /// lifecycle notifications commit atomically with their trigger).
    pub async fn create(
        user_id: UserId,
        kind: NotificationKind,
        title: &str,
        message: &str,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO notifications (user_id, kind, title, message)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(user_id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Find notification by ID
    pub async fn find_by_id(id: NotificationId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// A user's notifications, newest first
    pub async fn find_by_user(
        user_id: UserId,
        unread_only: bool,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let query = if unread_only {
            "SELECT * FROM notifications
             WHERE user_id = $1 AND read = false
             ORDER BY created_at DESC"
        } else {
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC"
        };

        sqlx::query_as::<_, Self>(query)
            .bind(user_id)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Count of a user's unread notifications
    pub async fn unread_count(user_id: UserId, pool: &PgPool) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = false",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Load a notification inside an open transaction, locking the row.
    pub async fn find_for_update(
        id: NotificationId,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM notifications WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(Into::into)
    }

    /// Mark one notification read.
    pub async fn mark_read(id: NotificationId, conn: &mut PgConnection) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE notifications SET read = true, read_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Mark every unread notification of a user read (deactivation
    /// cascade). Returns the number of rows flipped.
    pub async fn mark_all_read_for_user(
        user_id: UserId,
        conn: &mut PgConnection,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications
             SET read = true, read_at = NOW()
             WHERE user_id = $1 AND read = false",
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}
