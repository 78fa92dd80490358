use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::common::{AuditRecordId, EntityKind, UserId};

/// Audit action vocabulary. One constant per logical mutation the engine
/// performs; cascades emit one record per affected entity.
pub mod actions {
    pub const USER_DEACTIVATED: &str = "USER_DEACTIVATED";
    pub const USER_REACTIVATED: &str = "USER_REACTIVATED";
    pub const OFFICER_ROLE_DEACTIVATED: &str = "OFFICER_ROLE_DEACTIVATED";
    pub const OFFICER_ROLE_REACTIVATED: &str = "OFFICER_ROLE_REACTIVATED";
    pub const DEPARTMENT_DEACTIVATED: &str = "DEPARTMENT_DEACTIVATED";
    pub const DEPARTMENT_REACTIVATED: &str = "DEPARTMENT_REACTIVATED";
    pub const SERVICE_DEACTIVATED: &str = "SERVICE_DEACTIVATED";
    pub const SERVICE_REACTIVATED: &str = "SERVICE_REACTIVATED";
    pub const APPOINTMENT_CREATED: &str = "APPOINTMENT_CREATED";
    pub const APPOINTMENT_STATUS_CHANGED: &str = "APPOINTMENT_STATUS_CHANGED";
    pub const APPOINTMENT_RESCHEDULED: &str = "APPOINTMENT_RESCHEDULED";
    pub const DOCUMENT_VERIFICATION_CHANGED: &str = "DOCUMENT_VERIFICATION_CHANGED";
    pub const NOTIFICATION_READ: &str = "NOTIFICATION_READ";
    pub const NOTIFICATIONS_MARKED_READ: &str = "NOTIFICATIONS_MARKED_READ";
    pub const FEEDBACK_CREATED: &str = "FEEDBACK_CREATED";
}

/// AuditLog model - append-only compliance trail.
///
/// Rows are inserted inside the triggering transaction and never updated or
/// deleted. `user_id` is the acting user; NULL for system-originated
/// mutations.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct AuditLog {
    pub id: AuditRecordId,
    pub user_id: Option<UserId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub old_values: Option<JsonValue>,
    pub new_values: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    /// Append one record. Failure here is fatal to the triggering
    /// transaction; an unauditable mutation must not commit.
    pub async fn record(
        actor: Option<UserId>,
        action: &str,
        entity_type: EntityKind,
        entity_id: impl Into<Uuid>,
        old_values: Option<JsonValue>,
        new_values: Option<JsonValue>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO audit_logs (user_id, action, entity_type, entity_id, old_values, new_values)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(actor)
        .bind(action)
        .bind(entity_type.as_str())
        .bind(entity_id.into())
        .bind(old_values)
        .bind(new_values)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Trail for one entity, oldest first (compliance lookup).
    pub async fn find_by_entity(
        entity_type: EntityKind,
        entity_id: impl Into<Uuid>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM audit_logs
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY created_at, id",
        )
        .bind(entity_type.as_str())
        .bind(entity_id.into())
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Trail for one acting user, oldest first (compliance lookup).
    pub async fn find_by_actor(actor: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM audit_logs WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(actor)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
