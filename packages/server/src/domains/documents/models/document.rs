use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::common::{AppointmentId, DocumentId, UserId};

/// Document model - an uploaded supporting document.
///
/// Upload storage mechanics live outside the engine; only the verification
/// state and the type linkage matter here.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub user_id: UserId,
    pub appointment_id: Option<AppointmentId>,
    pub document_type: String,
    pub file_name: String,
    pub verified: bool,
    pub verification_notes: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Insert a new unverified document.
    pub async fn create(
        user_id: UserId,
        appointment_id: Option<AppointmentId>,
        document_type: &str,
        file_name: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO documents (user_id, appointment_id, document_type, file_name)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(user_id)
        .bind(appointment_id)
        .bind(document_type)
        .bind(file_name)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Find document by ID
    pub async fn find_by_id(id: DocumentId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// A user's documents, newest first
    pub async fn find_by_user(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM documents WHERE user_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Load a document inside an open transaction, locking the row.
    pub async fn find_for_update(id: DocumentId, conn: &mut PgConnection) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM documents WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(Into::into)
    }

    /// Write verification state. Engine-only path: callers go through
    /// `BookingEngine::verify_document` / `reject_document`.
    pub async fn set_verification(
        id: DocumentId,
        verified: bool,
        notes: Option<&str>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE documents
             SET verified = $2, verification_notes = $3, verified_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(verified)
        .bind(notes)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// True if a required type is covered for an appointment: a verified
    /// document of that type either owned by the user or linked to the
    /// appointment.
    pub async fn type_covered(
        user_id: UserId,
        appointment_id: AppointmentId,
        document_type: &str,
        conn: &mut PgConnection,
    ) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM documents
                WHERE document_type = $3
                  AND verified = true
                  AND (user_id = $1 OR appointment_id = $2)
             )",
        )
        .bind(user_id)
        .bind(appointment_id)
        .bind(document_type)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }
}
