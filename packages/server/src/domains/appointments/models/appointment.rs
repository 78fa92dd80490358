use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::common::{AppointmentId, DepartmentId, ServiceId, TimeSlotId, UserId};

/// Appointment status
///
/// Holding statuses (pending, confirmed, documents_verified) each consume
/// one unit of their time slot's capacity; terminal statuses consume none.
/// `completed` keeps its unit for historical accuracy and is exempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    DocumentsVerified,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::DocumentsVerified => "documents_verified",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// True while the appointment holds one unit of slot capacity.
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending
                | AppointmentStatus::Confirmed
                | AppointmentStatus::DocumentsVerified
        )
    }

    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::NoShow
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appointment model - SQL persistence layer
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Appointment {
    pub id: AppointmentId,
    pub user_id: UserId,
    pub service_id: ServiceId,
    pub time_slot_id: TimeSlotId,
    pub status: AppointmentStatus,
    pub booking_reference: String,
    pub qr_code: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Insert a new pending appointment inside an open transaction.
    ///
    /// The id is generated app-side so the QR payload can embed it in the
    /// same statement.
    pub async fn create(
        id: AppointmentId,
        user_id: UserId,
        service_id: ServiceId,
        time_slot_id: TimeSlotId,
        booking_reference: &str,
        qr_code: &str,
        notes: Option<&str>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO appointments (
                id,
                user_id,
                service_id,
                time_slot_id,
                status,
                booking_reference,
                qr_code,
                notes
             )
             VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7)
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(service_id)
        .bind(time_slot_id)
        .bind(booking_reference)
        .bind(qr_code)
        .bind(notes)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Find appointment by ID
    pub async fn find_by_id(id: AppointmentId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Find appointment by its unique booking reference
    pub async fn find_by_reference(reference: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM appointments WHERE booking_reference = $1")
            .bind(reference)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// A user's appointments, newest first
    pub async fn find_by_user(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM appointments WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Load an appointment inside an open transaction, locking the row.
    pub async fn find_for_update(
        id: AppointmentId,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(Into::into)
    }

    /// True if the user already holds an appointment in this slot.
    pub async fn holding_exists_for_user_slot(
        user_id: UserId,
        time_slot_id: TimeSlotId,
        conn: &mut PgConnection,
    ) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM appointments
                WHERE user_id = $1
                  AND time_slot_id = $2
                  AND status IN ('pending', 'confirmed', 'documents_verified')
             )",
        )
        .bind(user_id)
        .bind(time_slot_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// A user's holding appointments, locked, for the deactivation cascade.
    pub async fn find_holding_by_user(
        user_id: UserId,
        conn: &mut PgConnection,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM appointments
             WHERE user_id = $1
               AND status IN ('pending', 'confirmed', 'documents_verified')
             ORDER BY created_at
             FOR UPDATE",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// A service's holding appointments, locked, for the deactivation cascade.
    pub async fn find_holding_by_service(
        service_id: ServiceId,
        conn: &mut PgConnection,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM appointments
             WHERE service_id = $1
               AND status IN ('pending', 'confirmed', 'documents_verified')
             ORDER BY created_at
             FOR UPDATE",
        )
        .bind(service_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Holding appointments across every service of a department.
    pub async fn find_holding_by_department(
        department_id: DepartmentId,
        conn: &mut PgConnection,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT a.* FROM appointments a
             JOIN services s ON s.id = a.service_id
             WHERE s.department_id = $1
               AND a.status IN ('pending', 'confirmed', 'documents_verified')
             ORDER BY a.created_at
             FOR UPDATE OF a",
        )
        .bind(department_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Write a new status. Engine-only path: all callers go through the
    /// state machine's decision first.
    pub async fn update_status(
        id: AppointmentId,
        status: AppointmentStatus,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE appointments SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Move the appointment to another slot and reset it to pending
    /// (reschedule).
    pub async fn move_to_slot(
        id: AppointmentId,
        time_slot_id: TimeSlotId,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE appointments
             SET time_slot_id = $2, status = 'pending', updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(time_slot_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }
}
