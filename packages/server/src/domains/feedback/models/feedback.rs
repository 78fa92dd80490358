use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::common::{AppointmentId, FeedbackId, ServiceId, UserId};

/// Feedback model - one rating per completed appointment.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Feedback {
    pub id: FeedbackId,
    pub user_id: UserId,
    pub appointment_id: AppointmentId,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    /// Insert feedback inside an open transaction. The unique
    /// appointment_id constraint backs the one-per-appointment rule.
    pub async fn create(
        user_id: UserId,
        appointment_id: AppointmentId,
        rating: i32,
        comment: Option<&str>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO feedback (user_id, appointment_id, rating, comment)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(user_id)
        .bind(appointment_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Find feedback by ID
    pub async fn find_by_id(id: FeedbackId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM feedback WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Feedback left on one appointment, if any
    pub async fn find_by_appointment(
        appointment_id: AppointmentId,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM feedback WHERE appointment_id = $1")
            .bind(appointment_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// True if the appointment already has feedback.
    pub async fn exists_for_appointment(
        appointment_id: AppointmentId,
        conn: &mut PgConnection,
    ) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM feedback WHERE appointment_id = $1)",
        )
        .bind(appointment_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Average rating across a service's appointments
    pub async fn average_rating_for_service(
        service_id: ServiceId,
        pool: &PgPool,
    ) -> Result<Option<f64>> {
        sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(f.rating)::float8
             FROM feedback f
             JOIN appointments a ON a.id = f.appointment_id
             WHERE a.service_id = $1",
        )
        .bind(service_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}
