use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::common::{ServiceId, TimeSlotId};

/// TimeSlot model - one bookable window of a service.
///
/// `current_bookings` is owned by the capacity module; nothing else may
/// read-modify-write it. `available` is maintained alongside every counter
/// change as `current_bookings < max_capacity`, and forced to false while
/// the owning service is inactive.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub service_id: ServiceId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_capacity: i32,
    pub current_bookings: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeSlot {
    /// Insert a single slot.
    pub async fn create(
        service_id: ServiceId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        max_capacity: i32,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO time_slots (service_id, start_time, end_time, max_capacity)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(service_id)
        .bind(start_time)
        .bind(end_time)
        .bind(max_capacity)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Generate weekday slots over a date range at a fixed duration.
    ///
    /// For each weekday between `start_date` and `end_date` inclusive, slots
    /// of `duration_minutes` are laid back-to-back between `day_start` and
    /// `day_end`; a trailing window shorter than the duration is skipped.
    pub async fn generate_for_range(
        service_id: ServiceId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        day_start: NaiveTime,
        day_end: NaiveTime,
        duration_minutes: i32,
        max_capacity: i32,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let step = Duration::minutes(i64::from(duration_minutes));
        let mut slots = Vec::new();

        let mut date = start_date;
        while date <= end_date {
            // Monday = 0 .. Friday = 4
            if date.weekday().num_days_from_monday() < 5 {
                let mut cursor = date.and_time(day_start).and_utc();
                let day_close = date.and_time(day_end).and_utc();

                while cursor + step <= day_close {
                    let slot = Self::create(service_id, cursor, cursor + step, max_capacity, pool)
                        .await?;
                    slots.push(slot);
                    cursor = cursor + step;
                }
            }
            date = date + Duration::days(1);
        }

        Ok(slots)
    }

    /// Find slot by ID
    pub async fn find_by_id(id: TimeSlotId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM time_slots WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Load a slot inside an open transaction, locking the row.
    pub async fn find_for_update(id: TimeSlotId, conn: &mut PgConnection) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM time_slots WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(Into::into)
    }

    /// Available slots of a service on one calendar day, in start order.
    pub async fn find_available_for_day(
        service_id: ServiceId,
        day: NaiveDate,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let start_of_day = day.and_time(NaiveTime::MIN).and_utc();
        let end_of_day = start_of_day + Duration::days(1);

        sqlx::query_as::<_, Self>(
            "SELECT * FROM time_slots
             WHERE service_id = $1
               AND start_time >= $2
               AND start_time < $3
               AND available = true
             ORDER BY start_time",
        )
        .bind(service_id)
        .bind(start_of_day)
        .bind(end_of_day)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Close every slot of a service for new bookings. Counters are left
    /// untouched; the cancellation cascade has already drained them for
    /// future slots.
    pub async fn close_all_for_service(
        service_id: ServiceId,
        conn: &mut PgConnection,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE time_slots SET available = false, updated_at = NOW() WHERE service_id = $1",
        )
        .bind(service_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Recompute availability from the untouched counters when a service is
    /// reactivated. Nothing else is re-opened.
    pub async fn reopen_for_service(service_id: ServiceId, conn: &mut PgConnection) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE time_slots
             SET available = current_bookings < max_capacity, updated_at = NOW()
             WHERE service_id = $1",
        )
        .bind(service_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}
