//! Time-slot capacity accounting.
//!
//! The single owner of `current_bookings`. Both operations are one guarded
//! UPDATE on the caller's open transaction; Postgres row locking linearizes
//! concurrent callers, so at most `max_capacity` reservations ever succeed
//! against one slot. No other code path may write this column.

use sqlx::PgConnection;
use tracing::error;

use crate::common::{EngineError, EngineResult, EntityKind, TimeSlotId};
use crate::domains::scheduling::models::TimeSlot;

/// Atomically take one unit of slot capacity.
///
/// Fails with `SlotFull` when the slot is at capacity, `NotFound` when the
/// slot does not exist. Participates in the caller's transaction: a later
/// rollback also returns the unit.
pub async fn reserve(slot_id: TimeSlotId, conn: &mut PgConnection) -> EngineResult<TimeSlot> {
    let updated = sqlx::query_as::<_, TimeSlot>(
        "UPDATE time_slots
         SET current_bookings = current_bookings + 1,
             available = current_bookings + 1 < max_capacity,
             updated_at = NOW()
         WHERE id = $1 AND current_bookings < max_capacity
         RETURNING *",
    )
    .bind(slot_id)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(slot) => Ok(slot),
        None => {
            // Guard rejected: full slot or missing row.
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM time_slots WHERE id = $1)",
            )
            .bind(slot_id)
            .fetch_one(&mut *conn)
            .await?;

            if exists {
                Err(EngineError::SlotFull)
            } else {
                Err(EngineError::not_found(EntityKind::TimeSlot, slot_id))
            }
        }
    }
}

/// Atomically return one unit of slot capacity.
///
/// A release that would drive the counter negative is an invariant
/// violation: it aborts the transaction as an internal error instead of
/// being clamped.
pub async fn release(slot_id: TimeSlotId, conn: &mut PgConnection) -> EngineResult<TimeSlot> {
    let updated = sqlx::query_as::<_, TimeSlot>(
        "UPDATE time_slots
         SET current_bookings = current_bookings - 1,
             available = current_bookings - 1 < max_capacity,
             updated_at = NOW()
         WHERE id = $1 AND current_bookings > 0
         RETURNING *",
    )
    .bind(slot_id)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(slot) => Ok(slot),
        None => {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM time_slots WHERE id = $1)",
            )
            .bind(slot_id)
            .fetch_one(&mut *conn)
            .await?;

            if exists {
                error!(slot_id = %slot_id, "capacity underflow: release on empty slot");
                Err(EngineError::Internal(anyhow::anyhow!(
                    "capacity underflow on time slot {slot_id}"
                )))
            } else {
                Err(EngineError::not_found(EntityKind::TimeSlot, slot_id))
            }
        }
    }
}
