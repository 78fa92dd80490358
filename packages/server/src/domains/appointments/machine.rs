//! Appointment state machine - pure decision logic
//!
//! Validates a requested status change and names the capacity side effect
//! the caller must apply. No I/O here: the engine loads the appointment,
//! asks for a decision, then executes it inside its transaction.

use crate::common::{EngineError, EngineResult};
use crate::domains::appointments::models::AppointmentStatus;

/// Capacity side effect of an accepted transition.
///
/// Reservation happens exactly once, at appointment creation; no transition
/// ever re-reserves. Completion keeps its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityEffect {
    /// No counter change.
    Keep,
    /// Return one unit to the time slot.
    Release,
}

/// Outcome of validating a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Requested status equals the current one: succeed without side
    /// effects and without an audit record.
    Noop,
    /// Apply the transition with the named capacity effect.
    Apply(CapacityEffect),
}

/// Validate `from -> to`.
///
/// `documents_verified` is accepted here because the document gate routes
/// through this same table; the engine rejects it earlier for external
/// callers.
pub fn decide(from: AppointmentStatus, to: AppointmentStatus) -> EngineResult<Decision> {
    use AppointmentStatus::*;

    if from == to {
        return Ok(Decision::Noop);
    }

    let effect = match (from, to) {
        (Pending, Confirmed) => CapacityEffect::Keep,
        (Pending | Confirmed, DocumentsVerified) => CapacityEffect::Keep,
        (Pending | Confirmed | DocumentsVerified, Cancelled) => CapacityEffect::Release,
        (Pending | Confirmed, NoShow) => CapacityEffect::Release,
        (Confirmed | DocumentsVerified, Completed) => CapacityEffect::Keep,
        _ => {
            return Err(EngineError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    };

    Ok(Decision::Apply(effect))
}
