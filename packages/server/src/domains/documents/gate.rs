//! Document verification gate.
//!
//! Watches individual document verifications and promotes the owning
//! appointment to documents-verified once every required type is covered.
//! This is the only path that produces the documents-verified status.

use anyhow::Result;
use sqlx::PgConnection;
use tracing::debug;

use crate::domains::appointments::machine::{self, Decision};
use crate::domains::appointments::models::{Appointment, AppointmentStatus};
use crate::domains::catalog::models::Service;
use crate::domains::documents::models::Document;

/// A promotion performed by the gate: the appointment before and after.
pub struct Promotion {
    pub before: Appointment,
    pub after: Appointment,
}

/// React to one document becoming verified.
///
/// Returns the promotion if the gate fired. No-ops: document not linked to
/// an appointment, appointment past `confirmed`, service without a
/// required-documents configuration, or required types still uncovered.
pub async fn on_document_verified(
    document: &Document,
    conn: &mut PgConnection,
) -> Result<Option<Promotion>> {
    let Some(appointment_id) = document.appointment_id else {
        return Ok(None);
    };

    let Some(appointment) = Appointment::find_for_update(appointment_id, conn).await? else {
        // Linked appointment deleted out from under us; nothing to promote.
        return Ok(None);
    };

    if !matches!(
        appointment.status,
        AppointmentStatus::Pending | AppointmentStatus::Confirmed
    ) {
        return Ok(None);
    }

    let Some(required) = Service::required_document_types(appointment.service_id, conn).await?
    else {
        return Ok(None);
    };
    if required.is_empty() {
        return Ok(None);
    }

    for document_type in &required {
        if !Document::type_covered(appointment.user_id, appointment.id, document_type, conn).await?
        {
            debug!(
                appointment_id = %appointment.id,
                document_type = %document_type,
                "document gate: required type not yet covered"
            );
            return Ok(None);
        }
    }

    // Machine still arbitrates the promotion; the match above guarantees it
    // accepts.
    let decision = machine::decide(appointment.status, AppointmentStatus::DocumentsVerified)?;
    debug_assert!(matches!(decision, Decision::Apply(_)));

    let after =
        Appointment::update_status(appointment.id, AppointmentStatus::DocumentsVerified, conn)
            .await?;

    Ok(Some(Promotion {
        before: appointment,
        after,
    }))
}
