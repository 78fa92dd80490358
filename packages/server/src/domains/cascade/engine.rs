//! BookingEngine - the cascade orchestrator.
//!
//! Every public method is one triggering event: it opens a transaction,
//! applies the full reaction through the named handlers, appends the audit
//! trail, commits, and only then hands the fact events to the outbound
//! dispatcher. A failure anywhere rolls the whole event back; partial
//! cascades are never observable.

use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::common::{
    AppointmentId, DepartmentId, DocumentId, EngineError, EngineResult, EntityKind,
    NotificationId, ServiceId, TimeSlotId, UserId,
};
use crate::domains::appointments::machine::{self, CapacityEffect, Decision};
use crate::domains::appointments::models::{Appointment, AppointmentStatus};
use crate::domains::appointments::reference;
use crate::domains::audit::models::{actions, AuditLog};
use crate::domains::catalog::models::Service;
use crate::domains::departments::models::Department;
use crate::domains::documents::gate;
use crate::domains::documents::models::Document;
use crate::domains::feedback::models::Feedback;
use crate::domains::identity::models::User;
use crate::domains::notifications::models::{Notification, NotificationKind};
use crate::domains::scheduling::{capacity, models::TimeSlot};
use crate::kernel::{BaseNotificationDispatcher, ServerKernel};

use super::events::DomainEvent;
use super::handlers::{self, CascadeCtx};

/// The engine the API layer talks to.
pub struct BookingEngine {
    pool: PgPool,
    dispatcher: Arc<dyn BaseNotificationDispatcher>,
}

impl BookingEngine {
    pub fn new(pool: PgPool, dispatcher: Arc<dyn BaseNotificationDispatcher>) -> Self {
        Self { pool, dispatcher }
    }

    pub fn from_kernel(kernel: &ServerKernel) -> Self {
        Self::new(kernel.db_pool.clone(), kernel.dispatcher.clone())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    /// Book an appointment: reserve the slot, insert the pending
    /// appointment, audit, and queue the confirmation notification.
    pub async fn create_appointment(
        &self,
        user_id: UserId,
        service_id: ServiceId,
        time_slot_id: TimeSlotId,
        notes: Option<&str>,
    ) -> EngineResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        let user = User::find_on(user_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::User, user_id))?;
        if !user.active {
            return Err(EngineError::Forbidden("user is deactivated".into()));
        }

        let service = Service::find_on(service_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Service, service_id))?;
        if !service.active {
            return Err(EngineError::ServiceInactive);
        }

        let slot = TimeSlot::find_for_update(time_slot_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::TimeSlot, time_slot_id))?;
        if slot.service_id != service_id {
            // A slot of some other service is as good as missing.
            return Err(EngineError::not_found(EntityKind::TimeSlot, time_slot_id));
        }
        // A closed slot (service deactivation) is unavailable; a merely full
        // one falls through to the counter guard and reports SlotFull.
        if !slot.available && slot.current_bookings < slot.max_capacity {
            return Err(EngineError::SlotUnavailable);
        }

        if Appointment::holding_exists_for_user_slot(user_id, time_slot_id, &mut *tx).await? {
            return Err(EngineError::DuplicateBooking);
        }

        capacity::reserve(time_slot_id, &mut *tx).await?;

        let appointment_id = AppointmentId::new();
        let booking_reference = reference::generate_booking_reference();
        let qr_code = reference::generate_qr_payload(&booking_reference, appointment_id);
        let appointment = Appointment::create(
            appointment_id,
            user_id,
            service_id,
            time_slot_id,
            &booking_reference,
            &qr_code,
            notes,
            &mut *tx,
        )
        .await?;

        AuditLog::record(
            Some(user_id),
            actions::APPOINTMENT_CREATED,
            EntityKind::Appointment,
            appointment.id,
            None,
            Some(json!({
                "service_id": service_id,
                "time_slot_id": time_slot_id,
                "status": appointment.status,
                "booking_reference": booking_reference,
            })),
            &mut *tx,
        )
        .await?;

        Notification::create(
            user_id,
            NotificationKind::AppointmentConfirmation,
            "Appointment Booked",
            &format!(
                "Your appointment for {} is booked. Reference: {}",
                service.name, booking_reference
            ),
            &mut *tx,
        )
        .await?;

        tx.commit().await?;

        info!(
            appointment_id = %appointment.id,
            booking_reference = %appointment.booking_reference,
            "appointment created"
        );
        self.publish(vec![DomainEvent::AppointmentCreated {
            appointment_id: appointment.id,
            user_id,
            service_id,
            time_slot_id,
            booking_reference: appointment.booking_reference.clone(),
        }])
        .await;

        Ok(appointment)
    }

    /// Drive one appointment transition on behalf of an actor.
    ///
    /// Requesting the current status is a no-op success with no audit
    /// record. `documents_verified` is never a valid external target; the
    /// document gate owns that promotion.
    pub async fn transition_appointment(
        &self,
        appointment_id: AppointmentId,
        target: AppointmentStatus,
        actor_id: UserId,
    ) -> EngineResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        let actor = User::find_on(actor_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::User, actor_id))?;

        let appointment = Appointment::find_for_update(appointment_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Appointment, appointment_id))?;

        if appointment.status == target {
            // Idempotent re-request.
            tx.commit().await?;
            return Ok(appointment);
        }

        if target == AppointmentStatus::DocumentsVerified {
            return Err(EngineError::InvalidTransition {
                from: appointment.status.to_string(),
                to: target.to_string(),
            });
        }

        match target {
            AppointmentStatus::Cancelled => {
                if actor.id != appointment.user_id && !actor.role.is_staff() {
                    return Err(EngineError::Forbidden(
                        "only the booking citizen or staff may cancel".into(),
                    ));
                }
            }
            _ => {
                if !actor.role.is_staff() {
                    return Err(EngineError::Forbidden(
                        "officer or admin role required".into(),
                    ));
                }
            }
        }

        let decision = machine::decide(appointment.status, target)?;
        let updated = match decision {
            Decision::Noop => unreachable!("same-status handled above"),
            Decision::Apply(effect) => {
                if effect == CapacityEffect::Release {
                    capacity::release(appointment.time_slot_id, &mut *tx).await?;
                }
                Appointment::update_status(appointment_id, target, &mut *tx).await?
            }
        };

        AuditLog::record(
            Some(actor_id),
            actions::APPOINTMENT_STATUS_CHANGED,
            EntityKind::Appointment,
            appointment_id,
            Some(json!({ "status": appointment.status })),
            Some(json!({ "status": updated.status })),
            &mut *tx,
        )
        .await?;

        let (title, body) = status_notification_text(&updated);
        Notification::create(
            appointment.user_id,
            NotificationKind::StatusUpdate,
            title,
            &body,
            &mut *tx,
        )
        .await?;

        tx.commit().await?;

        self.publish(vec![DomainEvent::AppointmentStatusChanged {
            appointment_id,
            user_id: appointment.user_id,
            from: appointment.status,
            to: updated.status,
        }])
        .await;

        Ok(updated)
    }

    /// Move a held appointment to another slot of the same service:
    /// release the old unit, reserve the new one, reset to pending.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: AppointmentId,
        new_time_slot_id: TimeSlotId,
        actor_id: UserId,
    ) -> EngineResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        let actor = User::find_on(actor_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::User, actor_id))?;

        let appointment = Appointment::find_for_update(appointment_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Appointment, appointment_id))?;

        if actor.id != appointment.user_id && !actor.role.is_staff() {
            return Err(EngineError::Forbidden(
                "only the booking citizen or staff may reschedule".into(),
            ));
        }

        if !matches!(
            appointment.status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        ) {
            return Err(EngineError::InvalidTransition {
                from: appointment.status.to_string(),
                to: AppointmentStatus::Pending.to_string(),
            });
        }

        let new_slot = TimeSlot::find_for_update(new_time_slot_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::TimeSlot, new_time_slot_id))?;
        if new_slot.service_id != appointment.service_id {
            return Err(EngineError::not_found(EntityKind::TimeSlot, new_time_slot_id));
        }
        if !new_slot.available && new_slot.current_bookings < new_slot.max_capacity {
            return Err(EngineError::SlotUnavailable);
        }

        capacity::release(appointment.time_slot_id, &mut *tx).await?;
        capacity::reserve(new_time_slot_id, &mut *tx).await?;
        let updated = Appointment::move_to_slot(appointment_id, new_time_slot_id, &mut *tx).await?;

        AuditLog::record(
            Some(actor_id),
            actions::APPOINTMENT_RESCHEDULED,
            EntityKind::Appointment,
            appointment_id,
            Some(json!({
                "time_slot_id": appointment.time_slot_id,
                "status": appointment.status,
            })),
            Some(json!({
                "time_slot_id": updated.time_slot_id,
                "status": updated.status,
            })),
            &mut *tx,
        )
        .await?;

        Notification::create(
            appointment.user_id,
            NotificationKind::StatusUpdate,
            "Appointment Rescheduled",
            &format!(
                "Your appointment {} has been moved to a new time slot.",
                updated.booking_reference
            ),
            &mut *tx,
        )
        .await?;

        tx.commit().await?;

        self.publish(vec![DomainEvent::AppointmentRescheduled {
            appointment_id,
            user_id: appointment.user_id,
            from_time_slot_id: appointment.time_slot_id,
            to_time_slot_id: new_time_slot_id,
        }])
        .await;

        Ok(updated)
    }

    // =========================================================================
    // Activation cascades
    // =========================================================================

    /// Flip a user's activity flag and run the full cascade: officer role,
    /// held appointments, unread notifications.
    pub async fn set_user_active(
        &self,
        user_id: UserId,
        active: bool,
        actor_id: UserId,
    ) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;
        self.require_staff(actor_id, &mut *tx).await?;

        let user = User::find_for_update(user_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::User, user_id))?;
        if user.active == active {
            return Ok(());
        }

        let mut ctx = CascadeCtx::new(Some(actor_id));
        handlers::handle_user_active_changed(&user, active, &mut *tx, &mut ctx).await?;

        tx.commit().await?;
        self.publish(ctx.into_events()).await;
        Ok(())
    }

    /// Flip a department's activity flag and run the full cascade:
    /// services (recursively), officer roles, and their appointments.
    pub async fn set_department_active(
        &self,
        department_id: DepartmentId,
        active: bool,
        actor_id: UserId,
    ) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;
        self.require_staff(actor_id, &mut *tx).await?;

        let department = Department::find_for_update(department_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Department, department_id))?;
        if department.active == active {
            return Ok(());
        }

        let mut ctx = CascadeCtx::new(Some(actor_id));
        handlers::handle_department_active_changed(&department, active, &mut *tx, &mut ctx).await?;

        tx.commit().await?;
        self.publish(ctx.into_events()).await;
        Ok(())
    }

    /// Flip a service's activity flag and run the full cascade: held
    /// appointments cancelled, slots closed (or availability recomputed).
    pub async fn set_service_active(
        &self,
        service_id: ServiceId,
        active: bool,
        actor_id: UserId,
    ) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;
        self.require_staff(actor_id, &mut *tx).await?;

        let service = Service::find_for_update(service_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Service, service_id))?;
        if service.active == active {
            return Ok(());
        }

        let mut ctx = CascadeCtx::new(Some(actor_id));
        handlers::handle_service_active_changed(&service, active, &mut *tx, &mut ctx).await?;

        tx.commit().await?;
        self.publish(ctx.into_events()).await;
        Ok(())
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Verify a document and run the promotion gate over its appointment.
    pub async fn verify_document(
        &self,
        document_id: DocumentId,
        actor_id: UserId,
        notes: Option<&str>,
    ) -> EngineResult<Document> {
        let mut tx = self.pool.begin().await?;
        self.require_staff(actor_id, &mut *tx).await?;

        let document = Document::find_for_update(document_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Document, document_id))?;
        if document.verified {
            return Err(EngineError::AlreadyVerified);
        }

        let updated = Document::set_verification(document_id, true, notes, &mut *tx).await?;
        AuditLog::record(
            Some(actor_id),
            actions::DOCUMENT_VERIFICATION_CHANGED,
            EntityKind::Document,
            document_id,
            Some(json!({ "verified": false })),
            Some(json!({ "verified": true })),
            &mut *tx,
        )
        .await?;

        let mut events = vec![DomainEvent::DocumentVerificationChanged {
            document_id,
            user_id: updated.user_id,
            verified: true,
        }];

        if let Some(promotion) = gate::on_document_verified(&updated, &mut *tx).await? {
            AuditLog::record(
                Some(actor_id),
                actions::APPOINTMENT_STATUS_CHANGED,
                EntityKind::Appointment,
                promotion.after.id,
                Some(json!({ "status": promotion.before.status })),
                Some(json!({ "status": promotion.after.status })),
                &mut *tx,
            )
            .await?;

            Notification::create(
                promotion.after.user_id,
                NotificationKind::StatusUpdate,
                "Documents Verified",
                &format!(
                    "All required documents for appointment {} are verified.",
                    promotion.after.booking_reference
                ),
                &mut *tx,
            )
            .await?;

            events.push(DomainEvent::AppointmentStatusChanged {
                appointment_id: promotion.after.id,
                user_id: promotion.after.user_id,
                from: promotion.before.status,
                to: promotion.after.status,
            });
        }

        tx.commit().await?;
        self.publish(events).await;
        Ok(updated)
    }

    /// Reject a document (verification notes carry the reason) and ask the
    /// citizen to re-submit. Does not demote an already-promoted
    /// appointment.
    pub async fn reject_document(
        &self,
        document_id: DocumentId,
        actor_id: UserId,
        notes: &str,
    ) -> EngineResult<Document> {
        let mut tx = self.pool.begin().await?;
        self.require_staff(actor_id, &mut *tx).await?;

        let document = Document::find_for_update(document_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Document, document_id))?;

        let updated = Document::set_verification(document_id, false, Some(notes), &mut *tx).await?;
        AuditLog::record(
            Some(actor_id),
            actions::DOCUMENT_VERIFICATION_CHANGED,
            EntityKind::Document,
            document_id,
            Some(json!({ "verified": document.verified })),
            Some(json!({ "verified": false })),
            &mut *tx,
        )
        .await?;

        Notification::create(
            document.user_id,
            NotificationKind::DocumentRequest,
            "Document Rejected",
            &format!(
                "Your {} document was rejected: {}. Please upload a new copy.",
                document.document_type, notes
            ),
            &mut *tx,
        )
        .await?;

        tx.commit().await?;
        self.publish(vec![DomainEvent::DocumentVerificationChanged {
            document_id,
            user_id: updated.user_id,
            verified: false,
        }])
        .await;
        Ok(updated)
    }

    // =========================================================================
    // Notifications / feedback
    // =========================================================================

    /// Mark one notification read. Owner-only; already-read is a no-op.
    pub async fn mark_notification_read(
        &self,
        notification_id: NotificationId,
        actor_id: UserId,
    ) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;

        let notification = Notification::find_for_update(notification_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Notification, notification_id))?;
        if notification.user_id != actor_id {
            return Err(EngineError::Forbidden(
                "notifications can only be read by their owner".into(),
            ));
        }
        if notification.read {
            return Ok(());
        }

        Notification::mark_read(notification_id, &mut *tx).await?;
        AuditLog::record(
            Some(actor_id),
            actions::NOTIFICATION_READ,
            EntityKind::Notification,
            notification_id,
            Some(json!({ "read": false })),
            Some(json!({ "read": true })),
            &mut *tx,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Submit feedback on the caller's own completed appointment.
    pub async fn submit_feedback(
        &self,
        appointment_id: AppointmentId,
        actor_id: UserId,
        rating: i32,
        comment: Option<&str>,
    ) -> EngineResult<Feedback> {
        if !(1..=5).contains(&rating) {
            return Err(EngineError::InvalidRating);
        }

        let mut tx = self.pool.begin().await?;

        let appointment = Appointment::find_for_update(appointment_id, &mut *tx)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Appointment, appointment_id))?;
        if appointment.user_id != actor_id {
            return Err(EngineError::Forbidden(
                "feedback is limited to your own appointments".into(),
            ));
        }
        if appointment.status != AppointmentStatus::Completed {
            return Err(EngineError::AppointmentNotCompleted);
        }
        if Feedback::exists_for_appointment(appointment_id, &mut *tx).await? {
            return Err(EngineError::AlreadySubmitted);
        }

        let feedback =
            Feedback::create(actor_id, appointment_id, rating, comment, &mut *tx).await?;
        AuditLog::record(
            Some(actor_id),
            actions::FEEDBACK_CREATED,
            EntityKind::Feedback,
            feedback.id,
            None,
            Some(json!({ "appointment_id": appointment_id, "rating": rating })),
            &mut *tx,
        )
        .await?;

        tx.commit().await?;
        self.publish(vec![DomainEvent::FeedbackSubmitted {
            feedback_id: feedback.id,
            appointment_id,
            rating,
        }])
        .await;
        Ok(feedback)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Resolve the actor and require officer/admin role.
    async fn require_staff(
        &self,
        actor_id: UserId,
        conn: &mut sqlx::PgConnection,
    ) -> EngineResult<User> {
        let actor = User::find_on(actor_id, conn)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::User, actor_id))?;
        if !actor.role.is_staff() {
            return Err(EngineError::Forbidden(
                "officer or admin role required".into(),
            ));
        }
        Ok(actor)
    }

    /// Post-commit, best-effort event fan-out. Delivery failures are
    /// logged; they never fail the committed operation.
    async fn publish(&self, events: Vec<DomainEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(err) = self.dispatcher.publish_all(&events).await {
            warn!(error = %err, "event dispatch failed; delivery is best-effort");
        }
    }
}

/// In-app notification copy for a direct status change.
fn status_notification_text(appointment: &Appointment) -> (&'static str, String) {
    let reference = &appointment.booking_reference;
    match appointment.status {
        AppointmentStatus::Confirmed => (
            "Appointment Confirmed",
            format!("Your appointment {reference} has been confirmed."),
        ),
        AppointmentStatus::Completed => (
            "Appointment Completed",
            format!("Your appointment {reference} is complete. Thank you."),
        ),
        AppointmentStatus::Cancelled => (
            "Appointment Cancelled",
            format!("Your appointment {reference} has been cancelled."),
        ),
        AppointmentStatus::NoShow => (
            "Appointment Marked No-Show",
            format!("You missed appointment {reference}. Please book a new time."),
        ),
        AppointmentStatus::Pending | AppointmentStatus::DocumentsVerified => (
            "Appointment Update",
            format!("Your appointment {reference} was updated."),
        ),
    }
}
