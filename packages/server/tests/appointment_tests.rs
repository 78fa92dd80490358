//! Integration tests for appointment booking and the status state machine.

mod common;

use crate::common::{
    create_admin, create_citizen, create_department, create_service, create_slot, TestHarness,
};
use server_core::common::{EngineError, EntityKind};
use server_core::domains::appointments::models::{Appointment, AppointmentStatus};
use server_core::domains::audit::models::{actions, AuditLog};
use server_core::domains::notifications::models::Notification;
use server_core::domains::scheduling::models::TimeSlot;
use test_context::test_context;

/// Booking produces a pending appointment with a reference, a QR payload,
/// an audit record, and an in-app confirmation notification.
#[test_context(TestHarness)]
#[tokio::test]
async fn create_appointment_books_and_audits(ctx: &TestHarness) {
    let engine = ctx.engine();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, 1).await.unwrap();
    let user = create_citizen(&ctx.db_pool).await.unwrap();

    let appointment = engine
        .create_appointment(user.id, service.id, slot.id, Some("first visit"))
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert!(appointment.booking_reference.starts_with("SL"));
    let qr = appointment.qr_code.as_deref().unwrap();
    assert!(qr.starts_with("SL-GOV-"));
    assert!(qr.contains(&appointment.booking_reference));

    let found = Appointment::find_by_reference(&appointment.booking_reference, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, appointment.id);

    let trail = AuditLog::find_by_entity(EntityKind::Appointment, appointment.id, &ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, actions::APPOINTMENT_CREATED);
    assert_eq!(trail[0].user_id, Some(user.id));

    let notifications = Notification::find_by_user(user.id, true, &ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
}

/// Booking against an inactive service fails with ServiceInactive and
/// leaves no trace.
#[test_context(TestHarness)]
#[tokio::test]
async fn create_appointment_rejects_inactive_service(ctx: &TestHarness) {
    let engine = ctx.engine();
    let admin = create_admin(&ctx.db_pool).await.unwrap();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, 1).await.unwrap();

    engine
        .set_service_active(service.id, false, admin.id)
        .await
        .unwrap();

    let user = create_citizen(&ctx.db_pool).await.unwrap();
    let err = engine
        .create_appointment(user.id, service.id, slot.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ServiceInactive));

    let reloaded = TimeSlot::find_by_id(slot.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.current_bookings, 0);
}

/// Officer confirmation moves pending to confirmed without touching the
/// counter.
#[test_context(TestHarness)]
#[tokio::test]
async fn officer_confirms_pending_appointment(ctx: &TestHarness) {
    let engine = ctx.engine();
    let admin = create_admin(&ctx.db_pool).await.unwrap();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, 1).await.unwrap();
    let user = create_citizen(&ctx.db_pool).await.unwrap();

    let appointment = engine
        .create_appointment(user.id, service.id, slot.id, None)
        .await
        .unwrap();

    let confirmed = engine
        .transition_appointment(appointment.id, AppointmentStatus::Confirmed, admin.id)
        .await
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let reloaded = TimeSlot::find_by_id(slot.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.current_bookings, 1);
}

/// A citizen may cancel their own appointment but not confirm it.
#[test_context(TestHarness)]
#[tokio::test]
async fn citizen_authorization_is_enforced(ctx: &TestHarness) {
    let engine = ctx.engine();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, 2).await.unwrap();
    let owner = create_citizen(&ctx.db_pool).await.unwrap();
    let stranger = create_citizen(&ctx.db_pool).await.unwrap();

    let appointment = engine
        .create_appointment(owner.id, service.id, slot.id, None)
        .await
        .unwrap();

    let err = engine
        .transition_appointment(appointment.id, AppointmentStatus::Confirmed, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .transition_appointment(appointment.id, AppointmentStatus::Cancelled, stranger.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .transition_appointment(appointment.id, AppointmentStatus::Cancelled, owner.id)
        .await
        .unwrap();
}

/// documents_verified cannot be requested externally, even by staff.
#[test_context(TestHarness)]
#[tokio::test]
async fn documents_verified_is_gate_only(ctx: &TestHarness) {
    let engine = ctx.engine();
    let admin = create_admin(&ctx.db_pool).await.unwrap();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &["ID"]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, 1).await.unwrap();
    let user = create_citizen(&ctx.db_pool).await.unwrap();

    let appointment = engine
        .create_appointment(user.id, service.id, slot.id, None)
        .await
        .unwrap();

    let err = engine
        .transition_appointment(
            appointment.id,
            AppointmentStatus::DocumentsVerified,
            admin.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

/// Invalid transitions fail without side effects.
#[test_context(TestHarness)]
#[tokio::test]
async fn invalid_transition_has_no_side_effects(ctx: &TestHarness) {
    let engine = ctx.engine();
    let admin = create_admin(&ctx.db_pool).await.unwrap();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, 1).await.unwrap();
    let user = create_citizen(&ctx.db_pool).await.unwrap();

    let appointment = engine
        .create_appointment(user.id, service.id, slot.id, None)
        .await
        .unwrap();

    // pending -> completed skips confirmation
    let err = engine
        .transition_appointment(appointment.id, AppointmentStatus::Completed, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    let reloaded = Appointment::find_by_id(appointment.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, AppointmentStatus::Pending);

    let trail = AuditLog::find_by_entity(EntityKind::Appointment, appointment.id, &ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(trail.len(), 1, "only the creation record should exist");
}

/// Re-requesting the current status succeeds without a second audit record.
#[test_context(TestHarness)]
#[tokio::test]
async fn idempotent_retransition_adds_no_audit_record(ctx: &TestHarness) {
    let engine = ctx.engine();
    let admin = create_admin(&ctx.db_pool).await.unwrap();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, 1).await.unwrap();
    let user = create_citizen(&ctx.db_pool).await.unwrap();

    let appointment = engine
        .create_appointment(user.id, service.id, slot.id, None)
        .await
        .unwrap();
    engine
        .transition_appointment(appointment.id, AppointmentStatus::Confirmed, admin.id)
        .await
        .unwrap();

    let before = AuditLog::find_by_entity(EntityKind::Appointment, appointment.id, &ctx.db_pool)
        .await
        .unwrap()
        .len();

    let again = engine
        .transition_appointment(appointment.id, AppointmentStatus::Confirmed, admin.id)
        .await
        .unwrap();
    assert_eq!(again.status, AppointmentStatus::Confirmed);

    let after = AuditLog::find_by_entity(EntityKind::Appointment, appointment.id, &ctx.db_pool)
        .await
        .unwrap()
        .len();
    assert_eq!(before, after);
}

/// No-show releases the unit; completion keeps it for historical accuracy.
#[test_context(TestHarness)]
#[tokio::test]
async fn no_show_releases_but_completion_keeps_capacity(ctx: &TestHarness) {
    let engine = ctx.engine();
    let admin = create_admin(&ctx.db_pool).await.unwrap();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let user_a = create_citizen(&ctx.db_pool).await.unwrap();
    let user_b = create_citizen(&ctx.db_pool).await.unwrap();

    // No-show path
    let slot_a = create_slot(&ctx.db_pool, &service, 1).await.unwrap();
    let missed = engine
        .create_appointment(user_a.id, service.id, slot_a.id, None)
        .await
        .unwrap();
    engine
        .transition_appointment(missed.id, AppointmentStatus::NoShow, admin.id)
        .await
        .unwrap();
    let reloaded = TimeSlot::find_by_id(slot_a.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.current_bookings, 0);
    assert!(reloaded.available);

    // Completion path
    let slot_b = create_slot(&ctx.db_pool, &service, 1).await.unwrap();
    let kept = engine
        .create_appointment(user_b.id, service.id, slot_b.id, None)
        .await
        .unwrap();
    engine
        .transition_appointment(kept.id, AppointmentStatus::Confirmed, admin.id)
        .await
        .unwrap();
    engine
        .transition_appointment(kept.id, AppointmentStatus::Completed, admin.id)
        .await
        .unwrap();
    let reloaded = TimeSlot::find_by_id(slot_b.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.current_bookings, 1);
    assert!(!reloaded.available);
}

/// Rescheduling moves the unit between slots and resets to pending.
#[test_context(TestHarness)]
#[tokio::test]
async fn reschedule_moves_capacity_between_slots(ctx: &TestHarness) {
    let engine = ctx.engine();
    let admin = create_admin(&ctx.db_pool).await.unwrap();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let old_slot = create_slot(&ctx.db_pool, &service, 1).await.unwrap();
    let new_slot = create_slot(&ctx.db_pool, &service, 1).await.unwrap();
    let user = create_citizen(&ctx.db_pool).await.unwrap();

    let appointment = engine
        .create_appointment(user.id, service.id, old_slot.id, None)
        .await
        .unwrap();
    engine
        .transition_appointment(appointment.id, AppointmentStatus::Confirmed, admin.id)
        .await
        .unwrap();

    let moved = engine
        .reschedule_appointment(appointment.id, new_slot.id, user.id)
        .await
        .unwrap();
    assert_eq!(moved.status, AppointmentStatus::Pending);
    assert_eq!(moved.time_slot_id, new_slot.id);

    let old_reloaded = TimeSlot::find_by_id(old_slot.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    let new_reloaded = TimeSlot::find_by_id(new_slot.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(old_reloaded.current_bookings, 0);
    assert!(old_reloaded.available);
    assert_eq!(new_reloaded.current_bookings, 1);
    assert!(!new_reloaded.available);
}
