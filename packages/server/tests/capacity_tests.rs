//! Integration tests for time-slot capacity accounting.
//!
//! The booking counter is the one property that must survive concurrency:
//! at most max_capacity reservations ever succeed against a slot.

mod common;

use std::sync::Arc;

use crate::common::{create_citizen, create_department, create_service, create_slot, TestHarness};
use server_core::common::EngineError;
use server_core::domains::appointments::models::AppointmentStatus;
use server_core::domains::scheduling::models::TimeSlot;
use test_context::test_context;

/// Booking a slot to capacity flips availability and rejects the next
/// booking with SlotFull.
#[test_context(TestHarness)]
#[tokio::test]
async fn capacity_limit_is_enforced(ctx: &TestHarness) {
    let engine = ctx.engine();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, 2).await.unwrap();

    for _ in 0..2 {
        let user = create_citizen(&ctx.db_pool).await.unwrap();
        engine
            .create_appointment(user.id, service.id, slot.id, None)
            .await
            .unwrap();
    }

    let reloaded = TimeSlot::find_by_id(slot.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.current_bookings, 2);
    assert!(!reloaded.available);

    let late_user = create_citizen(&ctx.db_pool).await.unwrap();
    let err = engine
        .create_appointment(late_user.id, service.id, slot.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SlotFull));
}

/// max_capacity + k concurrent bookings against one slot succeed exactly
/// max_capacity times; the rest get SlotFull.
#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_bookings_never_oversubscribe(ctx: &TestHarness) {
    const MAX_CAPACITY: i32 = 3;
    const EXTRA: usize = 4;

    let engine = Arc::new(ctx.engine());
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, MAX_CAPACITY).await.unwrap();

    let mut users = Vec::new();
    for _ in 0..(MAX_CAPACITY as usize + EXTRA) {
        users.push(create_citizen(&ctx.db_pool).await.unwrap());
    }

    let mut handles = Vec::new();
    for user in users {
        let engine = engine.clone();
        let service_id = service.id;
        let slot_id = slot.id;
        handles.push(tokio::spawn(async move {
            engine
                .create_appointment(user.id, service_id, slot_id, None)
                .await
        }));
    }

    let mut booked = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => booked += 1,
            Err(EngineError::SlotFull) => rejected += 1,
            Err(other) => panic!("unexpected booking error: {other}"),
        }
    }

    assert_eq!(booked, MAX_CAPACITY);
    assert_eq!(rejected as i32, EXTRA as i32);

    let reloaded = TimeSlot::find_by_id(slot.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.current_bookings, MAX_CAPACITY);
    assert!(!reloaded.available);
}

/// Cancelling one held appointment opens exactly one unit again.
#[test_context(TestHarness)]
#[tokio::test]
async fn cancellation_releases_capacity(ctx: &TestHarness) {
    let engine = ctx.engine();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, 1).await.unwrap();

    let first = create_citizen(&ctx.db_pool).await.unwrap();
    let appointment = engine
        .create_appointment(first.id, service.id, slot.id, None)
        .await
        .unwrap();

    let second = create_citizen(&ctx.db_pool).await.unwrap();
    assert!(engine
        .create_appointment(second.id, service.id, slot.id, None)
        .await
        .is_err());

    engine
        .transition_appointment(appointment.id, AppointmentStatus::Cancelled, first.id)
        .await
        .unwrap();

    let reloaded = TimeSlot::find_by_id(slot.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.current_bookings, 0);
    assert!(reloaded.available);

    // Exactly one unit opened up again.
    engine
        .create_appointment(second.id, service.id, slot.id, None)
        .await
        .unwrap();
    let third = create_citizen(&ctx.db_pool).await.unwrap();
    assert!(engine
        .create_appointment(third.id, service.id, slot.id, None)
        .await
        .is_err());
}

/// A user cannot hold two appointments in the same slot.
#[test_context(TestHarness)]
#[tokio::test]
async fn duplicate_booking_is_rejected(ctx: &TestHarness) {
    let engine = ctx.engine();
    let department = create_department(&ctx.db_pool).await.unwrap();
    let service = create_service(&ctx.db_pool, department.id, &[]).await.unwrap();
    let slot = create_slot(&ctx.db_pool, &service, 5).await.unwrap();

    let user = create_citizen(&ctx.db_pool).await.unwrap();
    engine
        .create_appointment(user.id, service.id, slot.id, None)
        .await
        .unwrap();

    let err = engine
        .create_appointment(user.id, service.id, slot.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateBooking));
}
