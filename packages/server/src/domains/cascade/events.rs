use serde::{Deserialize, Serialize};

use crate::common::{
    AppointmentId, DepartmentId, DocumentId, FeedbackId, ServiceId, TimeSlotId, UserId,
};
use crate::domains::appointments::models::AppointmentStatus;

/// Domain events - FACT EVENTS ONLY
///
/// Immutable facts about committed state changes, published to the outbound
/// dispatcher after the triggering transaction commits. Errors go in
/// `Result::Err`, not in events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A user's activity flag changed (cascade trigger).
    UserActivityChanged { user_id: UserId, active: bool },

    /// A department's activity flag changed (cascade trigger).
    DepartmentActivityChanged {
        department_id: DepartmentId,
        active: bool,
    },

    /// A service's activity flag changed (cascade trigger).
    ServiceActivityChanged { service_id: ServiceId, active: bool },

    /// An appointment was booked.
    AppointmentCreated {
        appointment_id: AppointmentId,
        user_id: UserId,
        service_id: ServiceId,
        time_slot_id: TimeSlotId,
        booking_reference: String,
    },

    /// An appointment moved through its state machine (direct request,
    /// document gate, or cascade cancellation).
    AppointmentStatusChanged {
        appointment_id: AppointmentId,
        user_id: UserId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    /// An appointment moved to a different time slot.
    AppointmentRescheduled {
        appointment_id: AppointmentId,
        user_id: UserId,
        from_time_slot_id: TimeSlotId,
        to_time_slot_id: TimeSlotId,
    },

    /// A document's verification state changed.
    DocumentVerificationChanged {
        document_id: DocumentId,
        user_id: UserId,
        verified: bool,
    },

    /// A user's unread notifications were bulk-marked read (deactivation
    /// cascade); one summary event, not one per row.
    NotificationsMarkedRead { user_id: UserId, count: u64 },

    /// Feedback was submitted on a completed appointment.
    FeedbackSubmitted {
        feedback_id: FeedbackId,
        appointment_id: AppointmentId,
        rating: i32,
    },
}
