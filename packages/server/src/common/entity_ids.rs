//! Typed ID definitions for all domain entities.
//!
//! One marker struct + alias per entity. The compiler rejects any mix-up
//! between, say, an `AppointmentId` and the `TimeSlotId` it books.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for User entities (citizens, officers, admins).
pub struct User;

/// Marker type for OfficerRole entities (a user's posting in a department).
pub struct OfficerRole;

/// Marker type for Department entities.
pub struct Department;

/// Marker type for Service entities (a bookable government service).
pub struct Service;

/// Marker type for TimeSlot entities.
pub struct TimeSlot;

/// Marker type for Appointment entities.
pub struct Appointment;

/// Marker type for Document entities.
pub struct Document;

/// Marker type for Notification entities.
pub struct Notification;

/// Marker type for Feedback entities.
pub struct Feedback;

/// Marker type for AuditRecord entities.
pub struct AuditRecord;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for User entities.
pub type UserId = Id<User>;

/// Typed ID for OfficerRole entities.
pub type OfficerRoleId = Id<OfficerRole>;

/// Typed ID for Department entities.
pub type DepartmentId = Id<Department>;

/// Typed ID for Service entities.
pub type ServiceId = Id<Service>;

/// Typed ID for TimeSlot entities.
pub type TimeSlotId = Id<TimeSlot>;

/// Typed ID for Appointment entities.
pub type AppointmentId = Id<Appointment>;

/// Typed ID for Document entities.
pub type DocumentId = Id<Document>;

/// Typed ID for Notification entities.
pub type NotificationId = Id<Notification>;

/// Typed ID for Feedback entities.
pub type FeedbackId = Id<Feedback>;

/// Typed ID for AuditRecord entities.
pub type AuditRecordId = Id<AuditRecord>;
