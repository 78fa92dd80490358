use thiserror::Error;
use uuid::Uuid;

/// Entity kinds referenced by not-found and audit payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    OfficerRole,
    Department,
    Service,
    TimeSlot,
    Appointment,
    Document,
    Notification,
    Feedback,
}

impl EntityKind {
    /// Table-level name used in audit records and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::OfficerRole => "officer_roles",
            EntityKind::Department => "departments",
            EntityKind::Service => "services",
            EntityKind::TimeSlot => "time_slots",
            EntityKind::Appointment => "appointments",
            EntityKind::Document => "documents",
            EntityKind::Notification => "notifications",
            EntityKind::Feedback => "feedback",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine error taxonomy.
///
/// Validation and not-found errors are returned to the caller with no side
/// effects applied. `Conflict` is retryable: the caller repeats the whole
/// logical operation. `Internal` aborts the transaction and is never
/// silently corrected.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("Invalid appointment transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Time slot is fully booked")]
    SlotFull,

    #[error("Time slot is not accepting bookings")]
    SlotUnavailable,

    #[error("Service is inactive")]
    ServiceInactive,

    #[error("User already holds an appointment in this time slot")]
    DuplicateBooking,

    #[error("Document is already verified")]
    AlreadyVerified,

    #[error("Rating must be between 1 and 5")]
    InvalidRating,

    #[error("Feedback already submitted for this appointment")]
    AlreadySubmitted,

    #[error("Appointment is not completed")]
    AppointmentNotCompleted,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Concurrent modification conflict; retry the operation")]
    Conflict,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(anyhow::Error),
}

impl EngineError {
    pub fn not_found(kind: EntityKind, id: impl Into<Uuid>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True if the caller should retry the whole logical operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict)
    }
}

impl From<sqlx::Error> for EngineError {
    /// Serialization failures and unique-key races surface as a retryable
    /// conflict; everything else is a store failure.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                // serialization_failure, deadlock_detected, unique_violation
                Some("40001") | Some("40P01") | Some("23505") => return EngineError::Conflict,
                _ => {}
            }
        }
        EngineError::Database(err)
    }
}

impl From<anyhow::Error> for EngineError {
    /// The model layer reports through `anyhow`; recover the underlying
    /// store error so conflicts keep their retryable classification.
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<sqlx::Error>() {
            Ok(sql_err) => sql_err.into(),
            Err(other) => EngineError::Internal(other),
        }
    }
}

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
