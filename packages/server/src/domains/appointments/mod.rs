//! Appointments domain - bookings and their status state machine

pub mod machine;
pub mod models;
pub mod reference;

pub use models::{Appointment, AppointmentStatus};
