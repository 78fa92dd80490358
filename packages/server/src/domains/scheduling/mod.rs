//! Scheduling domain - time slots and capacity accounting

pub mod capacity;
pub mod models;

pub use models::TimeSlot;
