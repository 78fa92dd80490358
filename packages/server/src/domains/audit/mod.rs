//! Audit domain - append-only compliance trail

pub mod models;

pub use models::{actions, AuditLog};
