//! Identity domain - users and their officer postings

pub mod models;

pub use models::{OfficerRole, User, UserRole};
