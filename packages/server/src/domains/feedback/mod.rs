//! Feedback domain - ratings on completed appointments

pub mod models;

pub use models::Feedback;
