//! Documents domain - verification state and the promotion gate

pub mod gate;
pub mod models;

pub use models::Document;
