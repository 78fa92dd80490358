//! Catalog domain - the services departments offer

pub mod models;

pub use models::Service;
