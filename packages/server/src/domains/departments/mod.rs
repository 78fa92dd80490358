//! Departments domain - organizational units owning services and officers

pub mod models;

pub use models::Department;
