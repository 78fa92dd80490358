//! Test fixtures for creating test data.
//!
//! Fixtures use the model methods directly. Identifying columns get a
//! random suffix so tests can share one database.

use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use server_core::common::DepartmentId;
use server_core::domains::catalog::models::Service;
use server_core::domains::departments::models::Department;
use server_core::domains::identity::models::{OfficerRole, User, UserRole};
use server_core::domains::scheduling::models::TimeSlot;

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Create a citizen user
pub async fn create_citizen(pool: &PgPool) -> Result<User> {
    let s = suffix();
    User::create(
        &format!("citizen_{s}"),
        &format!("citizen_{s}@example.org"),
        "Test Citizen",
        Some("+94771234567"),
        &format!("NIC{s}"),
        UserRole::Citizen,
        pool,
    )
    .await
}

/// Create an admin user
pub async fn create_admin(pool: &PgPool) -> Result<User> {
    let s = suffix();
    User::create(
        &format!("admin_{s}"),
        &format!("admin_{s}@example.org"),
        "Test Admin",
        None,
        &format!("NIC{s}"),
        UserRole::Admin,
        pool,
    )
    .await
}

/// Create an officer user with a role in the given department
pub async fn create_officer(
    pool: &PgPool,
    department_id: DepartmentId,
) -> Result<(User, OfficerRole)> {
    let s = suffix();
    let user = User::create(
        &format!("officer_{s}"),
        &format!("officer_{s}@example.org"),
        "Test Officer",
        None,
        &format!("NIC{s}"),
        UserRole::Officer,
        pool,
    )
    .await?;

    let role = OfficerRole::create(
        user.id,
        department_id,
        &format!("OFF{s}"),
        "Test Designation",
        pool,
    )
    .await?;

    Ok((user, role))
}

/// Create a department
pub async fn create_department(pool: &PgPool) -> Result<Department> {
    let s = suffix();
    Department::create(
        &format!("Department {s}"),
        Some("Test department"),
        Some("Colombo"),
        Some(&format!("dept_{s}@gov.example")),
        pool,
    )
    .await
}

/// Create a service with the given required document types
pub async fn create_service(
    pool: &PgPool,
    department_id: DepartmentId,
    required_document_types: &[&str],
) -> Result<Service> {
    let s = suffix();
    let required: Vec<String> = required_document_types
        .iter()
        .map(|t| t.to_string())
        .collect();

    Service::create(
        department_id,
        &format!("Service {s}"),
        Some("Test service"),
        30,
        50,
        &required,
        pool,
    )
    .await
}

/// Create a time slot starting tomorrow with the given capacity
pub async fn create_slot(
    pool: &PgPool,
    service: &Service,
    max_capacity: i32,
) -> Result<TimeSlot> {
    let start = Utc::now() + Duration::days(1);
    let end = start + Duration::minutes(i64::from(service.duration_minutes));
    TimeSlot::create(service.id, start, end, max_capacity, pool).await
}
