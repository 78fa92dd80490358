//! Named cascade handlers.
//!
//! One handler per trigger class, invoked by the engine in a fixed,
//! documented order. Every step is an explicit statement on the triggering
//! transaction; there is no hidden firing order.
//!
//! Recursion guard: each triggering transaction carries a visited set keyed
//! by (entity kind, id). A handler that finds its entity already visited
//! returns without touching it, so Department -> Service cascades cannot
//! re-enter the department, and no entity is audited twice in one event.

use serde_json::json;
use sqlx::PgConnection;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::common::{EngineResult, EntityKind, UserId};
use crate::domains::appointments::machine::{self, CapacityEffect, Decision};
use crate::domains::appointments::models::{Appointment, AppointmentStatus};
use crate::domains::audit::models::{actions, AuditLog};
use crate::domains::catalog::models::Service;
use crate::domains::departments::models::Department;
use crate::domains::identity::models::{OfficerRole, User};
use crate::domains::notifications::models::Notification;
use crate::domains::scheduling::{capacity, models::TimeSlot};

use super::events::DomainEvent;

/// Per-transaction cascade state: the acting user, the visited set, and the
/// fact events to publish after commit.
pub struct CascadeCtx {
    actor: Option<UserId>,
    visited: HashSet<(EntityKind, Uuid)>,
    events: Vec<DomainEvent>,
}

impl CascadeCtx {
    pub fn new(actor: Option<UserId>) -> Self {
        Self {
            actor,
            visited: HashSet::new(),
            events: Vec::new(),
        }
    }

    pub fn actor(&self) -> Option<UserId> {
        self.actor
    }

    /// Claim an entity for this triggering event. Returns false when the
    /// entity was already processed (re-entrant cascade edge).
    pub fn claim(&mut self, kind: EntityKind, id: impl Into<Uuid>) -> bool {
        self.visited.insert((kind, id.into()))
    }

    pub fn emit(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    /// Consume the context, yielding the events for post-commit dispatch.
    pub fn into_events(self) -> Vec<DomainEvent> {
        self.events
    }
}

// =============================================================================
// User activation cascade
// =============================================================================

/// Deactivate: officer role first, then cancel held appointments, then
/// bulk-read notifications. Reactivate: officer role only.
pub async fn handle_user_active_changed(
    user: &User,
    active: bool,
    conn: &mut PgConnection,
    ctx: &mut CascadeCtx,
) -> EngineResult<()> {
    if !ctx.claim(EntityKind::User, user.id) {
        return Ok(());
    }

    let updated = User::set_active(user.id, active, conn).await?;
    let action = if active {
        actions::USER_REACTIVATED
    } else {
        actions::USER_DEACTIVATED
    };
    AuditLog::record(
        ctx.actor(),
        action,
        EntityKind::User,
        user.id,
        Some(json!({ "active": user.active })),
        Some(json!({ "active": updated.active })),
        conn,
    )
    .await?;

    // Officer role tracks its owner in both directions. It goes first on
    // deactivation: an officer's own bookings are then handled as ordinary
    // user appointments.
    if let Some(role) = OfficerRole::find_by_user(user.id, conn).await? {
        if role.active != active && ctx.claim(EntityKind::OfficerRole, role.id) {
            OfficerRole::set_active(role.id, active, conn).await?;
            AuditLog::record(
                ctx.actor(),
                if active {
                    actions::OFFICER_ROLE_REACTIVATED
                } else {
                    actions::OFFICER_ROLE_DEACTIVATED
                },
                EntityKind::OfficerRole,
                role.id,
                Some(json!({ "active": role.active })),
                Some(json!({ "active": active })),
                conn,
            )
            .await?;
        }
    }

    if !active {
        for appointment in Appointment::find_holding_by_user(user.id, conn).await? {
            cancel_held_appointment(&appointment, conn, ctx).await?;
        }

        let marked = Notification::mark_all_read_for_user(user.id, conn).await?;
        if marked > 0 {
            // One summary record for the bulk flip, not one per row.
            AuditLog::record(
                ctx.actor(),
                actions::NOTIFICATIONS_MARKED_READ,
                EntityKind::User,
                user.id,
                None,
                Some(json!({ "marked_read": marked })),
                conn,
            )
            .await?;
            ctx.emit(DomainEvent::NotificationsMarkedRead {
                user_id: user.id,
                count: marked,
            });
        }
    }

    info!(user_id = %user.id, active, "user activity cascade applied");
    ctx.emit(DomainEvent::UserActivityChanged {
        user_id: user.id,
        active,
    });

    Ok(())
}

// =============================================================================
// Department activation cascade
// =============================================================================

/// Deactivate: every service (recursing into the service cascade), then
/// every officer role of the department. Reactivate: restore both sets.
pub async fn handle_department_active_changed(
    department: &Department,
    active: bool,
    conn: &mut PgConnection,
    ctx: &mut CascadeCtx,
) -> EngineResult<()> {
    if !ctx.claim(EntityKind::Department, department.id) {
        return Ok(());
    }

    let updated = Department::set_active(department.id, active, conn).await?;
    AuditLog::record(
        ctx.actor(),
        if active {
            actions::DEPARTMENT_REACTIVATED
        } else {
            actions::DEPARTMENT_DEACTIVATED
        },
        EntityKind::Department,
        department.id,
        Some(json!({ "active": department.active })),
        Some(json!({ "active": updated.active })),
        conn,
    )
    .await?;

    for service in Service::find_by_department_for_update(department.id, conn).await? {
        if service.active != active {
            // The department is already claimed, so this edge cannot loop
            // back into the department handler.
            handle_service_active_changed(&service, active, conn, ctx).await?;
        }
    }

    for role in OfficerRole::find_by_department(department.id, conn).await? {
        if role.active != active && ctx.claim(EntityKind::OfficerRole, role.id) {
            OfficerRole::set_active(role.id, active, conn).await?;
            AuditLog::record(
                ctx.actor(),
                if active {
                    actions::OFFICER_ROLE_REACTIVATED
                } else {
                    actions::OFFICER_ROLE_DEACTIVATED
                },
                EntityKind::OfficerRole,
                role.id,
                Some(json!({ "active": role.active })),
                Some(json!({ "active": active })),
                conn,
            )
            .await?;
        }
    }

    info!(department_id = %department.id, active, "department activity cascade applied");
    ctx.emit(DomainEvent::DepartmentActivityChanged {
        department_id: department.id,
        active,
    });

    Ok(())
}

// =============================================================================
// Service activation cascade
// =============================================================================

/// Deactivate: cancel held appointments (each releasing its capacity unit),
/// then close every slot to new bookings. Reactivate: recompute slot
/// availability from the untouched counters, nothing more.
pub async fn handle_service_active_changed(
    service: &Service,
    active: bool,
    conn: &mut PgConnection,
    ctx: &mut CascadeCtx,
) -> EngineResult<()> {
    if !ctx.claim(EntityKind::Service, service.id) {
        return Ok(());
    }

    let updated = Service::set_active(service.id, active, conn).await?;
    AuditLog::record(
        ctx.actor(),
        if active {
            actions::SERVICE_REACTIVATED
        } else {
            actions::SERVICE_DEACTIVATED
        },
        EntityKind::Service,
        service.id,
        Some(json!({ "active": service.active })),
        Some(json!({ "active": updated.active })),
        conn,
    )
    .await?;

    if active {
        TimeSlot::reopen_for_service(service.id, conn).await?;
    } else {
        // Cancellations run first so their releases drain the counters the
        // closed slots keep.
        for appointment in Appointment::find_holding_by_service(service.id, conn).await? {
            cancel_held_appointment(&appointment, conn, ctx).await?;
        }
        TimeSlot::close_all_for_service(service.id, conn).await?;
    }

    info!(service_id = %service.id, active, "service activity cascade applied");
    ctx.emit(DomainEvent::ServiceActivityChanged {
        service_id: service.id,
        active,
    });

    Ok(())
}

// =============================================================================
// Shared cancellation step
// =============================================================================

/// Cancel one held appointment through the state machine, releasing its
/// capacity unit and appending its audit record.
pub async fn cancel_held_appointment(
    appointment: &Appointment,
    conn: &mut PgConnection,
    ctx: &mut CascadeCtx,
) -> EngineResult<()> {
    if !ctx.claim(EntityKind::Appointment, appointment.id) {
        return Ok(());
    }

    match machine::decide(appointment.status, AppointmentStatus::Cancelled)? {
        Decision::Noop => return Ok(()),
        Decision::Apply(effect) => {
            if effect == CapacityEffect::Release {
                capacity::release(appointment.time_slot_id, conn).await?;
            }

            let updated =
                Appointment::update_status(appointment.id, AppointmentStatus::Cancelled, conn)
                    .await?;

            AuditLog::record(
                ctx.actor(),
                actions::APPOINTMENT_STATUS_CHANGED,
                EntityKind::Appointment,
                appointment.id,
                Some(json!({ "status": appointment.status })),
                Some(json!({ "status": updated.status })),
                conn,
            )
            .await?;

            ctx.emit(DomainEvent::AppointmentStatusChanged {
                appointment_id: appointment.id,
                user_id: appointment.user_id,
                from: appointment.status,
                to: AppointmentStatus::Cancelled,
            });
        }
    }

    Ok(())
}
