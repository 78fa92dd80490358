// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "cancel this department's appointments") lives in
// domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseNotificationDispatcher)

use anyhow::Result;
use async_trait::async_trait;

use crate::domains::cascade::events::DomainEvent;

// =============================================================================
// Notification Dispatcher Trait (Infrastructure - outbound email/SMS)
// =============================================================================

/// Outbound delivery boundary.
///
/// The engine publishes committed domain events here; an external
/// collaborator turns them into email/SMS. Delivery happens after the
/// triggering transaction has committed and the engine never blocks on, or
/// fails because of, delivery.
#[async_trait]
pub trait BaseNotificationDispatcher: Send + Sync {
    /// Publish one committed domain event.
    async fn publish(&self, event: &DomainEvent) -> Result<()>;

    /// Publish a batch of committed domain events.
    ///
    /// Default implementation publishes sequentially and stops at the first
    /// failure.
    async fn publish_all(&self, events: &[DomainEvent]) -> Result<()> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
