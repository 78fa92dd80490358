// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerKernel for tests.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::BaseNotificationDispatcher;
use crate::domains::cascade::events::DomainEvent;

// =============================================================================
// Recording Dispatcher
// =============================================================================

/// Dispatcher that records every published event instead of delivering it.
pub struct RecordingDispatcher {
    published: Arc<Mutex<Vec<DomainEvent>>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// Dispatcher whose publish calls always fail. Engine operations must
    /// still succeed: delivery is post-commit and best-effort.
    pub fn failing() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    /// All events published so far, in publish order.
    pub fn published(&self) -> Vec<DomainEvent> {
        self.published.lock().unwrap().clone()
    }
}

impl Default for RecordingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseNotificationDispatcher for RecordingDispatcher {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        if self.fail {
            anyhow::bail!("dispatcher unavailable");
        }
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Dispatcher that drops everything. For tests that don't inspect events.
pub struct NoopDispatcher;

#[async_trait]
impl BaseNotificationDispatcher for NoopDispatcher {
    async fn publish(&self, _event: &DomainEvent) -> Result<()> {
        Ok(())
    }
}
