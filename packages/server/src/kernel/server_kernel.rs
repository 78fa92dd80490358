// ServerKernel - core infrastructure with all dependencies
//
// The ServerKernel holds all server dependencies (database, outbound
// dispatch) and provides access via traits for testability.

use sqlx::PgPool;
use std::sync::Arc;

use super::BaseNotificationDispatcher;

/// ServerKernel holds all server dependencies
pub struct ServerKernel {
    pub db_pool: PgPool,
    pub dispatcher: Arc<dyn BaseNotificationDispatcher>,
}

impl ServerKernel {
    /// Creates a new ServerKernel with the given dependencies
    pub fn new(db_pool: PgPool, dispatcher: Arc<dyn BaseNotificationDispatcher>) -> Self {
        Self {
            db_pool,
            dispatcher,
        }
    }
}
