//! Server dependencies for activities (using traits for testability)
//!
//! Every collaborator the join flow talks to sits behind a trait object, so
//! tests swap in the in-memory implementations from `test_dependencies`.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::domains::memberships::store::{JoinStore, PostgresJoinStore};
use crate::kernel::jobs::{JobQueue, PostgresJobQueue};
use crate::kernel::{BaseEventLog, TracingEventLog};

// =============================================================================
// ServerDeps
// =============================================================================

/// Dependencies accessible to activities
#[derive(Clone)]
pub struct ServerDeps {
    pub join_store: Arc<dyn JoinStore>,
    pub job_queue: Arc<dyn JobQueue>,
    pub event_log: Arc<dyn BaseEventLog>,
}

impl ServerDeps {
    pub fn new(
        join_store: Arc<dyn JoinStore>,
        job_queue: Arc<dyn JobQueue>,
        event_log: Arc<dyn BaseEventLog>,
    ) -> Self {
        Self {
            join_store,
            job_queue,
            event_log,
        }
    }

    /// Production wiring on an existing pool
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(
            Arc::new(PostgresJoinStore::new(pool.clone())),
            Arc::new(PostgresJobQueue::new(pool)),
            Arc::new(TracingEventLog),
        )
    }

    /// Open the pool, run migrations if enabled, and wire everything up
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await
            .context("Failed to connect to database")?;

        if config.run_migrations {
            info!("Running database migrations");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
        }

        Ok(Self::postgres(pool))
    }
}
