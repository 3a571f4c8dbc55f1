//! PostgreSQL-backed job queue implementation.
//!
//! The join core only enqueues; claiming and executing jobs belongs to the
//! worker process that owns the `jobs` table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::job::{Job, JobPriority};
use crate::common::JobId;

/// Result type for enqueue operations that handles idempotency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Command was enqueued, returns new job ID
    Created(JobId),
    /// Command already exists (idempotency hit), returns existing job ID
    Duplicate(JobId),
}

impl EnqueueResult {
    /// Get the job ID regardless of whether it was created or duplicate
    pub fn job_id(&self) -> JobId {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

/// Metadata for command serialization.
///
/// Commands implement this to provide their job type and scheduling hints.
pub trait CommandMeta {
    /// The command type name (used as job_type).
    fn command_type(&self) -> &'static str;

    /// Optional idempotency key.
    ///
    /// If provided, only one pending/running job exists with this key.
    fn idempotency_key(&self) -> Option<String> {
        None
    }

    fn command_version(&self) -> i32 {
        1
    }

    fn priority(&self) -> JobPriority {
        JobPriority::Normal
    }

    fn reference_id(&self) -> Option<Uuid> {
        None
    }

    fn max_retries(&self) -> i32 {
        3
    }
}

impl Job {
    /// Build a pending job from a serializable command.
    pub fn for_command<C>(command: &C) -> Result<Self>
    where
        C: Serialize + CommandMeta,
    {
        let args = serde_json::to_value(command)
            .with_context(|| format!("failed to serialize {}", command.command_type()))?;

        Ok(Job {
            args: Some(args),
            reference_id: command.reference_id(),
            priority: command.priority(),
            max_retries: command.max_retries(),
            idempotency_key: command.idempotency_key(),
            command_version: command.command_version(),
            ..Job::builder().job_type(command.command_type()).build()
        })
    }
}

/// Trait for job queue operations.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job for immediate execution.
    ///
    /// If the job carries an idempotency key and a matching pending/running
    /// job exists, returns `EnqueueResult::Duplicate` with the existing job ID.
    async fn enqueue(&self, job: Job) -> Result<EnqueueResult>;
}

/// Serialize a command and enqueue it.
pub async fn enqueue_command<C>(queue: &dyn JobQueue, command: &C) -> Result<EnqueueResult>
where
    C: Serialize + CommandMeta + Sync,
{
    let job = Job::for_command(command)?;
    queue.enqueue(job).await
}

/// PostgreSQL-backed job queue implementation.
pub struct PostgresJobQueue {
    pool: PgPool,
}

impl PostgresJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn enqueue(&self, job: Job) -> Result<EnqueueResult> {
        if let Some(key) = &job.idempotency_key {
            if let Some(existing) = Job::find_active_by_idempotency_key(key, &self.pool).await? {
                debug!(
                    job_id = %existing.id,
                    idempotency_key = %key,
                    "Found existing job with idempotency key"
                );
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }

        debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            priority = ?job.priority,
            "Enqueueing job"
        );

        match job.insert(&self.pool).await? {
            Some(inserted) => Ok(EnqueueResult::Created(inserted.id)),
            None => {
                // Lost an idempotency race with a concurrent enqueue
                let key = job.idempotency_key.as_deref().unwrap_or_default();
                let existing = Job::find_active_by_idempotency_key(key, &self.pool)
                    .await?
                    .with_context(|| format!("job insert for {} was skipped", job.job_type))?;
                Ok(EnqueueResult::Duplicate(existing.id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Ping {
        target: Uuid,
    }

    impl CommandMeta for Ping {
        fn command_type(&self) -> &'static str {
            "ping"
        }

        fn idempotency_key(&self) -> Option<String> {
            Some(format!("ping:{}", self.target))
        }

        fn priority(&self) -> JobPriority {
            JobPriority::Low
        }

        fn reference_id(&self) -> Option<Uuid> {
            Some(self.target)
        }
    }

    #[test]
    fn test_for_command_copies_metadata() {
        let target = Uuid::now_v7();
        let job = Job::for_command(&Ping { target }).unwrap();

        assert_eq!(job.job_type, "ping");
        assert_eq!(job.priority, JobPriority::Low);
        assert_eq!(job.reference_id, Some(target));
        assert_eq!(job.idempotency_key, Some(format!("ping:{}", target)));
        assert_eq!(job.args, Some(serde_json::json!({ "target": target })));
    }

    #[test]
    fn test_enqueue_result_job_id() {
        let id = JobId::new();
        assert_eq!(EnqueueResult::Duplicate(id).job_id(), id);
        assert!(EnqueueResult::Created(id).is_created());
        assert!(!EnqueueResult::Duplicate(id).is_created());
    }
}
