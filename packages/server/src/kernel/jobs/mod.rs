//! Job infrastructure for post-commit background work.
//!
//! - [`Job`] - Job model with its SQL
//! - [`JobQueue`] - Enqueue abstraction (Postgres in production, spy in tests)
//! - [`CommandMeta`] - Scheduling metadata carried by each command
//!
//! ```text
//! join_community commits
//!     │
//!     └─► enqueue_command(queue, &command)
//!             └─► Job::for_command ─► JobQueue::enqueue ─► INSERT INTO jobs
//! ```
//!
//! Commands themselves live in their domains; this module only stores them.

mod job;
mod queue;

pub use job::{Job, JobPriority, JobStatus};
pub use queue::{enqueue_command, CommandMeta, EnqueueResult, JobQueue, PostgresJobQueue};
