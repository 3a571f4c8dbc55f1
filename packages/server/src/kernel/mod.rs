//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod event_log;
pub mod jobs;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use event_log::TracingEventLog;
pub use test_dependencies::{InMemoryJoinStore, MockEventLog, SpyJobQueue, TestDependencies};
pub use traits::*;
