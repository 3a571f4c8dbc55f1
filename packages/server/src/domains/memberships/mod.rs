//! Memberships domain - joining a restricted community
//!
//! Flow:
//!   ensure_pending_consent → validate (invitation → email → consent)
//!     → commit (one atomic unit) → enqueue post-join jobs
//!
//! Rejected input is reported as a `JoinFailure` value and ends in
//! `JoinOutcome::Rejected`; only broken preconditions and infrastructure
//! failures surface as `JoinError`.

pub mod activities;
pub mod checks;
pub mod commit;
pub mod errors;
pub mod form;
pub mod jobs;
pub mod models;
pub mod outcome;
pub mod pipeline;
pub mod store;

pub use activities::{ensure_pending_consent, join_community, load_join_form, Gate, JoinRequest};
pub use commit::{Acceptance, CommitOutcome};
pub use errors::{Check, FailureReason, JoinError, JoinFailure, JoinField};
pub use form::{JoinForm, JoinFormContext};
pub use models::{Community, EmailAddress, Invitation, Membership, MembershipStatus};
pub use outcome::{JoinOutcome, Joined, Rejection};
pub use pipeline::ValidatedJoin;
pub use store::{JoinStore, PostgresJoinStore};
