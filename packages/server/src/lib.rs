// Community Membership - Join Core
//
// This crate decides whether a user's pending membership in a restricted
// community can be accepted: it validates the invitation code, email address
// and consent, then commits the transition atomically.
//
// Domain logic lives in domains/memberships; infrastructure (store wiring,
// job queue, event log) lives in kernel.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
