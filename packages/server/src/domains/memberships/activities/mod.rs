//! Membership activities - entry points called by the web layer
//!
//! The caller has already authenticated the user and loaded the community.

mod join_community;
mod join_form;

pub use join_community::{ensure_pending_consent, join_community, Gate, JoinRequest};
pub use join_form::load_join_form;
