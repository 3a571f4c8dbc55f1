//! Commit a validated join.

use anyhow::Result;
use serde_json::Value;
use tracing::{info, warn};

use super::errors::JoinFailure;
use super::models::Membership;
use super::pipeline::ValidatedJoin;
use super::store::JoinStore;
use crate::common::{CommunityId, MembershipId, UserId};

/// Field error when another user claimed the address first.
pub const EMAIL_TAKEN: &str = "has already been taken";
/// Field error when the membership moved on before the commit.
pub const NO_LONGER_PENDING: &str = "is no longer pending consent";

/// The writes of one successful join, handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Acceptance {
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub community_id: CommunityId,
    pub invitation_code: Option<String>,
    pub email: Option<String>,
    pub consent: Value,
}

impl Acceptance {
    pub fn new(membership: &Membership, validated: ValidatedJoin) -> Self {
        Self {
            membership_id: membership.id,
            user_id: membership.user_id,
            community_id: membership.community_id,
            invitation_code: validated.invitation_code,
            email: validated.email,
            consent: validated.consent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The accepted membership
    Committed(Membership),
    /// Nothing was written
    Rejected(JoinFailure),
}

/// Accept `membership` with the validated values, all or nothing.
///
/// Whether the user becomes admin is decided inside the store's atomic unit.
pub async fn commit(
    store: &dyn JoinStore,
    membership: &Membership,
    validated: ValidatedJoin,
) -> Result<CommitOutcome> {
    let acceptance = Acceptance::new(membership, validated);
    let outcome = store.commit_acceptance(&acceptance).await?;

    match &outcome {
        CommitOutcome::Committed(accepted) => info!(
            membership_id = %accepted.id,
            community_id = %accepted.community_id,
            admin = accepted.admin,
            "Membership accepted"
        ),
        CommitOutcome::Rejected(failure) => warn!(
            membership_id = %membership.id,
            reason = %failure.reason,
            "Membership commit rejected"
        ),
    }

    Ok(outcome)
}
