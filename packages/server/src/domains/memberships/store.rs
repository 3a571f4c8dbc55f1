//! Storage seam for the join flow.
//!
//! Checks only read; every write goes through [`JoinStore::commit_acceptance`],
//! which is all-or-nothing in each implementation.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use super::commit::{Acceptance, CommitOutcome};
use super::models::{accept_membership, EmailAddress, Invitation, Membership};
use crate::common::{CommunityId, UserId};

#[async_trait]
pub trait JoinStore: Send + Sync {
    async fn find_membership(
        &self,
        user_id: UserId,
        community_id: CommunityId,
    ) -> Result<Option<Membership>>;

    /// Invitation in this community with uses left. `code` is already normalized.
    async fn find_usable_invitation(
        &self,
        community_id: CommunityId,
        code: &str,
    ) -> Result<Option<Invitation>>;

    async fn user_has_valid_email(&self, user_id: UserId, community_id: CommunityId)
        -> Result<bool>;

    /// Who holds `address` in this community. `address` is already normalized.
    async fn find_email_owner(
        &self,
        community_id: CommunityId,
        address: &str,
    ) -> Result<Option<UserId>>;

    /// Apply an acceptance atomically.
    ///
    /// Write conflicts come back as `CommitOutcome::Rejected`; `Err` is
    /// reserved for infrastructure failures. Either way nothing is persisted
    /// unless the outcome is `Committed`.
    async fn commit_acceptance(&self, acceptance: &Acceptance) -> Result<CommitOutcome>;
}

// =============================================================================
// Postgres
// =============================================================================

pub struct PostgresJoinStore {
    pool: PgPool,
}

impl PostgresJoinStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JoinStore for PostgresJoinStore {
    async fn find_membership(
        &self,
        user_id: UserId,
        community_id: CommunityId,
    ) -> Result<Option<Membership>> {
        Membership::find_for(user_id, community_id, &self.pool).await
    }

    async fn find_usable_invitation(
        &self,
        community_id: CommunityId,
        code: &str,
    ) -> Result<Option<Invitation>> {
        Invitation::find_usable(community_id, code, &self.pool).await
    }

    async fn user_has_valid_email(
        &self,
        user_id: UserId,
        community_id: CommunityId,
    ) -> Result<bool> {
        EmailAddress::user_has_valid(user_id, community_id, &self.pool).await
    }

    async fn find_email_owner(
        &self,
        community_id: CommunityId,
        address: &str,
    ) -> Result<Option<UserId>> {
        EmailAddress::find_owner(community_id, address, &self.pool).await
    }

    async fn commit_acceptance(&self, acceptance: &Acceptance) -> Result<CommitOutcome> {
        accept_membership(acceptance, &self.pool).await
    }
}
