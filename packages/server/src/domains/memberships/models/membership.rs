use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use typed_builder::TypedBuilder;

use crate::common::{CommunityId, InvitationId, MembershipId, UserId};

/// Membership status - lifecycle of a user in a community
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "membership_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    #[default]
    PendingConsent,
    Accepted,
    Rejected,
    Suspended,
}

impl MembershipStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Only a pending membership moves, and only once.
    pub fn can_transition_to(&self, next: MembershipStatus) -> bool {
        matches!(
            (self, next),
            (MembershipStatus::PendingConsent, MembershipStatus::Accepted)
        )
    }
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MembershipStatus::PendingConsent => write!(f, "pending_consent"),
            MembershipStatus::Accepted => write!(f, "accepted"),
            MembershipStatus::Rejected => write!(f, "rejected"),
            MembershipStatus::Suspended => write!(f, "suspended"),
        }
    }
}

impl std::str::FromStr for MembershipStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending_consent" => Ok(MembershipStatus::PendingConsent),
            "accepted" => Ok(MembershipStatus::Accepted),
            "rejected" => Ok(MembershipStatus::Rejected),
            "suspended" => Ok(MembershipStatus::Suspended),
            _ => Err(anyhow::anyhow!("Invalid membership status: {}", s)),
        }
    }
}

/// Membership - relates one user to one community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, TypedBuilder)]
pub struct Membership {
    #[builder(default = MembershipId::new())]
    pub id: MembershipId,
    pub user_id: UserId,
    pub community_id: CommunityId,

    #[builder(default)]
    pub status: MembershipStatus,
    /// Terms payload the user accepted; `None` until accepted
    #[builder(default)]
    pub consent: Option<Value>,
    #[builder(default = false)]
    pub admin: bool,
    #[builder(default)]
    pub invitation_id: Option<InvitationId>,

    #[builder(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn is_pending_consent(&self) -> bool {
        self.status == MembershipStatus::PendingConsent
    }

    /// The accepted version of this membership.
    ///
    /// Returns `None` unless the membership is still `pending_consent`.
    /// An existing admin flag is never cleared.
    pub fn accepted(
        &self,
        consent: Value,
        invitation_id: Option<InvitationId>,
        make_admin: bool,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if !self.status.can_transition_to(MembershipStatus::Accepted) {
            return None;
        }
        Some(Self {
            status: MembershipStatus::Accepted,
            consent: Some(consent),
            admin: self.admin || make_admin,
            invitation_id,
            accepted_at: Some(now),
            updated_at: now,
            ..self.clone()
        })
    }
}

// =============================================================================
// SQL Queries
// =============================================================================

impl Membership {
    pub async fn find_for(
        user_id: UserId,
        community_id: CommunityId,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM memberships WHERE user_id = $1 AND community_id = $2",
        )
        .bind(user_id)
        .bind(community_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: MembershipId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM memberships WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO memberships (
                id, user_id, community_id, status, consent, admin,
                invitation_id, accepted_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(self.community_id)
        .bind(self.status)
        .bind(&self.consent)
        .bind(self.admin)
        .bind(self.invitation_id)
        .bind(self.accepted_at)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Whether the community has no accepted members yet
    pub async fn none_accepted(community_id: CommunityId, conn: &mut PgConnection) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT NOT EXISTS(
                SELECT 1 FROM memberships WHERE community_id = $1 AND status = 'accepted'
            )
            "#,
        )
        .bind(community_id)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
    }

    pub async fn count_admins(community_id: CommunityId, pool: &PgPool) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM memberships WHERE community_id = $1 AND admin",
        )
        .bind(community_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Accept a pending membership inside a transaction.
    ///
    /// Returns `None` if the membership is no longer `pending_consent`.
    pub async fn accept_pending(
        id: MembershipId,
        consent: &Value,
        invitation_id: Option<InvitationId>,
        make_admin: bool,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE memberships
            SET status = 'accepted',
                consent = $2,
                invitation_id = $3,
                admin = admin OR $4,
                accepted_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending_consent'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(consent)
        .bind(invitation_id)
        .bind(make_admin)
        .fetch_optional(conn)
        .await
        .map_err(Into::into)
    }
}
