use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use typed_builder::TypedBuilder;

use crate::common::{CommunityId, InvitationId};

/// Invitation - a join code scoped to one community
///
/// Codes are stored upper-case and compared after normalization, so
/// "abc123" and "ABC123" are the same code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, TypedBuilder)]
pub struct Invitation {
    #[builder(default = InvitationId::new())]
    pub id: InvitationId,
    pub community_id: CommunityId,
    #[builder(setter(transform = |code: &str| normalize_code(code)))]
    pub code: String,
    #[builder(default = 1)]
    pub uses_remaining: i32,
    #[builder(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

/// Trim and upper-case a submitted invitation code
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Invitation {
    pub fn is_usable(&self) -> bool {
        self.uses_remaining > 0
    }

    /// Use the invitation once. Returns `None` if it was already used up.
    pub fn consumed(&self, now: DateTime<Utc>) -> Option<Self> {
        if !self.is_usable() {
            return None;
        }
        Some(Self {
            uses_remaining: self.uses_remaining - 1,
            last_used_at: Some(now),
            ..self.clone()
        })
    }
}

// =============================================================================
// SQL Queries
// =============================================================================

impl Invitation {
    /// Find an invitation with uses left for this community (code is normalized here)
    pub async fn find_usable(
        community_id: CommunityId,
        code: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT *
            FROM invitations
            WHERE community_id = $1 AND code = $2 AND uses_remaining > 0
            "#,
        )
        .bind(community_id)
        .bind(normalize_code(code))
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: InvitationId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM invitations WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO invitations (id, community_id, code, uses_remaining, last_used_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.community_id)
        .bind(normalize_code(&self.code))
        .bind(self.uses_remaining)
        .bind(self.last_used_at)
        .bind(self.created_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Consume one use inside a transaction.
    ///
    /// The decrement is conditional, so two concurrent redemptions of a
    /// single-use code cannot both succeed. Returns `None` when the code is
    /// unknown or already used up.
    pub async fn consume(
        community_id: CommunityId,
        code: &str,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE invitations
            SET uses_remaining = uses_remaining - 1,
                last_used_at = NOW()
            WHERE community_id = $1 AND code = $2 AND uses_remaining > 0
            RETURNING *
            "#,
        )
        .bind(community_id)
        .bind(normalize_code(code))
        .fetch_optional(conn)
        .await
        .map_err(Into::into)
    }
}
