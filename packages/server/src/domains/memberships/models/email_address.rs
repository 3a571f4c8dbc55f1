use anyhow::Result;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use typed_builder::TypedBuilder;

use crate::common::{CommunityId, EmailAddressId, UserId};

lazy_static! {
    // One @, no whitespace, a dot somewhere in the domain
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// EmailAddress - an address bound to a user within one community
///
/// Created once when a membership is accepted, never updated by the join flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, TypedBuilder)]
pub struct EmailAddress {
    #[builder(default = EmailAddressId::new())]
    pub id: EmailAddressId,
    pub user_id: UserId,
    pub community_id: CommunityId,
    #[builder(setter(transform = |address: &str| normalize_email(address)))]
    pub address: String,
    /// Cleared elsewhere when mail bounces
    #[builder(default = true)]
    pub valid: bool,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

/// Trim and lower-case a submitted address
pub fn normalize_email(address: &str) -> String {
    address.trim().to_lowercase()
}

pub fn is_well_formed(address: &str) -> bool {
    EMAIL_REGEX.is_match(address)
}

// =============================================================================
// SQL Queries
// =============================================================================

impl EmailAddress {
    /// Whether the user already has a usable address on file for the community
    pub async fn user_has_valid(
        user_id: UserId,
        community_id: CommunityId,
        pool: &PgPool,
    ) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM email_addresses
                WHERE user_id = $1 AND community_id = $2 AND valid
            )
            "#,
        )
        .bind(user_id)
        .bind(community_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Owner of an address within the community, if anyone claimed it
    pub async fn find_owner(
        community_id: CommunityId,
        address: &str,
        pool: &PgPool,
    ) -> Result<Option<UserId>> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM email_addresses WHERE community_id = $1 AND address = $2",
        )
        .bind(community_id)
        .bind(normalize_email(address))
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_for_user(
        user_id: UserId,
        community_id: CommunityId,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM email_addresses
            WHERE user_id = $1 AND community_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .bind(community_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        let mut conn = pool.acquire().await?;
        self.insert_new(&mut conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Email address {} is already taken", self.address))
    }

    /// Insert inside a transaction. Returns `None` if the address is already
    /// claimed in this community (the unique constraint won the race).
    pub async fn insert_new(&self, conn: &mut PgConnection) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO email_addresses (id, user_id, community_id, address, valid, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (community_id, address) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(self.community_id)
        .bind(normalize_email(&self.address))
        .bind(self.valid)
        .bind(self.created_at)
        .fetch_optional(conn)
        .await
        .map_err(Into::into)
    }
}
