use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use typed_builder::TypedBuilder;

use crate::common::CommunityId;

/// Community - a restricted group users join by accepting its terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Community {
    #[builder(default = CommunityId::new())]
    pub id: CommunityId,
    pub name: String,

    /// When set, joining requires an unused invitation code
    #[builder(default = false)]
    pub invite_only: bool,
    /// Addresses (`person@example.org`) or domains (`example.org`,
    /// `@example.org`) allowed to join. Empty means unrestricted.
    #[builder(default)]
    pub allowed_emails: Vec<String>,
    /// Current terms payload, captured onto a membership at acceptance
    #[builder(default = serde_json::json!({}))]
    pub consent_terms: Value,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Community {
    pub fn has_allow_list(&self) -> bool {
        !self.allowed_emails.is_empty()
    }

    /// Check a normalized address against the allow-list.
    ///
    /// - No allow-list: every address is allowed
    /// - `person@example.org`: that exact address
    /// - `example.org` / `@example.org`: any address at exactly that domain
    pub fn allows_email(&self, address: &str) -> bool {
        if !self.has_allow_list() {
            return true;
        }

        let Some((_, domain)) = address.rsplit_once('@') else {
            return false;
        };

        self.allowed_emails.iter().any(|entry| {
            let entry = entry.trim().to_lowercase();
            match entry.strip_prefix('@') {
                Some(allowed_domain) => allowed_domain == domain,
                None if entry.contains('@') => entry == address,
                None => entry == domain,
            }
        })
    }
}

// =============================================================================
// SQL Queries
// =============================================================================

impl Community {
    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO communities (id, name, invite_only, allowed_emails, consent_terms, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(self.invite_only)
        .bind(&self.allowed_emails)
        .bind(&self.consent_terms)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Lock the community row for the rest of the transaction.
    ///
    /// Commits for the same community queue up behind this lock, which makes
    /// the "first accepted member becomes admin" decision race-free.
    /// Returns `false` if the community does not exist.
    pub async fn lock_for_update(id: CommunityId, conn: &mut PgConnection) -> Result<bool> {
        let locked = sqlx::query_scalar::<_, CommunityId>(
            "SELECT id FROM communities WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(locked.is_some())
    }
}
