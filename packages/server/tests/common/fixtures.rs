//! Test fixtures for creating test data.
//!
//! The `seed_*` helpers fill an in-memory store; the `create_*` helpers use
//! the model methods directly against Postgres.

use anyhow::Result;
use membership_core::common::UserId;
use membership_core::domains::memberships::{
    Community, EmailAddress, Invitation, JoinForm, Membership,
};
use serde_json::json;
use sqlx::PgPool;

/// A community requiring an invitation code, with versioned terms
pub fn invite_only_community() -> Community {
    Community::builder()
        .name("Northside Tool Library")
        .invite_only(true)
        .consent_terms(json!({ "version": 3, "text": "Be kind, return tools." }))
        .build()
}

pub fn open_community() -> Community {
    Community::builder()
        .name("Open Garden")
        .consent_terms(json!({ "version": 1 }))
        .build()
}

pub fn pending_membership(user_id: UserId, community: &Community) -> Membership {
    Membership::builder()
        .user_id(user_id)
        .community_id(community.id)
        .build()
}

pub fn invitation(community: &Community, code: &str) -> Invitation {
    Invitation::builder()
        .community_id(community.id)
        .code(code)
        .build()
}

pub fn email_for(user_id: UserId, community: &Community, address: &str) -> EmailAddress {
    EmailAddress::builder()
        .user_id(user_id)
        .community_id(community.id)
        .address(address)
        .build()
}

pub fn form(invitation_code: &str, email: &str, consent: &str) -> JoinForm {
    JoinForm {
        invitation_code: invitation_code.to_string(),
        email: email.to_string(),
        consent: consent.to_string(),
    }
}

// =============================================================================
// Postgres
// =============================================================================

pub async fn create_community(pool: &PgPool, community: Community) -> Result<Community> {
    community.insert(pool).await
}

pub async fn create_pending_membership(
    pool: &PgPool,
    community: &Community,
) -> Result<Membership> {
    pending_membership(UserId::new(), community)
        .insert(pool)
        .await
}

pub async fn create_invitation(
    pool: &PgPool,
    community: &Community,
    code: &str,
) -> Result<Invitation> {
    invitation(community, code).insert(pool).await
}
