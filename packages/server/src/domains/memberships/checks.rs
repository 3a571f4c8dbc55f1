//! Validation checks for a join attempt.
//!
//! Each check reads state and never writes. A rejected input is an
//! `Ok(Err(JoinFailure))`; an outer `Err` means the store failed.

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info};

use super::errors::{Check, FailureReason, JoinFailure};
use super::models::{is_well_formed, normalize_code, normalize_email, Community};
use super::store::JoinStore;
use crate::common::UserId;

/// The form value that counts as agreeing to the terms.
pub const CONSENT_GIVEN: &str = "on";

/// Validate the invitation code.
///
/// Communities that are not invite-only ignore the code entirely.
pub async fn check_invitation(
    store: &dyn JoinStore,
    community: &Community,
    code: &str,
) -> Result<Check<Option<String>>> {
    if !community.invite_only {
        return Ok(Ok(None));
    }

    let normalized = normalize_code(code);
    let invitation = if normalized.is_empty() {
        None
    } else {
        store
            .find_usable_invitation(community.id, &normalized)
            .await?
    };

    match invitation {
        Some(invitation) => Ok(Ok(Some(invitation.code))),
        None => {
            info!(community_id = %community.id, code = %normalized, "Invitation code rejected");
            Ok(Err(JoinFailure::new(FailureReason::InvitationCodeInvalidOrUsed)
                .with("invitation_code", code)))
        }
    }
}

/// Validate the email address.
///
/// A user who already has a valid address in the community skips this step.
/// The allow-list is checked before availability.
pub async fn check_email(
    store: &dyn JoinStore,
    community: &Community,
    user_id: UserId,
    address: &str,
) -> Result<Check<Option<String>>> {
    if store.user_has_valid_email(user_id, community.id).await? {
        debug!(user_id = %user_id, "User already has a valid email, skipping");
        return Ok(Ok(None));
    }

    let normalized = normalize_email(address);
    if !is_well_formed(&normalized) || !community.allows_email(&normalized) {
        info!(community_id = %community.id, "Email address not allowed");
        return Ok(Err(
            JoinFailure::new(FailureReason::EmailNotAllowed).with("email", address)
        ));
    }

    match store.find_email_owner(community.id, &normalized).await? {
        Some(owner) if owner != user_id => {
            info!(community_id = %community.id, "Email address held by another user");
            Ok(Err(
                JoinFailure::new(FailureReason::EmailNotAvailable).with("email", address)
            ))
        }
        _ => Ok(Ok(Some(normalized))),
    }
}

/// Validate consent. Only the exact marker `"on"` counts.
pub fn check_terms(consent: &str, community: &Community) -> Check<Value> {
    if consent == CONSENT_GIVEN {
        Ok(community.consent_terms.clone())
    } else {
        Err(JoinFailure::new(FailureReason::ConsentNotGiven).with("consent", consent))
    }
}
