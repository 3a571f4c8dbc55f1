//! Validation pipeline: invitation, then email, then consent.
//!
//! The first failing check ends the pipeline; checks after it never run.

use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use super::checks::{check_email, check_invitation, check_terms};
use super::errors::Check;
use super::form::JoinForm;
use super::models::Community;
use super::store::JoinStore;
use crate::common::UserId;

/// Everything the commit needs, all of it already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedJoin {
    /// Normalized code, absent when the community is not invite-only
    pub invitation_code: Option<String>,
    /// Normalized address, absent when the user already has a valid one
    pub email: Option<String>,
    /// Terms payload the user agreed to
    pub consent: Value,
}

pub async fn validate(
    store: &dyn JoinStore,
    user_id: UserId,
    community: &Community,
    form: &JoinForm,
) -> Result<Check<ValidatedJoin>> {
    let invitation_code = match check_invitation(store, community, &form.invitation_code).await? {
        Ok(code) => code,
        Err(failure) => return Ok(Err(failure)),
    };

    let email = match check_email(store, community, user_id, &form.email).await? {
        Ok(email) => email,
        Err(failure) => return Ok(Err(failure)),
    };

    let consent = match check_terms(&form.consent, community) {
        Ok(consent) => consent,
        Err(failure) => return Ok(Err(failure)),
    };

    debug!(
        user_id = %user_id,
        community_id = %community.id,
        with_code = invitation_code.is_some(),
        with_email = email.is_some(),
        "Join form validated"
    );

    Ok(Ok(ValidatedJoin {
        invitation_code,
        email,
        consent,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::memberships::errors::FailureReason;
    use crate::domains::memberships::models::Invitation;
    use crate::kernel::test_dependencies::InMemoryJoinStore;

    fn form(code: &str, email: &str, consent: &str) -> JoinForm {
        JoinForm {
            invitation_code: code.to_string(),
            email: email.to_string(),
            consent: consent.to_string(),
        }
    }

    #[tokio::test]
    async fn test_all_checks_pass() {
        let community = Community::builder()
            .name("Gardeners")
            .invite_only(true)
            .consent_terms(serde_json::json!({ "version": 1 }))
            .build();
        let store = InMemoryJoinStore::new().with_invitation(
            Invitation::builder()
                .community_id(community.id)
                .code("XYZ789")
                .build(),
        );

        let validated = validate(&store, UserId::new(), &community, &form("xyz789", "A@b.com", "on"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(validated.invitation_code.as_deref(), Some("XYZ789"));
        assert_eq!(validated.email.as_deref(), Some("a@b.com"));
        assert_eq!(validated.consent, serde_json::json!({ "version": 1 }));
    }

    #[tokio::test]
    async fn test_invitation_failure_stops_the_pipeline() {
        let community = Community::builder()
            .name("Gardeners")
            .invite_only(true)
            .build();
        let store = InMemoryJoinStore::new();

        let failure = validate(&store, UserId::new(), &community, &form("NOPE", "a@b.com", "off"))
            .await
            .unwrap()
            .unwrap_err();

        assert_eq!(failure.reason, FailureReason::InvitationCodeInvalidOrUsed);
        assert_eq!(store.call_count("user_has_valid_email"), 0);
        assert_eq!(store.call_count("find_email_owner"), 0);
    }

    #[tokio::test]
    async fn test_email_failure_skips_consent() {
        let community = Community::builder()
            .name("Board")
            .allowed_emails(vec!["board.org".to_string()])
            .build();
        let store = InMemoryJoinStore::new();

        // Consent is missing too, but the email failure is reported
        let failure = validate(&store, UserId::new(), &community, &form("", "a@b.com", ""))
            .await
            .unwrap()
            .unwrap_err();

        assert_eq!(failure.reason, FailureReason::EmailNotAllowed);
    }

    #[tokio::test]
    async fn test_consent_checked_last() {
        let community = Community::builder().name("Open").build();
        let store = InMemoryJoinStore::new();

        let failure = validate(&store, UserId::new(), &community, &form("", "a@b.com", "off"))
            .await
            .unwrap()
            .unwrap_err();

        assert_eq!(failure.reason, FailureReason::ConsentNotGiven);
        assert_eq!(store.call_count("find_email_owner"), 1);
    }
}
