//! Load the join form context

use anyhow::Result;

use crate::common::UserId;
use crate::domains::memberships::form::{JoinForm, JoinFormContext};
use crate::domains::memberships::models::Community;
use crate::kernel::ServerDeps;

/// Build the payload the join form is rendered from.
///
/// Used for the first display (with empty values) and for every redisplay
/// after a rejection.
pub async fn load_join_form(
    user_id: UserId,
    community: &Community,
    values: JoinForm,
    deps: &ServerDeps,
) -> Result<JoinFormContext> {
    let user_has_valid_email = deps
        .join_store
        .user_has_valid_email(user_id, community.id)
        .await?;

    Ok(JoinFormContext {
        values,
        invite_only: community.invite_only,
        allowed_emails: community.allowed_emails.clone(),
        user_has_valid_email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::memberships::models::EmailAddress;
    use crate::kernel::test_dependencies::{InMemoryJoinStore, TestDependencies};

    #[tokio::test]
    async fn test_context_reflects_community_and_user() {
        let community = Community::builder()
            .name("Board")
            .invite_only(true)
            .allowed_emails(vec!["board.org".to_string()])
            .build();
        let user_id = UserId::new();
        let store = InMemoryJoinStore::new().with_email(
            EmailAddress::builder()
                .user_id(user_id)
                .community_id(community.id)
                .address("me@board.org")
                .build(),
        );
        let deps = TestDependencies::new().join_store(store).into_deps();

        let context = load_join_form(user_id, &community, JoinForm::default(), &deps)
            .await
            .unwrap();

        assert!(context.invite_only);
        assert!(context.user_has_valid_email);
        assert_eq!(context.allowed_emails, vec!["board.org".to_string()]);
        assert_eq!(context.values, JoinForm::default());
    }

    #[tokio::test]
    async fn test_new_user_has_no_email() {
        let community = Community::builder().name("Open").build();
        let deps = TestDependencies::new().into_deps();

        let context = load_join_form(UserId::new(), &community, JoinForm::default(), &deps)
            .await
            .unwrap();

        assert!(!context.invite_only);
        assert!(!context.user_has_valid_email);
    }
}
