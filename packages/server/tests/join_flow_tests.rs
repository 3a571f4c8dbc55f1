//! End-to-end join flow tests against the in-memory store.

mod common;

use common::*;
use membership_core::common::{MembershipId, UserId};
use membership_core::domains::memberships::jobs::{CommunityJoinedJob, SendWelcomeEmailJob};
use membership_core::domains::memberships::{
    join_community, Community, EmailAddress, FailureReason, JoinError, JoinOutcome, JoinRequest,
    JoinStore, Membership, MembershipStatus,
};
use membership_core::kernel::jobs::JobPriority;
use membership_core::kernel::{InMemoryJoinStore, SpyJobQueue, TestDependencies};

struct Scenario {
    deps: TestDependencies,
    user_id: UserId,
    membership_id: MembershipId,
    community: Community,
}

impl Scenario {
    /// One pending member, invitation XYZ789 available
    fn invite_only() -> Self {
        Self::with_community(invite_only_community())
    }

    fn with_community(community: Community) -> Self {
        init_tracing();
        let user_id = UserId::new();
        let membership = pending_membership(user_id, &community);
        let store = InMemoryJoinStore::new()
            .with_membership(membership.clone())
            .with_invitation(invitation(&community, "XYZ789"));
        Self {
            deps: TestDependencies::new().join_store(store),
            user_id,
            membership_id: membership.id,
            community,
        }
    }

    fn store(&self) -> &InMemoryJoinStore {
        &self.deps.join_store
    }

    fn seed_email(&self, email: EmailAddress) {
        self.store().add_email(email);
    }

    fn membership(&self) -> Membership {
        self.store()
            .membership(self.membership_id)
            .expect("membership seeded")
    }

    fn request(&self, code: &str, email: &str, consent: &str) -> JoinRequest {
        JoinRequest {
            user_id: self.user_id,
            community: self.community.clone(),
            form: form(code, email, consent),
        }
    }

    async fn try_join(&self, code: &str, email: &str, consent: &str) -> Result<JoinOutcome, JoinError> {
        join_community(&self.request(code, email, consent), &self.deps.into_deps()).await
    }

    async fn join(&self, code: &str, email: &str, consent: &str) -> JoinOutcome {
        self.try_join(code, email, consent).await.unwrap()
    }
}

// =============================================================================
// Success
// =============================================================================

#[tokio::test]
async fn test_join_succeeds_end_to_end() {
    let scenario = Scenario::invite_only();

    let outcome = scenario.join("XYZ789", "a@b.com", "on").await;

    let JoinOutcome::Joined(joined) = outcome else {
        panic!("expected Joined, got {:?}", outcome);
    };
    assert!(joined.clear_invitation_session);
    assert!(joined.became_admin);
    assert_eq!(joined.membership.status, MembershipStatus::Accepted);
    assert_eq!(
        joined.membership.consent,
        Some(scenario.community.consent_terms.clone())
    );
    assert_eq!(scenario.membership(), joined.membership);

    let invitation_id = joined.membership.invitation_id.expect("invitation recorded");
    assert_eq!(
        scenario.store().invitation(invitation_id).unwrap().uses_remaining,
        0
    );

    let emails = scenario.store().emails();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].address, "a@b.com");
    assert_eq!(emails[0].user_id, scenario.user_id);
}

#[tokio::test]
async fn test_join_enqueues_post_join_jobs() {
    let scenario = Scenario::invite_only();

    scenario.join("XYZ789", "a@b.com", "on").await;

    assert!(scenario.deps.job_queue.was_enqueued(CommunityJoinedJob::JOB_TYPE));
    assert!(scenario.deps.job_queue.was_enqueued(SendWelcomeEmailJob::JOB_TYPE));
    let jobs = scenario.deps.job_queue.jobs();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].job_type, CommunityJoinedJob::JOB_TYPE);
    assert_eq!(jobs[0].priority, JobPriority::Normal);
    assert_eq!(jobs[1].job_type, SendWelcomeEmailJob::JOB_TYPE);
    assert_eq!(jobs[1].priority, JobPriority::Low);
    assert_eq!(
        jobs[1].idempotency_key,
        Some(format!(
            "send_welcome_email:{}:{}",
            scenario.user_id, scenario.community.id
        ))
    );
    assert!(scenario.deps.event_log.entries().is_empty());
}

#[tokio::test]
async fn test_code_and_email_case_is_normalized() {
    let scenario = Scenario::invite_only();

    let outcome = scenario.join("  xyz789 ", " A@B.Com ", "on").await;

    assert!(outcome.is_joined());
    assert_eq!(scenario.store().emails()[0].address, "a@b.com");
}

#[tokio::test]
async fn test_open_community_ignores_code() {
    let scenario = Scenario::with_community(open_community());

    let outcome = scenario.join("STALE-CODE", "a@b.com", "on").await;

    let JoinOutcome::Joined(joined) = outcome else {
        panic!("expected Joined, got {:?}", outcome);
    };
    assert_eq!(joined.membership.invitation_id, None);
    assert_eq!(scenario.store().call_count("find_usable_invitation"), 0);
}

#[tokio::test]
async fn test_user_with_valid_email_skips_address() {
    let scenario = Scenario::invite_only();
    scenario.seed_email(email_for(
        scenario.user_id,
        &scenario.community,
        "known@home.net",
    ));

    let outcome = scenario.join("XYZ789", "", "on").await;

    assert!(outcome.is_joined());
    assert_eq!(scenario.store().emails().len(), 1);
}

#[tokio::test]
async fn test_enqueue_failure_still_joins() {
    let scenario = Scenario::invite_only();
    let deps = scenario.deps.clone().job_queue(SpyJobQueue::failing());

    let outcome = join_community(&scenario.request("XYZ789", "a@b.com", "on"), &deps.into_deps())
        .await
        .unwrap();

    assert!(outcome.is_joined());
    assert!(deps.job_queue.jobs().is_empty());
    assert!(!scenario.membership().is_pending_consent());
}

// =============================================================================
// Gate
// =============================================================================

#[tokio::test]
async fn test_already_member_is_a_no_op() {
    let scenario = Scenario::invite_only();
    scenario.join("XYZ789", "a@b.com", "on").await;
    let calls_before = scenario.store().call_count("commit_acceptance");

    let outcome = scenario.join("XYZ789", "other@b.com", "on").await;

    assert_eq!(outcome, JoinOutcome::AlreadyMember);
    assert_eq!(scenario.store().call_count("commit_acceptance"), calls_before);
    assert_eq!(scenario.store().emails().len(), 1);
    assert_eq!(scenario.deps.job_queue.jobs().len(), 2);
}

#[tokio::test]
async fn test_suspended_membership_is_not_applicable() {
    init_tracing();
    let user_id = UserId::new();
    let community = invite_only_community();
    let suspended = Membership {
        status: MembershipStatus::Suspended,
        ..pending_membership(user_id, &community)
    };
    let deps = TestDependencies::new().join_store(InMemoryJoinStore::new().with_membership(suspended));

    let request = JoinRequest {
        user_id,
        community,
        form: form("XYZ789", "a@b.com", "on"),
    };
    let outcome = join_community(&request, &deps.into_deps()).await.unwrap();

    assert_eq!(
        outcome,
        JoinOutcome::NotApplicable {
            status: MembershipStatus::Suspended
        }
    );
    assert_eq!(deps.join_store.calls(), vec!["find_membership"]);
}

#[tokio::test]
async fn test_missing_membership_is_fatal() {
    init_tracing();
    let deps = TestDependencies::new();
    let request = JoinRequest {
        user_id: UserId::new(),
        community: invite_only_community(),
        form: form("XYZ789", "a@b.com", "on"),
    };

    let result = join_community(&request, &deps.into_deps()).await;

    assert!(matches!(result, Err(JoinError::MissingMembership { .. })));
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn test_consent_not_given() {
    let scenario = Scenario::invite_only();

    let outcome = scenario.join("XYZ789", "a@b.com", "off").await;

    let rejection = outcome.rejection().expect("rejected");
    assert_eq!(rejection.reason, FailureReason::ConsentNotGiven);
    assert_eq!(rejection.message_key, "memberships.join.consent_not_given");
    assert_eq!(rejection.form.values, form("XYZ789", "a@b.com", ""));
    assert!(rejection.form.invite_only);

    // Nothing written, nothing queued, one log entry
    assert!(scenario.membership().is_pending_consent());
    assert!(scenario.store().emails().is_empty());
    assert_eq!(scenario.store().call_count("commit_acceptance"), 0);
    assert!(scenario.deps.job_queue.jobs().is_empty());
    let entries = scenario.deps.event_log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].context["consent"], "off");
}

#[tokio::test]
async fn test_invitation_failure_short_circuits() {
    let scenario = Scenario::invite_only();

    let outcome = scenario.join("WRONG", "a@b.com", "off").await;

    let rejection = outcome.rejection().expect("rejected");
    assert_eq!(rejection.reason, FailureReason::InvitationCodeInvalidOrUsed);
    assert_eq!(rejection.form.values, form("", "a@b.com", "off"));
    assert_eq!(scenario.store().call_count("find_email_owner"), 0);
    assert_eq!(scenario.store().call_count("commit_acceptance"), 0);
}

#[tokio::test]
async fn test_email_taken_by_another_user() {
    let scenario = Scenario::invite_only();
    scenario.seed_email(email_for(UserId::new(), &scenario.community, "a@b.com"));

    let outcome = scenario.join("XYZ789", "a@b.com", "on").await;

    let rejection = outcome.rejection().expect("rejected");
    assert_eq!(rejection.reason, FailureReason::EmailNotAvailable);
    assert_eq!(rejection.form.values, form("XYZ789", "", "on"));
}

#[tokio::test]
async fn test_email_collision_at_commit_is_update_failed() {
    // The user's own invalid record passes the checks but still holds the
    // unique address at commit time
    let scenario = Scenario::invite_only();
    scenario.seed_email(
        EmailAddress::builder()
            .user_id(scenario.user_id)
            .community_id(scenario.community.id)
            .address("a@b.com")
            .valid(false)
            .build(),
    );

    let outcome = scenario.join("XYZ789", "a@b.com", "on").await;

    let rejection = outcome.rejection().expect("rejected");
    assert_eq!(rejection.reason, FailureReason::UpdateFailed);
    assert_eq!(
        rejection.field_errors().unwrap()["email"],
        vec!["has already been taken".to_string()]
    );
    assert_eq!(rejection.form.values, form("XYZ789", "a@b.com", "on"));
    assert!(scenario.membership().is_pending_consent());
    assert!(scenario.deps.job_queue.jobs().is_empty());
}

// =============================================================================
// Atomicity and admin
// =============================================================================

#[tokio::test]
async fn test_failed_membership_update_writes_nothing() {
    let scenario = Scenario::invite_only();
    scenario.store().fail_membership_updates();

    let result = scenario.try_join("XYZ789", "a@b.com", "on").await;

    assert!(matches!(result, Err(JoinError::Internal(_))));
    assert!(scenario.store().emails().is_empty());
    assert!(scenario.membership().is_pending_consent());
    assert!(scenario.deps.job_queue.jobs().is_empty());

    let invitation = scenario
        .store()
        .find_usable_invitation(scenario.community.id, "XYZ789")
        .await
        .unwrap()
        .expect("invitation still usable");
    assert_eq!(invitation.uses_remaining, 1);
}

#[tokio::test]
async fn test_only_first_member_becomes_admin() {
    let first = Scenario::with_community(open_community());
    let second_user = UserId::new();
    let second = pending_membership(second_user, &first.community);
    first.store().add_membership(second);

    assert!(first.join("", "first@b.com", "on").await.is_joined());

    let request = JoinRequest {
        user_id: second_user,
        community: first.community.clone(),
        form: form("", "second@b.com", "on"),
    };
    let outcome = join_community(&request, &first.deps.into_deps()).await.unwrap();

    let JoinOutcome::Joined(joined) = outcome else {
        panic!("expected Joined, got {:?}", outcome);
    };
    assert!(!joined.became_admin);
    assert!(!joined.membership.admin);
    assert_eq!(first.store().admins(first.community.id).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_joins_yield_one_admin() {
    init_tracing();
    let community = open_community();
    let users: Vec<UserId> = (0..8).map(|_| UserId::new()).collect();
    let store = users.iter().fold(InMemoryJoinStore::new(), |store, user_id| {
        store.with_membership(pending_membership(*user_id, &community))
    });
    let deps = TestDependencies::new().join_store(store).into_deps();

    let handles: Vec<_> = users
        .iter()
        .enumerate()
        .map(|(i, user_id)| {
            let deps = deps.clone();
            let request = JoinRequest {
                user_id: *user_id,
                community: community.clone(),
                form: form("", &format!("user{}@b.com", i), "on"),
            };
            tokio::spawn(async move { join_community(&request, &deps).await })
        })
        .collect();

    let mut admins = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        let JoinOutcome::Joined(joined) = outcome else {
            panic!("expected Joined, got {:?}", outcome);
        };
        if joined.membership.admin {
            admins += 1;
        }
    }
    assert_eq!(admins, 1);
}
