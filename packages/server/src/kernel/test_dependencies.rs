// TestDependencies - in-memory implementations for testing
//
// Provides a store, job queue and event log that can be injected into
// ServerDeps. Each records its calls so tests can assert on them.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::jobs::{EnqueueResult, Job, JobQueue};
use super::{BaseEventLog, LogEntry, ServerDeps};
use crate::common::{CommunityId, InvitationId, MembershipId, UserId};
use crate::domains::memberships::commit::{
    Acceptance, CommitOutcome, EMAIL_TAKEN, NO_LONGER_PENDING,
};
use crate::domains::memberships::errors::{FailureReason, JoinFailure};
use crate::domains::memberships::models::{
    normalize_code, normalize_email, EmailAddress, Invitation, Membership, MembershipStatus,
};
use crate::domains::memberships::store::JoinStore;

// =============================================================================
// In-memory Join Store
// =============================================================================

#[derive(Debug, Clone, Default)]
struct StoreState {
    memberships: Vec<Membership>,
    invitations: Vec<Invitation>,
    emails: Vec<EmailAddress>,
}

/// Join store backed by vectors behind one mutex.
///
/// Clones share state. A commit holds the mutex for its whole duration and
/// works on a copy of the state, which replaces the original only when every
/// write succeeded.
#[derive(Clone, Default)]
pub struct InMemoryJoinStore {
    state: Arc<Mutex<StoreState>>,
    calls: Arc<Mutex<Vec<&'static str>>>,
    fail_membership_updates: Arc<AtomicBool>,
}

impl InMemoryJoinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_membership(self, membership: Membership) -> Self {
        self.add_membership(membership);
        self
    }

    pub fn with_invitation(self, invitation: Invitation) -> Self {
        self.state.lock().unwrap().invitations.push(invitation);
        self
    }

    pub fn with_email(self, email: EmailAddress) -> Self {
        self.add_email(email);
        self
    }

    /// Seed a membership after the store was handed out
    pub fn add_membership(&self, membership: Membership) {
        self.state.lock().unwrap().memberships.push(membership);
    }

    /// Seed an email record after the store was handed out
    pub fn add_email(&self, email: EmailAddress) {
        self.state.lock().unwrap().emails.push(email);
    }

    /// Make every following membership update fail as if the database errored
    pub fn fail_membership_updates(&self) {
        self.fail_membership_updates.store(true, Ordering::SeqCst);
    }

    pub fn membership(&self, id: MembershipId) -> Option<Membership> {
        self.state
            .lock()
            .unwrap()
            .memberships
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub fn invitation(&self, id: InvitationId) -> Option<Invitation> {
        self.state
            .lock()
            .unwrap()
            .invitations
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    pub fn emails(&self) -> Vec<EmailAddress> {
        self.state.lock().unwrap().emails.clone()
    }

    pub fn admins(&self, community_id: CommunityId) -> Vec<Membership> {
        self.state
            .lock()
            .unwrap()
            .memberships
            .iter()
            .filter(|m| m.community_id == community_id && m.admin)
            .cloned()
            .collect()
    }

    /// Names of the store methods called, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == method)
            .count()
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }
}

#[async_trait]
impl JoinStore for InMemoryJoinStore {
    async fn find_membership(
        &self,
        user_id: UserId,
        community_id: CommunityId,
    ) -> Result<Option<Membership>> {
        self.record("find_membership");
        Ok(self
            .state
            .lock()
            .unwrap()
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.community_id == community_id)
            .cloned())
    }

    async fn find_usable_invitation(
        &self,
        community_id: CommunityId,
        code: &str,
    ) -> Result<Option<Invitation>> {
        self.record("find_usable_invitation");
        let code = normalize_code(code);
        Ok(self
            .state
            .lock()
            .unwrap()
            .invitations
            .iter()
            .find(|i| i.community_id == community_id && i.code == code && i.is_usable())
            .cloned())
    }

    async fn user_has_valid_email(
        &self,
        user_id: UserId,
        community_id: CommunityId,
    ) -> Result<bool> {
        self.record("user_has_valid_email");
        Ok(self
            .state
            .lock()
            .unwrap()
            .emails
            .iter()
            .any(|e| e.user_id == user_id && e.community_id == community_id && e.valid))
    }

    async fn find_email_owner(
        &self,
        community_id: CommunityId,
        address: &str,
    ) -> Result<Option<UserId>> {
        self.record("find_email_owner");
        let address = normalize_email(address);
        Ok(self
            .state
            .lock()
            .unwrap()
            .emails
            .iter()
            .find(|e| e.community_id == community_id && e.address == address)
            .map(|e| e.user_id))
    }

    async fn commit_acceptance(&self, acceptance: &Acceptance) -> Result<CommitOutcome> {
        self.record("commit_acceptance");
        let mut state = self.state.lock().unwrap();
        let mut next = state.clone();
        let now = Utc::now();

        let make_admin = !next.memberships.iter().any(|m| {
            m.community_id == acceptance.community_id && m.status == MembershipStatus::Accepted
        });

        if let Some(address) = &acceptance.email {
            let address = normalize_email(address);
            let taken = next
                .emails
                .iter()
                .any(|e| e.community_id == acceptance.community_id && e.address == address);
            if taken {
                return Ok(CommitOutcome::Rejected(JoinFailure::field_error(
                    "email",
                    EMAIL_TAKEN,
                )));
            }
            next.emails.push(
                EmailAddress::builder()
                    .user_id(acceptance.user_id)
                    .community_id(acceptance.community_id)
                    .address(&address)
                    .created_at(now)
                    .build(),
            );
        }

        let mut invitation_id = None;
        if let Some(code) = &acceptance.invitation_code {
            let code = normalize_code(code);
            let consumed = next
                .invitations
                .iter_mut()
                .find(|i| i.community_id == acceptance.community_id && i.code == code)
                .and_then(|slot| {
                    *slot = slot.consumed(now)?;
                    Some(slot.id)
                });
            match consumed {
                Some(id) => invitation_id = Some(id),
                None => {
                    return Ok(CommitOutcome::Rejected(
                        JoinFailure::new(FailureReason::InvitationCodeInvalidOrUsed)
                            .with("invitation_code", code),
                    ))
                }
            }
        }

        if self.fail_membership_updates.load(Ordering::SeqCst) {
            anyhow::bail!("Injected membership update failure");
        }

        let accepted = next
            .memberships
            .iter_mut()
            .find(|m| m.id == acceptance.membership_id)
            .and_then(|slot| {
                *slot = slot.accepted(acceptance.consent.clone(), invitation_id, make_admin, now)?;
                Some(slot.clone())
            });
        let Some(membership) = accepted else {
            return Ok(CommitOutcome::Rejected(JoinFailure::field_error(
                "status",
                NO_LONGER_PENDING,
            )));
        };

        *state = next;
        Ok(CommitOutcome::Committed(membership))
    }
}

// =============================================================================
// Spy Job Queue
// =============================================================================

/// Job queue that keeps enqueued jobs in memory
#[derive(Clone, Default)]
pub struct SpyJobQueue {
    jobs: Arc<Mutex<Vec<Job>>>,
    failing: Arc<AtomicBool>,
}

impl SpyJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue whose every enqueue fails
    pub fn failing() -> Self {
        let queue = Self::default();
        queue.failing.store(true, Ordering::SeqCst);
        queue
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn was_enqueued(&self, job_type: &str) -> bool {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .any(|j| j.job_type == job_type)
    }
}

#[async_trait]
impl JobQueue for SpyJobQueue {
    async fn enqueue(&self, job: Job) -> Result<EnqueueResult> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("Job queue unavailable");
        }

        let mut jobs = self.jobs.lock().unwrap();
        if let Some(key) = &job.idempotency_key {
            if let Some(existing) = jobs
                .iter()
                .find(|j| j.idempotency_key.as_ref() == Some(key))
            {
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }
        let id = job.id;
        jobs.push(job);
        Ok(EnqueueResult::Created(id))
    }
}

// =============================================================================
// Mock Event Log
// =============================================================================

#[derive(Clone, Default)]
pub struct MockEventLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MockEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl BaseEventLog for MockEventLog {
    fn record(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub join_store: Arc<InMemoryJoinStore>,
    pub job_queue: Arc<SpyJobQueue>,
    pub event_log: Arc<MockEventLog>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            join_store: Arc::new(InMemoryJoinStore::new()),
            job_queue: Arc::new(SpyJobQueue::new()),
            event_log: Arc::new(MockEventLog::new()),
        }
    }

    /// Set the in-memory store
    pub fn join_store(mut self, store: InMemoryJoinStore) -> Self {
        self.join_store = Arc::new(store);
        self
    }

    /// Set the spy job queue
    pub fn job_queue(mut self, queue: SpyJobQueue) -> Self {
        self.job_queue = Arc::new(queue);
        self
    }

    /// Wire into ServerDeps. The mocks stay reachable through `self`.
    pub fn into_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.join_store.clone(),
            self.job_queue.clone(),
            self.event_log.clone(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
