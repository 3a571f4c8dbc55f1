//! Join community activity - validates the form and accepts the membership

use tracing::{error, info};

use super::load_join_form;
use crate::common::UserId;
use crate::domains::memberships::commit::{commit, CommitOutcome};
use crate::domains::memberships::errors::{JoinError, JoinFailure};
use crate::domains::memberships::form::JoinForm;
use crate::domains::memberships::jobs::{CommunityJoinedJob, SendWelcomeEmailJob};
use crate::domains::memberships::models::{Community, Membership, MembershipStatus};
use crate::domains::memberships::outcome::{JoinOutcome, Joined, Rejection};
use crate::domains::memberships::pipeline::validate;
use crate::domains::memberships::store::JoinStore;
use crate::kernel::jobs::enqueue_command;
use crate::kernel::ServerDeps;

/// An authenticated user submitting the join form for a community.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub user_id: UserId,
    pub community: Community,
    pub form: JoinForm,
}

/// Result of the entry gate.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    /// The membership is pending consent; run the join flow
    Proceed(Membership),
    /// Nothing to do; return this outcome as-is
    Skip(JoinOutcome),
}

/// Entry gate: only a `pending_consent` membership may go through the flow.
///
/// A missing membership means the caller skipped the step that creates it,
/// which is fatal rather than a form error.
pub async fn ensure_pending_consent(
    store: &dyn JoinStore,
    user_id: UserId,
    community: &Community,
) -> Result<Gate, JoinError> {
    let membership = store
        .find_membership(user_id, community.id)
        .await?
        .ok_or(JoinError::MissingMembership {
            user_id,
            community_id: community.id,
        })?;

    match membership.status {
        MembershipStatus::PendingConsent => Ok(Gate::Proceed(membership)),
        MembershipStatus::Accepted => {
            info!(user_id = %user_id, community_id = %community.id, "Already a member");
            Ok(Gate::Skip(JoinOutcome::AlreadyMember))
        }
        status => {
            info!(
                user_id = %user_id,
                community_id = %community.id,
                status = %status,
                "Membership cannot join"
            );
            Ok(Gate::Skip(JoinOutcome::NotApplicable { status }))
        }
    }
}

/// Run a join attempt from the gate to the post-commit jobs.
pub async fn join_community(
    request: &JoinRequest,
    deps: &ServerDeps,
) -> Result<JoinOutcome, JoinError> {
    let store = deps.join_store.as_ref();
    let JoinRequest {
        user_id,
        community,
        form,
    } = request;

    let membership = match ensure_pending_consent(store, *user_id, community).await? {
        Gate::Proceed(membership) => membership,
        Gate::Skip(outcome) => return Ok(outcome),
    };

    let validated = match validate(store, *user_id, community, form).await? {
        Ok(validated) => validated,
        Err(failure) => return reject(failure, request, deps).await,
    };

    match commit(store, &membership, validated).await? {
        CommitOutcome::Committed(accepted) => {
            enqueue_post_join(&accepted, deps).await;

            Ok(JoinOutcome::Joined(Joined {
                became_admin: accepted.admin && !membership.admin,
                membership: accepted,
                clear_invitation_session: true,
            }))
        }
        CommitOutcome::Rejected(failure) => reject(failure, request, deps).await,
    }
}

async fn reject(
    failure: JoinFailure,
    request: &JoinRequest,
    deps: &ServerDeps,
) -> Result<JoinOutcome, JoinError> {
    let context = load_join_form(
        request.user_id,
        &request.community,
        JoinForm::default(),
        deps,
    )
    .await?;

    let rejection = Rejection::from_failure(failure, &request.form, context);
    deps.event_log.record(&rejection.log);

    Ok(JoinOutcome::Rejected(rejection))
}

/// Fire-and-forget: a failed enqueue is logged and the join still counts.
async fn enqueue_post_join(membership: &Membership, deps: &ServerDeps) {
    let queue = deps.job_queue.as_ref();
    let joined = CommunityJoinedJob::new(membership.user_id, membership.community_id);
    let welcome = SendWelcomeEmailJob::new(membership.user_id, membership.community_id);

    if let Err(e) = enqueue_command(queue, &joined).await {
        error!(
            membership_id = %membership.id,
            job_type = CommunityJoinedJob::JOB_TYPE,
            error = %e,
            "Failed to enqueue post-join job"
        );
    }
    if let Err(e) = enqueue_command(queue, &welcome).await {
        error!(
            membership_id = %membership.id,
            job_type = SendWelcomeEmailJob::JOB_TYPE,
            error = %e,
            "Failed to enqueue post-join job"
        );
    }
}
