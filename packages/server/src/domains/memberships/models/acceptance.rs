//! The acceptance transaction.
//!
//! Every write of a successful join happens here, inside one Postgres
//! transaction: the email record, the invitation use and the membership
//! update. Any rejected write rolls the whole thing back.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::debug;

use super::{Community, EmailAddress, Invitation, Membership};
use crate::domains::memberships::commit::{
    Acceptance, CommitOutcome, EMAIL_TAKEN, NO_LONGER_PENDING,
};
use crate::domains::memberships::errors::{FailureReason, JoinFailure};

pub async fn accept_membership(acceptance: &Acceptance, pool: &PgPool) -> Result<CommitOutcome> {
    let mut tx = pool.begin().await?;

    // Concurrent commits for the same community queue up here
    let exists = Community::lock_for_update(acceptance.community_id, &mut *tx).await?;
    if !exists {
        anyhow::bail!("Community {} not found", acceptance.community_id);
    }

    let make_admin = Membership::none_accepted(acceptance.community_id, &mut *tx).await?;
    debug!(
        community_id = %acceptance.community_id,
        make_admin,
        "Community locked for acceptance"
    );

    if let Some(address) = &acceptance.email {
        let email = EmailAddress::builder()
            .user_id(acceptance.user_id)
            .community_id(acceptance.community_id)
            .address(address)
            .build();
        if email.insert_new(&mut *tx).await?.is_none() {
            tx.rollback().await?;
            return Ok(CommitOutcome::Rejected(JoinFailure::field_error(
                "email",
                EMAIL_TAKEN,
            )));
        }
    }

    let mut invitation_id = None;
    if let Some(code) = &acceptance.invitation_code {
        match Invitation::consume(acceptance.community_id, code, &mut *tx).await? {
            Some(invitation) => invitation_id = Some(invitation.id),
            None => {
                tx.rollback().await?;
                return Ok(CommitOutcome::Rejected(
                    JoinFailure::new(FailureReason::InvitationCodeInvalidOrUsed)
                        .with("invitation_code", code.as_str()),
                ));
            }
        }
    }

    let accepted = Membership::accept_pending(
        acceptance.membership_id,
        &acceptance.consent,
        invitation_id,
        make_admin,
        &mut *tx,
    )
    .await?;

    let Some(membership) = accepted else {
        tx.rollback().await?;
        return Ok(CommitOutcome::Rejected(JoinFailure::field_error(
            "status",
            NO_LONGER_PENDING,
        )));
    };

    tx.commit()
        .await
        .context("Failed to commit membership acceptance")?;

    Ok(CommitOutcome::Committed(membership))
}
