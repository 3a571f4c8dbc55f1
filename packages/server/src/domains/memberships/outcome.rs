use super::errors::{FailureReason, FieldErrors, JoinFailure};
use super::form::{JoinForm, JoinFormContext};
use super::models::{Membership, MembershipStatus};
use crate::kernel::LogEntry;

/// Category attached to every join rejection log entry.
pub const LOG_CATEGORY: &str = "membership_join";

/// How a join request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined(Joined),
    /// Already accepted. Nothing was written.
    AlreadyMember,
    /// Rejected or suspended memberships cannot join.
    NotApplicable { status: MembershipStatus },
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    pub membership: Membership,
    /// The caller should drop invitation state from the session
    pub clear_invitation_session: bool,
    pub became_admin: bool,
}

/// A rejected attempt and everything needed to show the form again.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub reason: FailureReason,
    pub message_key: &'static str,
    pub log: LogEntry,
    pub form: JoinFormContext,
}

impl Rejection {
    pub fn from_failure(
        failure: JoinFailure,
        submitted: &JoinForm,
        form: JoinFormContext,
    ) -> Self {
        let reason = failure.reason;
        let log = failure.context.into_iter().fold(
            LogEntry::new(reason.log_message(), LOG_CATEGORY).with("reason", reason.as_str()),
            |entry, (key, value)| entry.with(&key, value),
        );

        Self {
            reason,
            message_key: reason.message_key(),
            log,
            form: JoinFormContext {
                values: submitted.redisplay(reason.cleared_field()),
                ..form
            },
        }
    }

    /// Field errors reported by a failed commit
    pub fn field_errors(&self) -> Option<FieldErrors> {
        JoinFailure {
            reason: self.reason,
            context: self.log.context.clone(),
        }
        .field_errors()
    }
}

impl JoinOutcome {
    pub fn is_joined(&self) -> bool {
        matches!(self, JoinOutcome::Joined(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            JoinOutcome::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}
