//! Join failure taxonomy.
//!
//! Two channels:
//! - [`JoinFailure`] is a *value*: the user submitted something we reject,
//!   the form is shown again.
//! - [`JoinError`] is an *error*: the caller broke a precondition or the
//!   infrastructure failed. It propagates and ends the request.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::common::{CommunityId, UserId};

/// Machine-readable reason a join attempt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvitationCodeInvalidOrUsed,
    EmailNotAllowed,
    EmailNotAvailable,
    ConsentNotGiven,
    UpdateFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvitationCodeInvalidOrUsed => "invitation_code_invalid_or_used",
            FailureReason::EmailNotAllowed => "email_not_allowed",
            FailureReason::EmailNotAvailable => "email_not_available",
            FailureReason::ConsentNotGiven => "consent_not_given",
            FailureReason::UpdateFailed => "update_failed",
        }
    }

    /// Key the presentation layer resolves into a localized message.
    pub fn message_key(&self) -> &'static str {
        match self {
            FailureReason::InvitationCodeInvalidOrUsed => {
                "memberships.join.invitation_code_invalid_or_used"
            }
            FailureReason::EmailNotAllowed => "memberships.join.email_not_allowed",
            FailureReason::EmailNotAvailable => "memberships.join.email_not_available",
            FailureReason::ConsentNotGiven => "memberships.join.consent_not_given",
            FailureReason::UpdateFailed => "memberships.join.update_failed",
        }
    }

    /// The form field to clear when the form is shown again.
    ///
    /// `None` means every submitted value is kept.
    pub fn cleared_field(&self) -> Option<JoinField> {
        match self {
            FailureReason::InvitationCodeInvalidOrUsed => Some(JoinField::InvitationCode),
            FailureReason::EmailNotAllowed | FailureReason::EmailNotAvailable => {
                Some(JoinField::Email)
            }
            FailureReason::ConsentNotGiven => Some(JoinField::Consent),
            FailureReason::UpdateFailed => None,
        }
    }

    /// Developer-facing log line.
    pub fn log_message(&self) -> &'static str {
        match self {
            FailureReason::InvitationCodeInvalidOrUsed => {
                "Join rejected: invitation code is invalid or already used"
            }
            FailureReason::EmailNotAllowed => "Join rejected: email address is not allowed",
            FailureReason::EmailNotAvailable => {
                "Join rejected: email address belongs to another user"
            }
            FailureReason::ConsentNotGiven => "Join rejected: terms were not accepted",
            FailureReason::UpdateFailed => "Join rejected: membership update failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields of the join form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinField {
    InvitationCode,
    Email,
    Consent,
}

impl JoinField {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinField::InvitationCode => "invitation_code",
            JoinField::Email => "email",
            JoinField::Consent => "consent",
        }
    }
}

/// Field name → validation messages, as reported by a failed commit.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// A rejected join attempt: the reason plus data for messaging and logging.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinFailure {
    pub reason: FailureReason,
    pub context: Map<String, Value>,
}

impl JoinFailure {
    pub fn new(reason: FailureReason) -> Self {
        Self {
            reason,
            context: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    /// A commit that failed validation, carrying the offending fields.
    pub fn update_failed(errors: FieldErrors) -> Self {
        let errors = errors
            .into_iter()
            .map(|(field, messages)| (field, Value::from(messages)))
            .collect::<Map<String, Value>>();
        Self::new(FailureReason::UpdateFailed).with("errors", Value::Object(errors))
    }

    /// Shorthand for a single-field `update_failed`.
    pub fn field_error(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::update_failed(errors)
    }

    /// Field errors attached by [`JoinFailure::update_failed`], if any.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        let errors = self.context.get("errors")?.as_object()?;
        Some(
            errors
                .iter()
                .map(|(field, messages)| {
                    let messages = messages
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(|m| m.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default();
                    (field.clone(), messages)
                })
                .collect(),
        )
    }
}

/// Outcome of a single validation step.
pub type Check<T> = Result<T, JoinFailure>;

/// Conditions that end the request instead of re-showing the form.
#[derive(Error, Debug)]
pub enum JoinError {
    /// The caller entered the join flow without a pending membership.
    #[error("No membership for user {user_id} in community {community_id}")]
    MissingMembership {
        user_id: UserId,
        community_id: CommunityId,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
