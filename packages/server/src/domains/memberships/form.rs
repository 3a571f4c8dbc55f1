use serde::{Deserialize, Serialize};

use super::errors::JoinField;

/// Raw join form input, exactly as submitted.
///
/// Missing fields deserialize to empty strings. The consent checkbox submits
/// `"on"` when ticked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinForm {
    pub invitation_code: String,
    pub email: String,
    pub consent: String,
}

impl JoinForm {
    /// Values to show again after a rejection, with `cleared` emptied.
    pub fn redisplay(&self, cleared: Option<JoinField>) -> JoinForm {
        let mut values = self.clone();
        match cleared {
            Some(JoinField::InvitationCode) => values.invitation_code.clear(),
            Some(JoinField::Email) => values.email.clear(),
            Some(JoinField::Consent) => values.consent.clear(),
            None => {}
        }
        values
    }
}

/// What the presentation layer needs to render the join form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinFormContext {
    pub values: JoinForm,
    /// Show the invitation code field
    pub invite_only: bool,
    /// Hint listing the accepted addresses or domains
    pub allowed_emails: Vec<String>,
    /// Hide the email field when the user already has one on file
    pub user_has_valid_email: bool,
}
