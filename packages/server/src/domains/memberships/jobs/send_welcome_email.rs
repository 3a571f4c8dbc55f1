//! SendWelcomeEmailJob - welcome mail after a successful join.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{CommunityId, UserId};
use crate::kernel::jobs::{CommandMeta, JobPriority};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendWelcomeEmailJob {
    pub user_id: UserId,
    pub community_id: CommunityId,
}

impl SendWelcomeEmailJob {
    pub const JOB_TYPE: &'static str = "send_welcome_email";

    pub fn new(user_id: UserId, community_id: CommunityId) -> Self {
        Self {
            user_id,
            community_id,
        }
    }
}

impl CommandMeta for SendWelcomeEmailJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }

    fn idempotency_key(&self) -> Option<String> {
        Some(format!(
            "{}:{}:{}",
            Self::JOB_TYPE,
            self.user_id,
            self.community_id
        ))
    }

    fn reference_id(&self) -> Option<Uuid> {
        Some(self.user_id.into_uuid())
    }

    // Mail can wait behind anything user-facing
    fn priority(&self) -> JobPriority {
        JobPriority::Low
    }

    fn max_retries(&self) -> i32 {
        5
    }
}
