//! CommunityJoinedJob - post-join bookkeeping for a newly accepted member.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{CommunityId, UserId};
use crate::kernel::jobs::{CommandMeta, JobPriority};

/// Announce that a user joined a community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityJoinedJob {
    pub user_id: UserId,
    pub community_id: CommunityId,
}

impl CommunityJoinedJob {
    pub const JOB_TYPE: &'static str = "community_joined";

    pub fn new(user_id: UserId, community_id: CommunityId) -> Self {
        Self {
            user_id,
            community_id,
        }
    }
}

impl CommandMeta for CommunityJoinedJob {
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
        Some(self.community_id.into_uuid())
    }

    fn priority(&self) -> JobPriority {
        JobPriority::Normal
    }
}
