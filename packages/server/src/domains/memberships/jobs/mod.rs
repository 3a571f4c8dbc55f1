//! Jobs enqueued after a membership is accepted.

mod community_joined;
mod send_welcome_email;

pub use community_joined::CommunityJoinedJob;
pub use send_welcome_email::SendWelcomeEmailJob;
