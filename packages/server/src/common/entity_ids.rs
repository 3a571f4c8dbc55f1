//! Typed ID definitions for the join domain.
//!
//! Marker types are never instantiated; they only tag `Id<T>`.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for users (identities owned by the authentication layer).
pub struct User;

/// Marker type for Community entities.
pub struct Community;

/// Marker type for Membership entities (user ↔ community).
pub struct Membership;

/// Marker type for Invitation entities (invite-only join codes).
pub struct Invitation;

/// Marker type for EmailAddress entities (address bound to a user in a community).
pub struct EmailAddress;

/// Marker type for queued background jobs.
pub struct Job;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

pub type UserId = Id<User>;

pub type CommunityId = Id<Community>;

pub type MembershipId = Id<Membership>;

pub type InvitationId = Id<Invitation>;

pub type EmailAddressId = Id<EmailAddress>;

pub type JobId = Id<Job>;
