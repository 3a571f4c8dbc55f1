pub mod acceptance;
pub mod community;
pub mod email_address;
pub mod invitation;
pub mod membership;

pub use acceptance::accept_membership;
pub use community::Community;
pub use email_address::{is_well_formed, normalize_email, EmailAddress};
pub use invitation::{normalize_code, Invitation};
pub use membership::{Membership, MembershipStatus};
