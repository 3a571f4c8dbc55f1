// Business domains
pub mod memberships;
