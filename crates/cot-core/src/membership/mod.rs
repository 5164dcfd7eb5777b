//! Cached view of who is in the managed channel.

pub mod cache;
pub mod refresher;

pub use cache::{ExpiryHook, MemberSet, MembershipCache, MEMBERS_TTL};
pub use refresher::MembershipRefresher;
