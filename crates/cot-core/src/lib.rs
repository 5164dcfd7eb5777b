//! Core domain + application logic for the Cult of Threes moderation bot.
//!
//! This crate is framework-agnostic. Slack lives behind the `ChatPlatform`
//! port, implemented in the adapter crate.

pub mod cleanup;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod membership;
pub mod moderator;
pub mod platform;
pub mod rules;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use errors::{Error, Result};
