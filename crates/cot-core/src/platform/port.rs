use async_trait::async_trait;

use crate::{
    domain::{ChannelId, MessageRef, UserId},
    platform::types::{DirectChannel, HistoryMessage, OutgoingMessage},
    Result,
};

/// Hexagonal port for the chat platform.
///
/// Every call is attempted once. A reply that the platform marks as failed is
/// reported as `Error::Api`; callers decide how to classify it.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn invite(&self, channel: &ChannelId, user: &UserId) -> Result<()>;
    async fn kick(&self, channel: &ChannelId, user: &UserId) -> Result<()>;

    /// Post to a channel, or to a DM when `channel` is a user id.
    async fn post_message(&self, msg: &OutgoingMessage) -> Result<MessageRef>;
    async fn delete_message(&self, msg: &MessageRef) -> Result<()>;

    /// Full member list of a channel (all pages).
    async fn channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>>;

    /// All IM conversations visible to the bot.
    async fn direct_channels(&self) -> Result<Vec<DirectChannel>>;
    async fn history(&self, channel: &ChannelId) -> Result<Vec<HistoryMessage>>;

    /// The user id the bot posts as.
    async fn bot_identity(&self) -> Result<UserId>;
}
