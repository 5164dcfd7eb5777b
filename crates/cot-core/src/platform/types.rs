use serde::Serialize;

use crate::domain::{ChannelId, MessageTs, UserId};

/// Outgoing chat message with optional Block Kit layout.
///
/// `text` is always sent; clients that cannot render blocks fall back to it.
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingMessage {
    pub channel: ChannelId,
    pub text: String,
    pub blocks: Vec<Block>,
}

impl OutgoingMessage {
    pub fn text(channel: ChannelId, text: impl Into<String>) -> Self {
        Self {
            channel,
            text: text.into(),
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn has_action(&self, action_id: &str) -> bool {
        self.blocks.iter().any(|b| match b {
            Block::Actions { elements } => elements.iter().any(|e| match e {
                BlockElement::Button { action_id: id, .. } => id == action_id,
            }),
            Block::Section { .. } => false,
        })
    }
}

/// Subset of Block Kit layout blocks the bot sends.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: TextObject },
    Actions { elements: Vec<BlockElement> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Mrkdwn {
        text: String,
    },
    PlainText {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        emoji: Option<bool>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockElement {
    Button { text: TextObject, action_id: String },
}

/// An IM conversation and the user on the other side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectChannel {
    pub id: ChannelId,
    pub user: UserId,
}

/// A message read back from conversation history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryMessage {
    pub ts: MessageTs,
    /// Missing for some system and integration messages.
    pub user: Option<UserId>,
}
