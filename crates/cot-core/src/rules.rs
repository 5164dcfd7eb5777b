//! The three-letter rule and the messages the bot sends about it.

use crate::{
    domain::{ChannelId, UserId},
    platform::types::{Block, BlockElement, OutgoingMessage, TextObject},
};

/// Longest display name allowed in the managed channel.
pub const MAX_NAME_LEN: usize = 3;

/// Action id carried by the invitation button.
pub const JOIN_ACTION_ID: &str = "join-cult-of-threes";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameVerdict {
    /// Short enough: the user gets invited.
    Worthy,
    /// Too long: members get removed.
    Unworthy,
}

/// Length in UTF-16 code units, matching how Slack clients count it.
pub fn name_len(display_name: &str) -> usize {
    display_name.encode_utf16().count()
}

pub fn judge(display_name: &str) -> NameVerdict {
    if name_len(display_name) <= MAX_NAME_LEN {
        NameVerdict::Worthy
    } else {
        NameVerdict::Unworthy
    }
}

/// DM sent to a user whose name just became short enough.
pub fn invitation(user: &UserId) -> OutgoingMessage {
    OutgoingMessage::text(user.as_dm_channel(), "Would you like to join the cult?").with_blocks(
        vec![
            Block::Section {
                text: TextObject::Mrkdwn {
                    text: format!(
                        "Hey {}, nice username... would you like to join us?",
                        user.mention()
                    ),
                },
            },
            Block::Actions {
                elements: vec![BlockElement::Button {
                    text: TextObject::PlainText {
                        text: "Accept Invitation".to_string(),
                        emoji: Some(true),
                    },
                    action_id: JOIN_ACTION_ID.to_string(),
                }],
            },
        ],
    )
}

pub fn welcome(channel: &ChannelId, user: &UserId) -> OutgoingMessage {
    OutgoingMessage::text(
        channel.clone(),
        format!(
            "{} has accepted our invitation and joined the Cult of 3 Letters. 🙇",
            user.mention()
        ),
    )
}

pub fn expulsion(channel: &ChannelId, user: &UserId) -> OutgoingMessage {
    OutgoingMessage::text(
        channel.clone(),
        format!(
            "{} had a username longer than three letters. In violation of our sacred rules, they have been kicked.",
            user.mention()
        ),
    )
}
