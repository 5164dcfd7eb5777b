//! Slack wire types: Web API replies and inbound Events API / interactivity
//! payloads. Only the fields the bot reads are modelled.

use serde::{de::DeserializeOwned, Deserialize};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

/// A cursor-paginated Web API reply.
pub trait Paged: DeserializeOwned {
    type Item;

    /// Items on this page and the cursor of the next one, if any.
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

fn next_cursor(meta: ResponseMetadata) -> Option<String> {
    Some(meta.next_cursor).filter(|c| !c.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct MembersPage {
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

impl Paged for MembersPage {
    type Item = String;

    fn into_parts(self) -> (Vec<String>, Option<String>) {
        (self.members, next_cursor(self.response_metadata))
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversationsPage {
    #[serde(default)]
    pub channels: Vec<Conversation>,
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Set for IM conversations: the user on the other side.
    #[serde(default)]
    pub user: Option<String>,
}

impl Paged for ConversationsPage {
    type Item = Conversation;

    fn into_parts(self) -> (Vec<Conversation>, Option<String>) {
        (self.channels, next_cursor(self.response_metadata))
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub ts: String,
    #[serde(default)]
    pub user: Option<String>,
}

impl Paged for HistoryPage {
    type Item = WireMessage;

    fn into_parts(self) -> (Vec<WireMessage>, Option<String>) {
        (self.messages, next_cursor(self.response_metadata))
    }
}

#[derive(Debug, Deserialize)]
pub struct PostMessageReply {
    pub channel: String,
    pub ts: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthTestReply {
    pub user_id: String,
}

// ============== Inbound ==============

/// Body of a JSON POST from the Events API.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventsApiBody {
    UrlVerification { challenge: String },
    EventCallback { event: serde_json::Value },
    #[serde(other)]
    Other,
}

/// `user_profile_changed` / `user_change` event body.
#[derive(Debug, Deserialize)]
pub struct UserEvent {
    pub user: WireUser,
}

#[derive(Debug, Deserialize)]
pub struct WireUser {
    pub id: String,
    #[serde(default)]
    pub profile: Option<WireProfile>,
}

#[derive(Debug, Deserialize)]
pub struct WireProfile {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Interactivity requests are form posts with a single `payload` field.
#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionPayload {
    BlockActions {
        user: WireUserRef,
        #[serde(default)]
        actions: Vec<WireAction>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct WireUserRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct WireAction {
    pub action_id: String,
}
