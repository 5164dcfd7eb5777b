//! In-memory `ChatPlatform` for tests.
//!
//! Behaves like a tiny Slack workspace: invites and kicks change the member
//! list, DMs land in a per-user IM channel authored by the bot, and any method
//! can be made to fail by its Slack method name.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::{
    domain::{ChannelId, MessageRef, MessageTs, UserId},
    errors::Error,
    platform::{
        port::ChatPlatform,
        types::{DirectChannel, HistoryMessage, OutgoingMessage},
    },
    Result,
};

pub const FAKE_BOT_USER: &str = "UBOT";

/// One recorded platform call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Invite { channel: ChannelId, user: UserId },
    Kick { channel: ChannelId, user: UserId },
    Post(OutgoingMessage),
    Delete(MessageRef),
    Members(ChannelId),
    DirectChannels,
    History(ChannelId),
    BotIdentity,
}

impl Call {
    /// Calls that change workspace state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::Invite { .. } | Call::Kick { .. } | Call::Post(_) | Call::Delete(_)
        )
    }
}

pub struct FakePlatform {
    bot: UserId,
    calls: Mutex<Vec<Call>>,
    members: Mutex<Vec<UserId>>,
    dms: Mutex<Vec<DirectChannel>>,
    histories: Mutex<HashMap<ChannelId, Vec<HistoryMessage>>>,
    failing: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<MessageTs>>,
    next_ts: AtomicU64,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            bot: UserId::new(FAKE_BOT_USER),
            calls: Mutex::new(Vec::new()),
            members: Mutex::new(Vec::new()),
            dms: Mutex::new(Vec::new()),
            histories: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            next_ts: AtomicU64::new(1),
        }
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(ids: &[&str]) -> Self {
        let p = Self::default();
        p.set_members(ids);
        p
    }

    pub fn bot(&self) -> UserId {
        self.bot.clone()
    }

    pub fn set_members(&self, ids: &[&str]) {
        *self.members.lock().unwrap() = ids.iter().map(|s| UserId::new(*s)).collect();
    }

    pub fn members(&self) -> Vec<UserId> {
        self.members.lock().unwrap().clone()
    }

    pub fn fail_method(&self, method: &str) {
        self.failing.lock().unwrap().insert(method.to_string());
    }

    pub fn recover_method(&self, method: &str) {
        self.failing.lock().unwrap().remove(method);
    }

    pub fn fail_delete_of(&self, ts: &MessageTs) {
        self.failing_deletes.lock().unwrap().insert(ts.clone());
    }

    /// Seed a message into the IM channel with `user`, creating it if needed.
    pub fn seed_dm(&self, user: &UserId, author: Option<&UserId>) -> MessageRef {
        let channel = self.dm_channel_for(user);
        let ts = self.alloc_ts();
        self.histories
            .lock()
            .unwrap()
            .entry(channel.clone())
            .or_default()
            .push(HistoryMessage {
                ts: ts.clone(),
                user: author.cloned(),
            });
        MessageRef { channel, ts }
    }

    pub fn dm_history(&self, user: &UserId) -> Vec<HistoryMessage> {
        let channel = dm_channel_id(user);
        self.histories
            .lock()
            .unwrap()
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn posts(&self) -> Vec<OutgoingMessage> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Post(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn member_fetches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Members(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, method: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(method) {
            return Err(Error::Api {
                method: method.to_string(),
                error: "fake_failure".to_string(),
            });
        }
        Ok(())
    }

    fn alloc_ts(&self) -> MessageTs {
        let n = self.next_ts.fetch_add(1, Ordering::SeqCst);
        MessageTs(format!("1700000000.{n:06}"))
    }

    fn dm_channel_for(&self, user: &UserId) -> ChannelId {
        let id = dm_channel_id(user);
        let mut dms = self.dms.lock().unwrap();
        if !dms.iter().any(|d| d.id == id) {
            dms.push(DirectChannel {
                id: id.clone(),
                user: user.clone(),
            });
        }
        id
    }
}

fn dm_channel_id(user: &UserId) -> ChannelId {
    ChannelId(format!("D{}", user.0))
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn invite(&self, channel: &ChannelId, user: &UserId) -> Result<()> {
        self.record(Call::Invite {
            channel: channel.clone(),
            user: user.clone(),
        });
        self.check("conversations.invite")?;
        let mut members = self.members.lock().unwrap();
        if members.contains(user) {
            return Err(Error::Api {
                method: "conversations.invite".to_string(),
                error: "already_in_channel".to_string(),
            });
        }
        members.push(user.clone());
        Ok(())
    }

    async fn kick(&self, channel: &ChannelId, user: &UserId) -> Result<()> {
        self.record(Call::Kick {
            channel: channel.clone(),
            user: user.clone(),
        });
        self.check("conversations.kick")?;
        let mut members = self.members.lock().unwrap();
        let before = members.len();
        members.retain(|m| m != user);
        if members.len() == before {
            return Err(Error::Api {
                method: "conversations.kick".to_string(),
                error: "not_in_channel".to_string(),
            });
        }
        Ok(())
    }

    async fn post_message(&self, msg: &OutgoingMessage) -> Result<MessageRef> {
        self.record(Call::Post(msg.clone()));
        self.check("chat.postMessage")?;
        // Posting to a user id opens (or reuses) the IM channel with them.
        let channel = if msg.channel.0.starts_with('U') {
            self.dm_channel_for(&UserId(msg.channel.0.clone()))
        } else {
            msg.channel.clone()
        };
        let ts = self.alloc_ts();
        self.histories
            .lock()
            .unwrap()
            .entry(channel.clone())
            .or_default()
            .push(HistoryMessage {
                ts: ts.clone(),
                user: Some(self.bot.clone()),
            });
        Ok(MessageRef { channel, ts })
    }

    async fn delete_message(&self, msg: &MessageRef) -> Result<()> {
        self.record(Call::Delete(msg.clone()));
        self.check("chat.delete")?;
        if self.failing_deletes.lock().unwrap().contains(&msg.ts) {
            return Err(Error::Api {
                method: "chat.delete".to_string(),
                error: "cant_delete_message".to_string(),
            });
        }
        if let Some(history) = self.histories.lock().unwrap().get_mut(&msg.channel) {
            history.retain(|m| m.ts != msg.ts);
        }
        Ok(())
    }

    async fn channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>> {
        self.record(Call::Members(channel.clone()));
        self.check("conversations.members")?;
        Ok(self.members())
    }

    async fn direct_channels(&self) -> Result<Vec<DirectChannel>> {
        self.record(Call::DirectChannels);
        self.check("conversations.list")?;
        Ok(self.dms.lock().unwrap().clone())
    }

    async fn history(&self, channel: &ChannelId) -> Result<Vec<HistoryMessage>> {
        self.record(Call::History(channel.clone()));
        self.check("conversations.history")?;
        Ok(self
            .histories
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .unwrap_or_default())
    }

    async fn bot_identity(&self) -> Result<UserId> {
        self.record(Call::BotIdentity);
        self.check("auth.test")?;
        Ok(self.bot.clone())
    }
}
