//! Slack adapter.
//!
//! `SlackClient` implements the `cot-core` `ChatPlatform` port over the Slack
//! Web API; `router` serves the Events API / interactivity endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::warn;

pub mod api;
pub mod ingress;
pub mod router;
pub mod signature;

use cot_core::{
    config::Config,
    domain::{ChannelId, MessageRef, MessageTs, UserId},
    errors::Error,
    platform::{
        port::ChatPlatform,
        types::{DirectChannel, HistoryMessage, OutgoingMessage},
    },
    Result,
};

use crate::api::{
    AuthTestReply, ConversationsPage, HistoryPage, MembersPage, Paged, PostMessageReply,
};

const PAGE_LIMIT: u32 = 200;
/// Hard stop for runaway cursors.
const MAX_PAGES: usize = 50;

/// What `call_paged` does when `MAX_PAGES` runs out before the cursor does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PageCap {
    /// Keep what was read so far.
    Truncate,
    /// The caller needs the complete listing; a partial one is an error.
    Fail,
}

#[derive(Clone, Debug)]
pub struct SlackClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

impl SlackClient {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("reqwest client build: {e}")))?;
        Ok(Self {
            token: token.into(),
            base_url: base_url.into(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.slack_bot_token.clone(),
            cfg.slack_api_base_url.clone(),
            cfg.http_timeout,
        )
    }

    /// POST a form-encoded Web API call and check Slack's `ok` flag.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, String)]) -> Result<T> {
        let resp = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.token)
            .form(params)
            .send()
            .await
            .map_err(|e| Error::External(format!("slack request error: {method}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "slack {method} failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("slack json error: {method}: {e}")))?;

        if v.get("ok").and_then(|ok| ok.as_bool()) != Some(true) {
            let error = v
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("unknown_error")
                .to_string();
            return Err(Error::Api {
                method: method.to_string(),
                error,
            });
        }

        Ok(serde_json::from_value(v)?)
    }

    /// Follow `response_metadata.next_cursor` until it runs out.
    async fn call_paged<P: Paged>(
        &self,
        method: &str,
        params: &[(&str, String)],
        cap: PageCap,
    ) -> Result<Vec<P::Item>> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut page_params = params.to_vec();
            page_params.push(("limit", PAGE_LIMIT.to_string()));
            if let Some(c) = &cursor {
                page_params.push(("cursor", c.clone()));
            }

            let page: P = self.call(method, &page_params).await?;
            let (mut items, next) = page.into_parts();
            out.append(&mut items);

            match next {
                Some(next) => cursor = Some(next),
                None => return Ok(out),
            }
        }

        match cap {
            PageCap::Truncate => {
                warn!(method, pages = MAX_PAGES, "Pagination cut short");
                Ok(out)
            }
            PageCap::Fail => Err(Error::External(format!(
                "slack {method}: still paging after {MAX_PAGES} pages"
            ))),
        }
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    async fn invite(&self, channel: &ChannelId, user: &UserId) -> Result<()> {
        let _: IgnoredAny = self
            .call(
                "conversations.invite",
                &[("channel", channel.0.clone()), ("users", user.0.clone())],
            )
            .await?;
        Ok(())
    }

    async fn kick(&self, channel: &ChannelId, user: &UserId) -> Result<()> {
        let _: IgnoredAny = self
            .call(
                "conversations.kick",
                &[("channel", channel.0.clone()), ("user", user.0.clone())],
            )
            .await?;
        Ok(())
    }

    async fn post_message(&self, msg: &OutgoingMessage) -> Result<MessageRef> {
        let mut params = vec![("channel", msg.channel.0.clone()), ("text", msg.text.clone())];
        if !msg.blocks.is_empty() {
            params.push(("blocks", serde_json::to_string(&msg.blocks)?));
        }

        let reply: PostMessageReply = self.call("chat.postMessage", &params).await?;
        Ok(MessageRef {
            channel: ChannelId(reply.channel),
            ts: MessageTs(reply.ts),
        })
    }

    async fn delete_message(&self, msg: &MessageRef) -> Result<()> {
        let _: IgnoredAny = self
            .call(
                "chat.delete",
                &[("channel", msg.channel.0.clone()), ("ts", msg.ts.0.clone())],
            )
            .await?;
        Ok(())
    }

    async fn channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>> {
        let members = self
            .call_paged::<MembersPage>(
                "conversations.members",
                &[("channel", channel.0.clone())],
                PageCap::Fail,
            )
            .await?;
        Ok(members.into_iter().map(UserId).collect())
    }

    async fn direct_channels(&self) -> Result<Vec<DirectChannel>> {
        let channels = self
            .call_paged::<ConversationsPage>(
                "conversations.list",
                &[("types", "im".to_string())],
                PageCap::Truncate,
            )
            .await?;
        Ok(channels
            .into_iter()
            .filter_map(|c| {
                c.user.map(|user| DirectChannel {
                    id: ChannelId(c.id),
                    user: UserId(user),
                })
            })
            .collect())
    }

    async fn history(&self, channel: &ChannelId) -> Result<Vec<HistoryMessage>> {
        let messages = self
            .call_paged::<HistoryPage>(
                "conversations.history",
                &[("channel", channel.0.clone())],
                PageCap::Truncate,
            )
            .await?;
        Ok(messages
            .into_iter()
            .map(|m| HistoryMessage {
                ts: MessageTs(m.ts),
                user: m.user.map(UserId),
            })
            .collect())
    }

    async fn bot_identity(&self) -> Result<UserId> {
        let reply: AuthTestReply = self.call("auth.test", &[]).await?;
        Ok(UserId(reply.user_id))
    }
}
