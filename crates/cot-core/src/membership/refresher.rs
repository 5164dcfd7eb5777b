use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    domain::ChannelId,
    errors::Error,
    membership::cache::{MemberSet, MembershipCache},
    platform::port::ChatPlatform,
    Result,
};

/// Re-reads the managed channel's members into the cache.
#[derive(Clone)]
pub struct MembershipRefresher {
    platform: Arc<dyn ChatPlatform>,
    channel: ChannelId,
    cache: MembershipCache,
}

impl MembershipRefresher {
    pub fn new(platform: Arc<dyn ChatPlatform>, channel: ChannelId, cache: MembershipCache) -> Self {
        Self {
            platform,
            channel,
            cache,
        }
    }

    pub fn cache(&self) -> &MembershipCache {
        &self.cache
    }

    /// Fetch and store the member set. On failure the previous entry is kept.
    ///
    /// Returns the number of members stored.
    pub async fn refresh(&self) -> Result<usize> {
        info!(channel = %self.channel, "Refreshing members cache");

        let members: MemberSet = match self.platform.channel_members(&self.channel).await {
            Ok(list) => list.into_iter().collect(),
            Err(e) => {
                warn!(channel = %self.channel, error = %e, "members fetch failed; keeping previous snapshot");
                return Err(Error::MembershipFetch(e.to_string()));
            }
        };

        let count = members.len();
        self.cache.set(members).await;
        info!(channel = %self.channel, count, "Members cache refreshed");
        Ok(count)
    }
}
