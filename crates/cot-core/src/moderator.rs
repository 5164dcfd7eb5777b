//! Channel moderation service: the state transitions behind both handlers.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    cleanup::{cleanup_direct_messages, CleanupOutcome},
    domain::{ChannelId, UserId},
    errors::Error,
    membership::{MembershipCache, MembershipRefresher},
    platform::port::ChatPlatform,
    rules::{self, NameVerdict},
    Result,
};

/// What a profile change led to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileOutcome {
    /// Short name: invitation DM sent.
    Invited,
    /// Long name and a member: removed from the channel.
    Kicked,
    /// Long name, not a member: nothing to do.
    Ignored,
}

/// Owns the platform client, the membership cache and the managed channel.
///
/// Built once at startup and shared by `Arc` with every handler.
pub struct Moderator {
    channel: ChannelId,
    bot: UserId,
    platform: Arc<dyn ChatPlatform>,
    refresher: MembershipRefresher,
}

impl Moderator {
    pub fn new(platform: Arc<dyn ChatPlatform>, channel: ChannelId, bot: UserId) -> Arc<Self> {
        Self::with_cache(platform, channel, bot, MembershipCache::new())
    }

    pub fn with_cache(
        platform: Arc<dyn ChatPlatform>,
        channel: ChannelId,
        bot: UserId,
        cache: MembershipCache,
    ) -> Arc<Self> {
        let refresher = MembershipRefresher::new(platform.clone(), channel.clone(), cache);
        Arc::new(Self {
            channel,
            bot,
            platform,
            refresher,
        })
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn bot(&self) -> &UserId {
        &self.bot
    }

    pub fn cache(&self) -> &MembershipCache {
        self.refresher.cache()
    }

    /// Arm refresh-on-expiry and load the member set for the first time.
    pub async fn start(self: &Arc<Self>) -> Result<usize> {
        let weak = Arc::downgrade(self);
        self.cache()
            .on_expired(Arc::new(move || {
                let Some(moderator) = weak.upgrade() else {
                    return;
                };
                tokio::spawn(async move {
                    if let Err(e) = moderator.refresh_members().await {
                        error!(error = %e, "Refresh after cache expiry failed");
                    }
                });
            }))
            .await;

        self.refresh_members().await
    }

    pub async fn refresh_members(&self) -> Result<usize> {
        self.refresher.refresh().await
    }

    pub async fn cleanup_dms(&self, user: &UserId) -> CleanupOutcome {
        cleanup_direct_messages(self.platform.as_ref(), &self.bot, user).await
    }

    /// The user pressed "Accept Invitation".
    ///
    /// Only the invite itself can fail the call; the follow-up steps are logged
    /// and skipped over.
    pub async fn accept_invitation(&self, user: &UserId) -> Result<()> {
        info!(user = %user, channel = %self.channel, "Inviting user");
        self.platform
            .invite(&self.channel, user)
            .await
            .map_err(|e| Error::Invite(e.to_string()))?;

        if let Err(e) = self
            .platform
            .post_message(&rules::welcome(&self.channel, user))
            .await
        {
            warn!(user = %user, error = %e, "Failed to post welcome message");
        }

        self.cleanup_dms(user).await;

        if let Err(e) = self.refresh_members().await {
            warn!(user = %user, error = %e, "Refresh after invite failed");
        }
        Ok(())
    }

    /// A user's display name changed.
    ///
    /// Short names get an invitation DM every time; nothing records that one
    /// was already sent.
    pub async fn review_display_name(
        &self,
        user: &UserId,
        display_name: &str,
    ) -> Result<ProfileOutcome> {
        match rules::judge(display_name) {
            NameVerdict::Worthy => {
                info!(user = %user, "Short display name; sending invitation");
                self.platform
                    .post_message(&rules::invitation(user))
                    .await?;
                Ok(ProfileOutcome::Invited)
            }
            NameVerdict::Unworthy => {
                let members = self
                    .cache()
                    .get()
                    .await
                    .ok_or(Error::MembershipUnavailable)?;
                if !members.contains(user) {
                    debug!(user = %user, "Long display name but not a member");
                    return Ok(ProfileOutcome::Ignored);
                }
                self.expel(user).await?;
                Ok(ProfileOutcome::Kicked)
            }
        }
    }

    async fn expel(&self, user: &UserId) -> Result<()> {
        info!(user = %user, channel = %self.channel, "Kicking user");
        self.platform
            .kick(&self.channel, user)
            .await
            .map_err(|e| Error::Kick(e.to_string()))?;

        if let Err(e) = self
            .platform
            .post_message(&rules::expulsion(&self.channel, user))
            .await
        {
            warn!(user = %user, error = %e, "Failed to post kick notice");
        }

        self.cleanup_dms(user).await;

        if let Err(e) = self.refresh_members().await {
            warn!(user = %user, error = %e, "Refresh after kick failed");
        }
        Ok(())
    }
}
