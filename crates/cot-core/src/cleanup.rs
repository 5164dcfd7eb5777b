//! Removal of the bot's own messages from a user's DM channel.
//!
//! Best-effort: nothing here fails the invite/kick flow that calls it.
//! Each message is deleted independently; one failed deletion does not stop
//! the rest.

use tracing::{info, warn};

use crate::{
    domain::{MessageRef, UserId},
    errors::Error,
    platform::port::ChatPlatform,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The bot never opened a DM with this user.
    NoDirectChannel,
    Cleaned { deleted: usize, failed: usize },
    /// Listing conversations or history failed; nothing was deleted.
    Aborted,
}

/// Delete every message `bot` authored in its DM with `user`.
pub async fn cleanup_direct_messages(
    platform: &dyn ChatPlatform,
    bot: &UserId,
    user: &UserId,
) -> CleanupOutcome {
    match try_cleanup(platform, bot, user).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let err = Error::DmCleanup(e.to_string());
            warn!(user = %user, error = %err, "DM cleanup aborted");
            CleanupOutcome::Aborted
        }
    }
}

async fn try_cleanup(
    platform: &dyn ChatPlatform,
    bot: &UserId,
    user: &UserId,
) -> Result<CleanupOutcome> {
    let channels = platform.direct_channels().await?;
    let Some(dm) = channels.into_iter().find(|c| &c.user == user) else {
        info!(user = %user, "No DM channel with user; nothing to clean up");
        return Ok(CleanupOutcome::NoDirectChannel);
    };

    let history = platform.history(&dm.id).await?;
    let mut deleted = 0usize;
    let mut failed = 0usize;

    for msg in history.into_iter().filter(|m| m.user.as_ref() == Some(bot)) {
        let target = MessageRef {
            channel: dm.id.clone(),
            ts: msg.ts,
        };
        match platform.delete_message(&target).await {
            Ok(()) => deleted += 1,
            Err(e) => {
                failed += 1;
                warn!(user = %user, ts = %target.ts, error = %e, "Failed to delete bot DM");
            }
        }
    }

    info!(user = %user, deleted, failed, "DM cleanup finished");
    Ok(CleanupOutcome::Cleaned { deleted, failed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakePlatform};

    #[tokio::test]
    async fn no_dm_channel_is_a_quiet_noop() {
        let platform = FakePlatform::new();
        let bot = platform.bot();
        let outcome = cleanup_direct_messages(&platform, &bot, &UserId::new("UBO")).await;

        assert_eq!(outcome, CleanupOutcome::NoDirectChannel);
        assert!(platform.deletes().is_empty());
        assert!(!platform
            .calls()
            .iter()
            .any(|c| matches!(c, Call::History(_))));
    }

    #[tokio::test]
    async fn deletes_only_messages_authored_by_the_bot() {
        let platform = FakePlatform::new();
        let bot = platform.bot();
        let user = UserId::new("UBO");
        let mine_a = platform.seed_dm(&user, Some(&bot));
        let _theirs = platform.seed_dm(&user, Some(&user));
        let _system = platform.seed_dm(&user, None);
        let mine_b = platform.seed_dm(&user, Some(&bot));

        let outcome = cleanup_direct_messages(&platform, &bot, &user).await;

        assert_eq!(
            outcome,
            CleanupOutcome::Cleaned {
                deleted: 2,
                failed: 0
            }
        );
        assert_eq!(platform.deletes(), vec![mine_a, mine_b]);
        assert_eq!(platform.dm_history(&user).len(), 2);
    }

    #[tokio::test]
    async fn one_failed_deletion_does_not_stop_the_rest() {
        let platform = FakePlatform::new();
        let bot = platform.bot();
        let user = UserId::new("UBO");
        let first = platform.seed_dm(&user, Some(&bot));
        let second = platform.seed_dm(&user, Some(&bot));
        platform.fail_delete_of(&first.ts);

        let outcome = cleanup_direct_messages(&platform, &bot, &user).await;

        assert_eq!(
            outcome,
            CleanupOutcome::Cleaned {
                deleted: 1,
                failed: 1
            }
        );
        assert_eq!(platform.deletes(), vec![first.clone(), second]);
        let left = platform.dm_history(&user);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].ts, first.ts);
    }

    #[tokio::test]
    async fn listing_failure_is_swallowed() {
        let platform = FakePlatform::new();
        let bot = platform.bot();
        let user = UserId::new("UBO");
        platform.seed_dm(&user, Some(&bot));
        platform.fail_method("conversations.list");

        let outcome = cleanup_direct_messages(&platform, &bot, &user).await;
        assert_eq!(outcome, CleanupOutcome::Aborted);
        assert!(platform.deletes().is_empty());
    }

    #[tokio::test]
    async fn dm_with_a_different_user_is_left_alone() {
        let platform = FakePlatform::new();
        let bot = platform.bot();
        let other = UserId::new("UOTHER");
        platform.seed_dm(&other, Some(&bot));

        let outcome = cleanup_direct_messages(&platform, &bot, &UserId::new("UBO")).await;
        assert_eq!(outcome, CleanupOutcome::NoDirectChannel);
        assert_eq!(platform.dm_history(&other).len(), 1);
    }
}
