use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::{events::IncomingEvent, handlers::Handler, moderator::Moderator, Result};

/// Applies the three-letter rule whenever a profile changes.
pub struct UsernameChangeHandler {
    moderator: Arc<Moderator>,
}

impl UsernameChangeHandler {
    pub fn new(moderator: Arc<Moderator>) -> Self {
        Self { moderator }
    }
}

#[async_trait]
impl Handler for UsernameChangeHandler {
    fn name(&self) -> &'static str {
        "username-change"
    }

    async fn handle(&self, event: IncomingEvent) -> Result<()> {
        let IncomingEvent::ProfileChanged(change) = event else {
            return Ok(());
        };
        let Some(display_name) = change.display_name.as_deref() else {
            warn!(user = %change.user, "Profile event without display_name; ignoring");
            return Ok(());
        };

        let outcome = self
            .moderator
            .review_display_name(&change.user, display_name)
            .await?;
        tracing::debug!(user = %change.user, ?outcome, "Profile change handled");
        Ok(())
    }
}
