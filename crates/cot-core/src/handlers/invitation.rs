use std::sync::Arc;

use async_trait::async_trait;

use crate::{events::IncomingEvent, handlers::Handler, moderator::Moderator, Result};

/// Handles the "Accept Invitation" button.
pub struct InvitationHandler {
    moderator: Arc<Moderator>,
}

impl InvitationHandler {
    pub fn new(moderator: Arc<Moderator>) -> Self {
        Self { moderator }
    }
}

#[async_trait]
impl Handler for InvitationHandler {
    fn name(&self) -> &'static str {
        "invitation"
    }

    async fn handle(&self, event: IncomingEvent) -> Result<()> {
        let IncomingEvent::Action(action) = event else {
            return Ok(());
        };
        self.moderator.accept_invitation(&action.user).await
    }
}
