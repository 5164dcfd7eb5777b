//! Handler table: inbound events routed by event type or action id.
//!
//! Every dispatched event runs on its own task, so the caller (the HTTP
//! ingress) can acknowledge immediately. Errors stop at this boundary: they are
//! logged and never reach the platform or the user.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::{
    events::{IncomingEvent, Route, USER_CHANGE, USER_PROFILE_CHANGED},
    moderator::Moderator,
    rules::JOIN_ACTION_ID,
    Result,
};

mod invitation;
mod username;

pub use invitation::InvitationHandler;
pub use username::UsernameChangeHandler;

#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: IncomingEvent) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct HandlerTable {
    routes: HashMap<Route, Arc<dyn Handler>>,
    tasks: TaskTracker,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bot's routes: the join button and both profile-change events.
    ///
    /// `user_profile_changed` and `user_change` share one handler. Subscribe
    /// the Slack app to only one of them: with both, a single display-name
    /// edit is handled twice (two invitation DMs, or a second kick attempt).
    pub fn for_moderator(moderator: Arc<Moderator>) -> Self {
        let username: Arc<dyn Handler> = Arc::new(UsernameChangeHandler::new(moderator.clone()));
        let mut table = Self::new();
        table
            .register(
                Route::Action(JOIN_ACTION_ID.to_string()),
                Arc::new(InvitationHandler::new(moderator)),
            )
            .register(Route::Event(USER_PROFILE_CHANGED.to_string()), username.clone())
            .register(Route::Event(USER_CHANGE.to_string()), username);
        table
    }

    pub fn register(&mut self, route: Route, handler: Arc<dyn Handler>) -> &mut Self {
        self.routes.insert(route, handler);
        self
    }

    pub fn resolve(&self, event: &IncomingEvent) -> Option<Arc<dyn Handler>> {
        self.routes.get(&event.route()).cloned()
    }

    /// Spawn the matching handler. `None` when nothing is registered.
    pub fn dispatch(&self, event: IncomingEvent) -> Option<JoinHandle<()>> {
        let Some(handler) = self.resolve(&event) else {
            debug!(route = ?event.route(), "No handler registered; ignoring");
            return None;
        };

        Some(self.tasks.spawn(async move {
            let user = event.user().clone();
            if let Err(e) = handler.handle(event).await {
                error!(handler = handler.name(), user = %user, error = %e, "Handler failed");
            }
        }))
    }

    /// Handler tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Stop accepting work and wait up to `grace` for running handlers.
    ///
    /// Returns `false` if some were still running when `grace` ran out.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tasks.close();
        let pending = self.tasks.len();
        if pending > 0 {
            info!(pending, "Waiting for in-flight handlers");
        }
        match tokio::time::timeout(grace, self.tasks.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(pending = self.tasks.len(), "Handlers still running at shutdown");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChannelId, UserId},
        errors::Error,
        events::{ActionInvoked, ProfileChange},
        testing::{Call, FakePlatform},
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<IncomingEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl Handler for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn handle(&self, event: IncomingEvent) -> Result<()> {
            self.seen.lock().unwrap().push(event);
            if self.fail {
                return Err(Error::External("boom".to_string()));
            }
            Ok(())
        }
    }

    fn action(id: &str, user: &str) -> IncomingEvent {
        IncomingEvent::Action(ActionInvoked {
            action_id: id.to_string(),
            user: UserId::new(user),
        })
    }

    fn profile(event_type: &str, user: &str, name: Option<&str>) -> IncomingEvent {
        IncomingEvent::ProfileChanged(ProfileChange {
            event_type: event_type.to_string(),
            user: UserId::new(user),
            display_name: name.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn dispatches_by_route_key() {
        let rec = Arc::new(Recording::default());
        let mut table = HandlerTable::new();
        table.register(Route::Action("press".to_string()), rec.clone());

        table.dispatch(action("press", "U1")).unwrap().await.unwrap();
        assert!(table.dispatch(action("other", "U1")).is_none());
        assert!(table
            .dispatch(profile(USER_PROFILE_CHANGED, "U1", Some("x")))
            .is_none());

        assert_eq!(rec.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn handler_errors_stay_inside_the_task() {
        let rec = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let mut table = HandlerTable::new();
        table.register(Route::Action("press".to_string()), rec.clone());

        let joined = table.dispatch(action("press", "U1")).unwrap().await;
        assert!(joined.is_ok());
    }

    #[tokio::test]
    async fn moderator_table_routes_join_button_and_profile_events() {
        let platform = Arc::new(FakePlatform::new());
        let moderator = Moderator::new(platform.clone(), ChannelId::new("C1"), platform.bot());
        let table = HandlerTable::for_moderator(moderator);

        table
            .dispatch(profile(USER_PROFILE_CHANGED, "UBO", Some("Bo")))
            .unwrap()
            .await
            .unwrap();
        table
            .dispatch(profile(USER_CHANGE, "UAL", Some("Al")))
            .unwrap()
            .await
            .unwrap();
        table
            .dispatch(action(JOIN_ACTION_ID, "UBO"))
            .unwrap()
            .await
            .unwrap();

        let calls = platform.calls();
        assert_eq!(platform.posts()[0].channel, ChannelId::new("UBO"));
        assert_eq!(platform.posts()[1].channel, ChannelId::new("UAL"));
        assert!(calls.contains(&Call::Invite {
            channel: ChannelId::new("C1"),
            user: UserId::new("UBO"),
        }));
    }

    struct Slow {
        done: Mutex<bool>,
    }

    #[async_trait]
    impl Handler for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn handle(&self, _event: IncomingEvent) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            *self.done.lock().unwrap() = true;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_in_flight_handlers() {
        let slow = Arc::new(Slow {
            done: Mutex::new(false),
        });
        let mut table = HandlerTable::new();
        table.register(Route::Action("press".to_string()), slow.clone());

        let _ = table.dispatch(action("press", "U1"));
        assert_eq!(table.in_flight(), 1);

        assert!(table.drain(Duration::from_secs(30)).await);
        assert!(*slow.done.lock().unwrap());
        assert_eq!(table.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_gives_up_after_the_grace_period() {
        let slow = Arc::new(Slow {
            done: Mutex::new(false),
        });
        let mut table = HandlerTable::new();
        table.register(Route::Action("press".to_string()), slow.clone());

        let _ = table.dispatch(action("press", "U1"));
        assert!(!table.drain(Duration::from_secs(1)).await);
        assert!(!*slow.done.lock().unwrap());
    }

    #[tokio::test]
    async fn both_profile_events_share_one_handler() {
        let platform = Arc::new(FakePlatform::new());
        let moderator = Moderator::new(platform.clone(), ChannelId::new("C1"), platform.bot());
        let table = HandlerTable::for_moderator(moderator);

        let a = table
            .resolve(&profile(USER_PROFILE_CHANGED, "UBO", Some("Bo")))
            .unwrap();
        let b = table.resolve(&profile(USER_CHANGE, "UBO", Some("Bo"))).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        // Subscribed to both, one edit is handled twice.
        table
            .dispatch(profile(USER_PROFILE_CHANGED, "UBO", Some("Bo")))
            .unwrap()
            .await
            .unwrap();
        table
            .dispatch(profile(USER_CHANGE, "UBO", Some("Bo")))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(platform.posts().len(), 2);
    }

    #[tokio::test]
    async fn profile_event_without_display_name_is_ignored() {
        let platform = Arc::new(FakePlatform::new());
        let moderator = Moderator::new(platform.clone(), ChannelId::new("C1"), platform.bot());
        let table = HandlerTable::for_moderator(moderator);

        table
            .dispatch(profile(USER_PROFILE_CHANGED, "UBO", None))
            .unwrap()
            .await
            .unwrap();
        assert!(platform.calls().is_empty());
    }
}
