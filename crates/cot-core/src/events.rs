//! Platform-neutral inbound events, as produced by the ingress adapter.

use crate::domain::UserId;

pub const USER_PROFILE_CHANGED: &str = "user_profile_changed";
pub const USER_CHANGE: &str = "user_change";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncomingEvent {
    ProfileChanged(ProfileChange),
    Action(ActionInvoked),
}

/// A user's profile changed. `display_name` is `None` when the payload
/// carried no such field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileChange {
    pub event_type: String,
    pub user: UserId,
    pub display_name: Option<String>,
}

/// An interactive component (button) was used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionInvoked {
    pub action_id: String,
    pub user: UserId,
}

/// Key a handler is registered under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Event(String),
    Action(String),
}

impl IncomingEvent {
    pub fn route(&self) -> Route {
        match self {
            IncomingEvent::ProfileChanged(p) => Route::Event(p.event_type.clone()),
            IncomingEvent::Action(a) => Route::Action(a.action_id.clone()),
        }
    }

    pub fn user(&self) -> &UserId {
        match self {
            IncomingEvent::ProfileChanged(p) => &p.user,
            IncomingEvent::Action(a) => &a.user,
        }
    }
}
