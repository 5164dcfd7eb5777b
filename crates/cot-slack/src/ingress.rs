//! Turns verified Slack request bodies into core `IncomingEvent`s.

use cot_core::{
    domain::UserId,
    errors::Error,
    events::{ActionInvoked, IncomingEvent, ProfileChange, USER_CHANGE, USER_PROFILE_CHANGED},
    Result,
};

use crate::api::{EventsApiBody, InteractionForm, InteractionPayload, UserEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Events API endpoint check; echo the challenge back.
    Challenge(String),
    /// Zero or more events to dispatch. Empty for payloads the bot ignores.
    Events(Vec<IncomingEvent>),
}

pub fn parse_inbound(content_type: Option<&str>, body: &[u8]) -> Result<Inbound> {
    let is_form = content_type
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if is_form {
        parse_interaction(body)
    } else {
        parse_events_api(body)
    }
}

fn parse_events_api(body: &[u8]) -> Result<Inbound> {
    match serde_json::from_slice::<EventsApiBody>(body)? {
        EventsApiBody::UrlVerification { challenge } => Ok(Inbound::Challenge(challenge)),
        EventsApiBody::EventCallback { event } => Ok(Inbound::Events(
            parse_event(event)?.into_iter().collect(),
        )),
        EventsApiBody::Other => Ok(Inbound::Events(Vec::new())),
    }
}

fn parse_event(event: serde_json::Value) -> Result<Option<IncomingEvent>> {
    let event_type = event
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string();

    if event_type != USER_PROFILE_CHANGED && event_type != USER_CHANGE {
        tracing::debug!(event_type = %event_type, "Ignoring unsubscribed event type");
        return Ok(None);
    }

    let parsed: UserEvent = serde_json::from_value(event)?;
    Ok(Some(IncomingEvent::ProfileChanged(ProfileChange {
        event_type,
        user: UserId(parsed.user.id),
        display_name: parsed.user.profile.and_then(|p| p.display_name),
    })))
}

fn parse_interaction(body: &[u8]) -> Result<Inbound> {
    let form: InteractionForm = serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::External(format!("malformed interaction form: {e}")))?;

    match serde_json::from_str::<InteractionPayload>(&form.payload)? {
        InteractionPayload::BlockActions { user, actions } => Ok(Inbound::Events(
            actions
                .into_iter()
                .map(|a| {
                    IncomingEvent::Action(ActionInvoked {
                        action_id: a.action_id,
                        user: UserId(user.id.clone()),
                    })
                })
                .collect(),
        )),
        InteractionPayload::Other => Ok(Inbound::Events(Vec::new())),
    }
}
