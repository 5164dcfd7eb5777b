use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use cot_core::{
    config::Config, handlers::HandlerTable, moderator::Moderator, platform::port::ChatPlatform,
};

use crate::{
    ingress::{parse_inbound, Inbound},
    signature::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER},
    SlackClient,
};

/// Single endpoint for Events API callbacks and interactivity posts.
pub const EVENTS_PATH: &str = "/slack/events";

/// How long shutdown waits for handlers that are still running.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<SignatureVerifier>,
    pub handlers: Arc<HandlerTable>,
}

impl AppState {
    pub fn new(signing_secret: &str, handlers: HandlerTable) -> Self {
        Self {
            verifier: Arc::new(SignatureVerifier::new(signing_secret)),
            handlers: Arc::new(handlers),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route(EVENTS_PATH, post(slack_events))
        .with_state(state)
}

/// Verify, parse, hand off, acknowledge. Handlers run after the response.
async fn slack_events(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let signature = header_str(&headers, SIGNATURE_HEADER);
    let now = chrono::Utc::now().timestamp();

    if let Err(e) = state.verifier.verify(timestamp, signature, &body, now) {
        warn!(error = %e, "Rejected Slack request");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    match parse_inbound(header_str(&headers, CONTENT_TYPE.as_str()), &body) {
        Ok(Inbound::Challenge(challenge)) => {
            info!("Answering url_verification challenge");
            Json(serde_json::json!({ "challenge": challenge })).into_response()
        }
        Ok(Inbound::Events(events)) => {
            for event in events {
                // Tracked by the table; the handler's own task logs its failures.
                let _ = state.handlers.dispatch(event);
            }
            StatusCode::OK.into_response()
        }
        Err(e) => {
            warn!(error = %e, "Malformed Slack payload");
            (StatusCode::BAD_REQUEST, "malformed payload").into_response()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Wire everything together and serve until Ctrl-C.
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    let client = Arc::new(SlackClient::from_config(&cfg)?);

    let bot = match &cfg.slack_bot_user_id {
        Some(id) => id.clone(),
        None => client
            .bot_identity()
            .await
            .context("SLACK_BOT_USER_ID is not set and auth.test failed")?,
    };
    info!(bot = %bot, channel = %cfg.secret_channel, "Bot identity resolved");

    let moderator = Moderator::new(client, cfg.secret_channel.clone(), bot);
    let members = moderator
        .start()
        .await
        .context("initial members fetch failed")?;
    info!(members, "Members cache primed");

    let state = AppState::new(
        &cfg.slack_signing_secret,
        HandlerTable::for_moderator(moderator),
    );
    let handlers = state.handlers.clone();
    let app = build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, path = EVENTS_PATH, "⚡️ Cult of Threes bot is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    handlers.drain(SHUTDOWN_GRACE).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use cot_core::{domain::ChannelId, testing::FakePlatform};
    use tower::util::ServiceExt;

    const SECRET: &str = "signing-secret";

    fn app() -> Router {
        let platform = Arc::new(FakePlatform::new());
        let moderator = Moderator::new(platform.clone(), ChannelId::new("C1"), platform.bot());
        build_app(AppState::new(SECRET, HandlerTable::for_moderator(moderator)))
    }

    fn signed(body: &str, secret: &str, ts: i64) -> Request<Body> {
        let ts = ts.to_string();
        let sig = SignatureVerifier::new(secret)
            .sign(&ts, body.as_bytes())
            .unwrap();
        Request::builder()
            .method("POST")
            .uri(EVENTS_PATH)
            .header("content-type", "application/json")
            .header(TIMESTAMP_HEADER, ts)
            .header(SIGNATURE_HEADER, sig)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn challenge_is_echoed() {
        let body = r#"{"type":"url_verification","challenge":"xyz"}"#;
        let resp = app()
            .oneshot(signed(body, SECRET, chrono::Utc::now().timestamp()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["challenge"], "xyz");
    }

    #[tokio::test]
    async fn bad_signature_is_unauthorized() {
        let body = r#"{"type":"url_verification","challenge":"xyz"}"#;
        let resp = app()
            .oneshot(signed(body, "wrong-secret", chrono::Utc::now().timestamp()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn stale_request_is_unauthorized() {
        let body = r#"{"type":"url_verification","challenge":"xyz"}"#;
        let resp = app()
            .oneshot(signed(body, SECRET, chrono::Utc::now().timestamp() - 3600))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unsigned_request_is_unauthorized() {
        let req = Request::builder()
            .method("POST")
            .uri(EVENTS_PATH)
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_payload_is_bad_request() {
        let resp = app()
            .oneshot(signed("not json", SECRET, chrono::Utc::now().timestamp()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dispatched_handlers_are_drained_on_shutdown() {
        let platform = Arc::new(FakePlatform::new());
        let moderator = Moderator::new(platform.clone(), ChannelId::new("C1"), platform.bot());
        let state = AppState::new(SECRET, HandlerTable::for_moderator(moderator));
        let handlers = state.handlers.clone();

        let body = r#"{"type":"event_callback","event":{"type":"user_profile_changed","user":{"id":"UBO","profile":{"display_name":"Bo"}}}}"#;
        let resp = build_app(state)
            .oneshot(signed(body, SECRET, chrono::Utc::now().timestamp()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        assert!(handlers.drain(Duration::from_secs(5)).await);
        assert_eq!(handlers.in_flight(), 0);
        assert_eq!(platform.posts().len(), 1);
    }

    #[tokio::test]
    async fn unknown_event_is_acknowledged() {
        let body = r#"{"type":"event_callback","event":{"type":"reaction_added","user":"U1"}}"#;
        let resp = app()
            .oneshot(signed(body, SECRET, chrono::Utc::now().timestamp()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
