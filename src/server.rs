//! HTTP server: the webhook endpoint pair and a health check.
//!
//! `GET /webhook` serves the provider's one-time subscription handshake,
//! `POST /webhook` receives event envelopes. Every request resolves to a
//! response; nothing propagates out of the handlers.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use courier_core::config::{keys, ServerConfig};
use courier_store::Store;
use courier_whatsapp::verify::{verify_subscription, VerifyOutcome};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::processor::EventProcessor;

/// Fixed webhook path the provider is pointed at.
pub const WEBHOOK_PATH: &str = "/webhook";

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub processor: Arc<EventProcessor>,
    pub uptime: Instant,
}

/// Query parameters of the subscription handshake.
#[derive(Debug, Deserialize)]
struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Constant-time string comparison to prevent timing attacks on secret
/// validation.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// `GET /health` — health check with uptime.
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime.elapsed().as_secs(),
    }))
}

/// `GET /webhook` — subscription handshake.
///
/// An unset verify token is a configuration error (500), distinct from a
/// verification failure (403) or missing parameters (400).
async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyQuery>,
) -> (StatusCode, String) {
    let expected = match state.store.config_value(keys::VERIFY_TOKEN).await {
        Ok(v) => v,
        Err(e) => {
            error!("verify token lookup failed: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration Error".to_string(),
            );
        }
    };

    let Some(expected) = expected.filter(|t| !t.trim().is_empty()) else {
        error!("verify_token not configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Configuration Error".to_string(),
        );
    };

    match verify_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        &expected,
    ) {
        VerifyOutcome::Verified(challenge) => {
            info!("webhook verified");
            (StatusCode::OK, challenge)
        }
        VerifyOutcome::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
        VerifyOutcome::BadRequest => (StatusCode::BAD_REQUEST, "Bad Request".to_string()),
    }
}

/// `POST /webhook` — event ingestion.
async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    // One configuration fetch per call; the map also feeds the processor.
    let config = match state.store.config_map().await {
        Ok(c) => c,
        Err(e) => {
            error!("configuration fetch failed: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration Error".to_string(),
            )
                .into_response();
        }
    };

    if let Some(secret) = config.get(keys::WEBHOOK_SECRET) {
        let provided = headers
            .get("x-webhook-secret")
            .and_then(|v| v.to_str().ok());
        match provided {
            Some(provided) if constant_time_eq(provided, secret) => {}
            _ => {
                warn!("webhook secret mismatch");
                return (StatusCode::FORBIDDEN, "Forbidden".to_string()).into_response();
            }
        }
    }

    let envelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("unparseable webhook body: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("invalid payload: {e}")})),
            )
                .into_response();
        }
    };

    match state.processor.process(&envelope, &config).await {
        Ok(()) => (StatusCode::OK, "EVENT_RECEIVED".to_string()).into_response(),
        Err(e) => {
            error!("webhook processing failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Build the axum router with shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(WEBHOOK_PATH, get(verify).post(receive))
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: &ServerConfig, state: AppState) {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("server failed to bind to {addr}: {e}");
            return;
        }
    };

    info!("webhook server listening on {addr}");

    if let Err(e) = axum::serve(listener, app).await {
        error!("server error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use courier_core::error::CourierError;
    use courier_core::model::{DeliveryStatus, Direction};
    use courier_core::traits::{
        CompletionProvider, CompletionRequest, OutboundSender, SendRequest,
    };
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    // -----------------------------------------------------------------------
    // Mock collaborators
    // -----------------------------------------------------------------------

    struct MockCompletion;

    #[async_trait]
    impl CompletionProvider for MockCompletion {
        fn name(&self) -> &str {
            "mock-completion"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, CourierError> {
            Ok(format!("re: {}", request.text))
        }
    }

    struct MockSender {
        sent: Arc<Mutex<Vec<SendRequest>>>,
    }

    #[async_trait]
    impl OutboundSender for MockSender {
        fn name(&self) -> &str {
            "mock-sender"
        }

        async fn send_text(&self, request: &SendRequest) -> Result<Option<String>, CourierError> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(Some("wamid.reply.1".to_string()))
        }
    }

    // -----------------------------------------------------------------------
    // Test helpers
    // -----------------------------------------------------------------------

    async fn test_state() -> (AppState, Arc<Mutex<Vec<SendRequest>>>) {
        let store = Store::in_memory().await.unwrap();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let processor = EventProcessor::new(
            store.clone(),
            Arc::new(MockCompletion),
            Arc::new(MockSender {
                sent: Arc::clone(&sent),
            }),
        );
        (
            AppState {
                store,
                processor: Arc::new(processor),
                uptime: Instant::now(),
            },
            sent,
        )
    }

    fn post_webhook(body: &str) -> Request<Body> {
        Request::post(WEBHOOK_PATH)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(resp: axum::http::Response<Body>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(resp: axum::http::Response<Body>) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn text_envelope(body: &str) -> String {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "entry-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "contacts": [{"wa_id": "+51999999999", "profile": {"name": "Maria"}}],
                        "messages": [{
                            "from": "+51999999999",
                            "id": "wamid.1",
                            "timestamp": "1700000000",
                            "type": "text",
                            "text": {"body": body}
                        }]
                    }
                }]
            }]
        })
        .to_string()
    }

    // -----------------------------------------------------------------------
    // Verification handshake
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_verify_ok() {
        let (state, _sent) = test_state().await;
        state
            .store
            .set_config(keys::VERIFY_TOKEN, Some("my-token"), "")
            .await
            .unwrap();
        let app = build_router(state);

        let req = Request::get(
            "/webhook?hub.mode=subscribe&hub.verify_token=my-token&hub.challenge=challenge-123",
        )
        .body(Body::empty())
        .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "challenge-123");
    }

    #[tokio::test]
    async fn test_verify_wrong_token_forbidden() {
        let (state, _sent) = test_state().await;
        state
            .store
            .set_config(keys::VERIFY_TOKEN, Some("my-token"), "")
            .await
            .unwrap();
        let app = build_router(state);

        let req = Request::get(
            "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=challenge-123",
        )
        .body(Body::empty())
        .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_verify_missing_params_bad_request() {
        let (state, _sent) = test_state().await;
        state
            .store
            .set_config(keys::VERIFY_TOKEN, Some("my-token"), "")
            .await
            .unwrap();
        let app = build_router(state);

        let req = Request::get("/webhook?hub.challenge=challenge-123")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_verify_unconfigured_token_is_500() {
        let (state, _sent) = test_state().await;
        let app = build_router(state);

        let req = Request::get(
            "/webhook?hub.mode=subscribe&hub.verify_token=my-token&hub.challenge=challenge-123",
        )
        .body(Body::empty())
        .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(resp).await, "Configuration Error");
    }

    // -----------------------------------------------------------------------
    // Event ingestion
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_post_text_message_end_to_end() {
        let (state, _sent) = test_state().await;
        let store = state.store.clone();
        let app = build_router(state);

        let resp = app.oneshot(post_webhook(&text_envelope("hola"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "EVENT_RECEIVED");

        let contact = store
            .find_contact_by_phone("+51999999999")
            .await
            .unwrap()
            .expect("contact row should exist");
        let chats = store.chats_for_contact(&contact.id).await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].direction, Direction::Incoming);
        assert_eq!(chats[0].message, "hola");
        assert_eq!(chats[0].status, DeliveryStatus::Delivered);
        assert_eq!(chats[0].contact_id, contact.id);
    }

    #[tokio::test]
    async fn test_post_with_completion_configured_sends_reply() {
        let (state, sent) = test_state().await;
        let store = state.store.clone();
        store
            .set_config(keys::COMPLETION_API_KEY, Some("sk-test"), "")
            .await
            .unwrap();
        store
            .set_config(keys::WHATSAPP_API_URL, Some("https://graph.test/messages"), "")
            .await
            .unwrap();
        store
            .set_config(keys::WHATSAPP_ACCESS_TOKEN, Some("token"), "")
            .await
            .unwrap();
        let app = build_router(state);

        let resp = app.oneshot(post_webhook(&text_envelope("hola"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let contact = store
            .find_contact_by_phone("+51999999999")
            .await
            .unwrap()
            .unwrap();
        let chats = store.chats_for_contact(&contact.id).await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[1].direction, Direction::Outgoing);
        assert_eq!(chats[1].message, "re: hola");

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "+51999999999");
    }

    #[tokio::test]
    async fn test_post_wrong_object_is_500_with_error_body() {
        let (state, _sent) = test_state().await;
        let app = build_router(state);

        let body = json!({"object": "instagram_account", "entry": []}).to_string();
        let resp = app.oneshot(post_webhook(&body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(resp).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("unexpected webhook object"));
    }

    #[tokio::test]
    async fn test_post_invalid_json_is_400() {
        let (state, _sent) = test_state().await;
        let app = build_router(state);

        let resp = app.oneshot(post_webhook("not json at all")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("invalid payload"));
    }

    #[tokio::test]
    async fn test_post_secret_checked_when_configured() {
        let (state, _sent) = test_state().await;
        let store = state.store.clone();
        store
            .set_config(keys::WEBHOOK_SECRET, Some("shh"), "")
            .await
            .unwrap();
        let app = build_router(state);

        // Missing header.
        let resp = app
            .clone()
            .oneshot(post_webhook(&text_envelope("hola")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // Wrong header.
        let req = Request::post(WEBHOOK_PATH)
            .header("Content-Type", "application/json")
            .header("x-webhook-secret", "wrong")
            .body(Body::from(text_envelope("hola")))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // Matching header.
        let req = Request::post(WEBHOOK_PATH)
            .header("Content-Type", "application/json")
            .header("x-webhook-secret", "shh")
            .body(Body::from(text_envelope("hola")))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // Nothing persisted for the rejected deliveries.
        let contact = store
            .find_contact_by_phone("+51999999999")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.chats_for_contact(&contact.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_post_without_secret_configured_allows_all() {
        let (state, _sent) = test_state().await;
        let app = build_router(state);

        let resp = app.oneshot(post_webhook(&text_envelope("hola"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_callback_round_trip() {
        let (state, _sent) = test_state().await;
        let store = state.store.clone();
        let app = build_router(state);

        let contact = store.resolve_contact("+51999999999", None).await.unwrap();
        store
            .insert_outgoing(&contact.id, "reply", Some("wamid.out"), &json!({}))
            .await
            .unwrap();

        let body = json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "field": "message_status",
                    "value": {
                        "statuses": [{"id": "wamid.out", "status": "read", "timestamp": "1", "recipient_id": "+51999999999"}]
                    }
                }]
            }]
        })
        .to_string();
        let resp = app.oneshot(post_webhook(&body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let chat = store
            .find_chat_by_provider_id("wamid.out")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chat.status, DeliveryStatus::Read);
    }

    // -----------------------------------------------------------------------
    // Surface shape
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_other_methods_are_405() {
        let (state, _sent) = test_state().await;
        let app = build_router(state);

        let req = Request::put(WEBHOOK_PATH)
            .body(Body::from("{}".to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _sent) = test_state().await;
        let app = build_router(state);

        let req = Request::get("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "secrets"));
        assert!(!constant_time_eq("secret", "secreT"));
        assert!(constant_time_eq("", ""));
    }
}
