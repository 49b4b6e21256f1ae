//! HTTP server wiring.
//!
//! One public webhook endpoint plus the admin routes. The webhook rejects
//! unsigned traffic before the body is ever parsed.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tracing::{debug, warn};

use makro_core::Interaction;

use crate::{AppState, admin, router, verify};

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health).post(interactions))
        .route("/admin/register-base", post(admin::register_base))
        .route("/admin/reset-commands", post(admin::reset_commands))
        .route("/admin/guild-limit", post(admin::guild_limit))
        .route("/admin/guild-ban", post(admin::guild_ban))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))).into_response()
}

async fn health() -> &'static str {
    "ok"
}

async fn interactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    let (Some(signature), Some(timestamp)) = (header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER))
    else {
        warn!("interaction without signature headers");
        return (StatusCode::UNAUTHORIZED, "missing request signature").into_response();
    };
    if !verify::verify(&body, signature, timestamp, &state.public_key) {
        warn!("interaction failed signature verification");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(err) => {
            warn!(error = %err, "undecodable interaction payload");
            return (StatusCode::BAD_REQUEST, "malformed interaction").into_response();
        }
    };
    debug!(kind = interaction.raw_kind, "interaction received");
    Json(router::route(&state, interaction).await).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use ed25519_dalek::{Signer, SigningKey};
    use tower::ServiceExt;

    use crate::AppState;
    use crate::admin::AdminAuth;
    use crate::testutil::StubRegistry;
    use makro_store::MakroStore;

    fn signed_state() -> (Arc<AppState>, SigningKey) {
        let signing = SigningKey::from_bytes(&[9u8; 32]);
        let state = Arc::new(AppState {
            store: Arc::new(MakroStore::in_memory(50).unwrap()),
            registry: Arc::new(StubRegistry::default()),
            public_key: signing.verifying_key().to_bytes().to_vec(),
            admin: AdminAuth::resolve(Some("test-secret".to_string())),
        });
        (state, signing)
    }

    fn signed_request(signing: &SigningKey, body: &str) -> Request<Body> {
        let timestamp = "1700000000";
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body.as_bytes());
        let signature = hex::encode(signing.sign(&message).to_bytes());
        Request::builder()
            .method("POST")
            .uri("/")
            .header("x-signature-ed25519", signature)
            .header("x-signature-timestamp", timestamp)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn signed_ping_gets_pong() {
        let (state, signing) = signed_state();
        let response = super::app(state)
            .oneshot(signed_request(&signing, r#"{"type":1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(response).await, serde_json::json!({ "type": 1 }));
    }

    #[tokio::test]
    async fn unsigned_requests_are_unauthorized() {
        let (state, _) = signed_state();
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"type":1}"#))
            .unwrap();
        let response = super::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), 401);
    }

    #[tokio::test]
    async fn forged_signatures_are_unauthorized() {
        let (state, _) = signed_state();
        let forger = SigningKey::from_bytes(&[1u8; 32]);
        let response = super::app(state)
            .oneshot(signed_request(&forger, r#"{"type":1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), 401);
    }

    #[tokio::test]
    async fn garbage_bodies_with_valid_signatures_are_bad_requests() {
        let (state, signing) = signed_state();
        let response = super::app(state)
            .oneshot(signed_request(&signing, "not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn health_check_answers_without_a_signature() {
        let (state, _) = signed_state();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = super::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn admin_routes_require_the_secret() {
        let (state, _) = signed_state();
        let request = Request::builder()
            .method("POST")
            .uri("/admin/register-base")
            .body(Body::empty())
            .unwrap();
        let response = super::app(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), 401);

        let request = Request::builder()
            .method("POST")
            .uri("/admin/register-base?secret=test-secret")
            .body(Body::empty())
            .unwrap();
        let response = super::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn admin_reset_reports_per_guild_status() {
        let (state, _) = signed_state();
        let request = Request::builder()
            .method("POST")
            .uri("/admin/reset-commands?secret=test-secret")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"guildId":"g1"}"#))
            .unwrap();
        let response = super::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), 200);
        let body = body_json(response).await;
        assert_eq!(body["global"], serde_json::json!("ok"));
        assert_eq!(body["guilds"][0]["status"], serde_json::json!("ok"));
        assert_eq!(body["guilds"][0]["recreated"], serde_json::json!(0));
    }

    #[tokio::test]
    async fn admin_ban_validates_its_payload() {
        let (state, _) = signed_state();
        let request = Request::builder()
            .method("POST")
            .uri("/admin/guild-ban?secret=test-secret")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"guildId":"g1","banned":"maybe"}"#))
            .unwrap();
        let response = super::app(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), 400);

        let request = Request::builder()
            .method("POST")
            .uri("/admin/guild-ban?secret=test-secret")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"guildId":"g1","banned":"yes"}"#))
            .unwrap();
        let response = super::app(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), 200);
        let policy = state.store.ensure_guild("g1").await.unwrap();
        assert!(policy.banned);
    }
}
