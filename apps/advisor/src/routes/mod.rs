pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::advice::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat API
        .route("/api/v1/chat/message", post(handlers::handle_chat_message))
        .route("/api/v1/chat/click", post(handlers::handle_product_click))
        // Admin API
        .route(
            "/api/v1/admin/cache/clear",
            post(handlers::handle_clear_cache),
        )
        .route(
            "/api/v1/admin/test-connection",
            post(handlers::handle_test_connection),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::advice::orchestrator::tests::{knee_catalog, StubGateway, KNEE_ADVICE};
    use crate::config::Config;
    use crate::rate_limit::InMemoryRateLimiter;
    use crate::sessions::InMemoryConversationStore;

    fn config(admin_token: Option<&str>) -> Config {
        let mut vars: HashMap<&str, String> = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/advisor".to_string()),
            ("REDIS_URL", "redis://localhost".to_string()),
            ("OPENAI_API_KEY", "sk-test".to_string()),
        ]);
        if let Some(token) = admin_token {
            vars.insert("ADMIN_TOKEN", token.to_string());
        }
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    fn router(max_requests: u32, admin_token: Option<&str>) -> Router {
        router_with_store(
            max_requests,
            admin_token,
            Arc::new(InMemoryConversationStore::new()),
        )
    }

    fn router_with_store(
        max_requests: u32,
        admin_token: Option<&str>,
        store: Arc<InMemoryConversationStore>,
    ) -> Router {
        let state = AppState::new(
            config(admin_token),
            Arc::new(knee_catalog()),
            Arc::new(StubGateway::replying(KNEE_ADVICE)),
            store,
            Arc::new(InMemoryRateLimiter::new(
                max_requests,
                Duration::from_secs(60),
            )),
        );
        build_router(state)
    }

    fn chat_request(body: Value) -> Request<Body> {
        post_json("/api/v1/chat/message", body.to_string())
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.9")
            .header("user-agent", "Mozilla/5.0")
            .body(Body::from(body))
            .unwrap()
    }

    fn admin_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(token) = token {
            builder = builder.header("x-admin-token", token);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(10, None)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "advisor");
    }

    #[tokio::test]
    async fn test_chat_message_returns_enriched_advice() {
        let response = router(10, None)
            .oneshot(chat_request(json!({
                "message": "mijn knie doet heel veel pijn na het hardlopen"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        assert!(body["session_id"].as_str().unwrap().starts_with("bw_"));
        assert_eq!(body["tokens_used"], 321);
        let advice = &body["response"];
        assert_eq!(advice["message_type"], "advice");
        assert_eq!(advice["severity_warning"], true);
        assert_eq!(
            advice["product_recommendation"]["product_data"]["name"],
            "Kniebrace Sport"
        );
        assert_eq!(advice["related_blogs_data"][0]["id"], 3);
    }

    #[tokio::test]
    async fn test_empty_message_is_validation_error() {
        let response = router(10, None)
            .oneshot(chat_request(json!({"message": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_mistyped_body_uses_error_envelope() {
        let response = router(10, None)
            .oneshot(chat_request(json!({"message": 5})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        let message = body["error"]["message"].as_str().unwrap();
        assert!(!message.contains("invalid type"));
    }

    #[tokio::test]
    async fn test_unparseable_body_uses_error_envelope() {
        let response = router(10, None)
            .oneshot(post_json("/api/v1/chat/message", "{not json".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_chat_records_client_and_click() {
        let store = Arc::new(InMemoryConversationStore::new());
        let app = router_with_store(10, None, store.clone());

        let response = app
            .clone()
            .oneshot(chat_request(json!({
                "message": "mijn knie doet pijn na het hardlopen"
            })))
            .await
            .unwrap();
        let session_id = read_json(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string();

        let record = store.session(&session_id).unwrap();
        assert_eq!(record.client.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(record.client.user_agent.as_deref(), Some("Mozilla/5.0"));

        let response = app
            .oneshot(post_json(
                "/api/v1/chat/click",
                json!({"session_id": session_id, "product_id": 12}).to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["tracked"], true);
        assert_eq!(store.session(&session_id).unwrap().clicked, vec![12]);
    }

    #[tokio::test]
    async fn test_click_requires_session_and_product() {
        let app = router(10, None);
        for body in [
            json!({"session_id": "", "product_id": 12}),
            json!({"session_id": "bw_abc", "product_id": 0}),
            json!({"session_id": "bw_abc"}),
        ] {
            let response = app
                .clone()
                .oneshot(post_json("/api/v1/chat/click", body.to_string()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(read_json(response).await["error"]["code"], "validation_error");
        }
    }

    #[tokio::test]
    async fn test_click_for_unknown_recommendation_is_not_tracked() {
        let response = router(10, None)
            .oneshot(post_json(
                "/api/v1/chat/click",
                json!({"session_id": "bw_abc", "product_id": 12}).to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["tracked"], false);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_before_generation() {
        let app = router(0, None);
        let response = app
            .oneshot(chat_request(json!({"message": "knie"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(read_json(response).await["error"]["code"], "rate_limited");
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let app = router(10, Some("s3cret"));

        let response = app
            .clone()
            .oneshot(admin_request("/api/v1/admin/cache/clear", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(read_json(response).await["error"]["code"], "forbidden");

        let response = app
            .clone()
            .oneshot(admin_request("/api/v1/admin/cache/clear", Some("s3cret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["cleared"], true);

        let response = app
            .oneshot(admin_request("/api/v1/admin/test-connection", Some("s3cret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["model"], "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_admin_routes_closed_without_configured_token() {
        let response = router(10, None)
            .oneshot(admin_request("/api/v1/admin/test-connection", Some("")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
