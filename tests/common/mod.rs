#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower::ServiceExt;

use noticeboard::config::{AppConfig, StoreBackend};
use noticeboard::infra::store::{Body as DocumentBody, DocumentCollection, DocumentId, MemoryCollection};
use noticeboard::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// "0123456789abcdef0123456789abcdef" (32 bytes, test-only)
const TEST_PASETO_ACCESS_KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";
pub const TEST_ADMIN_TOKEN: &str = "test-admin-token-12345";

// ---------------------------------------------------------------------------
// TestApp: one per test, backed by an in-memory collection
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: MemoryCollection,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        http_addr: "127.0.0.1:0".into(),
        store_backend: StoreBackend::Memory,
        database_url: None,
        db_max_connections: 1,
        db_connect_timeout_seconds: 5,
        db_idle_timeout_seconds: 0,
        db_max_lifetime_seconds: 60,
        announcements_collection: "announcements".into(),
        admin_token: Some(TEST_ADMIN_TOKEN.into()),
        paseto_access_key: TEST_PASETO_ACCESS_KEY,
        access_ttl_minutes: 15,
    }
}

pub fn app() -> TestApp {
    TestApp::with_config(test_config())
}

pub fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).expect("format timestamp")
}

impl TestApp {
    pub fn with_config(config: AppConfig) -> Self {
        let store = MemoryCollection::new();
        let state = AppState::new(Arc::new(store.clone()), &config);
        let router = noticeboard::http::router(state.clone());
        TestApp {
            router,
            state,
            store,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub async fn put_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::PUT, path, Some(body), &headers).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::DELETE, path, None, &headers).await
    }

    /// POST with an admin token in the x-admin-token header.
    pub async fn post_admin(
        &self,
        path: &str,
        body: Value,
        admin_token: Option<&str>,
    ) -> TestResponse {
        let mut headers = vec![];
        if let Some(t) = admin_token {
            headers.push(("x-admin-token", t));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Issue an access token directly (skips the admin endpoint).
    pub fn token_for(&self, username: &str) -> String {
        self.state
            .auth
            .issue_access_token(username)
            .expect("issue_access_token failed")
            .token
    }

    /// Insert a raw document, bypassing validation.
    pub async fn seed(&self, body: Value) -> DocumentId {
        let body: DocumentBody = match body {
            Value::Object(map) => map,
            other => panic!("seed expects an object, got {}", other),
        };
        self.store.insert_one(body).await.expect("seed insert failed")
    }

    /// Create an announcement through the API. Returns its id.
    pub async fn create_announcement(&self, token: &str, body: Value) -> String {
        let resp = self.post_json("/announcements/", body, Some(token)).await;
        assert_eq!(resp.status, StatusCode::CREATED, "create failed: {:?}", resp.json());
        resp.json()["id"]
            .as_str()
            .expect("id missing from create response")
            .to_string()
    }

    /// Fetch the stored body for an id, for direct assertions.
    pub async fn stored(&self, id: &str) -> Option<DocumentBody> {
        let id: DocumentId = id.parse().ok()?;
        self.store.get(id).await
    }
}
