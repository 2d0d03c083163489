//! Common test utilities for driving the server in-process.
//!
//! Builds the full router with a mock engine and a temp-file database, so
//! tests cover everything except the real transmission daemon.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use driftwood_core::{
    create_authenticator, testing::MockEngineClient, AuthConfig, AuthMethod, Config,
    DatabaseConfig, EngineClient, EngineConfig, Reconciler, RecordStore, ServerConfig,
    SqliteRecordStore, TokenConfig, TokenService, TorrentCoordinator,
};
use driftwood_server::api::create_router;
use driftwood_server::state::AppState;

pub const TEST_SIGNING_KEY: &str = "server-test-signing-key-0123456789";

/// Response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// In-process server with a scriptable engine.
pub struct TestFixture {
    pub router: Router,
    pub engine: Arc<MockEngineClient>,
    pub tokens: Arc<TokenService>,
    /// Holds the database file for the fixture's lifetime.
    pub temp_dir: TempDir,
    /// Bearer credential attached to every request, if any.
    auth_header: Option<String>,
}

impl TestFixture {
    /// Fixture with auth disabled.
    pub async fn new() -> Self {
        Self::build(AuthMethod::None, None).await
    }

    /// Fixture requiring the given API key on protected routes.
    pub async fn with_api_key(key: &str) -> Self {
        let mut fixture = Self::build(AuthMethod::ApiKey, Some(key.to_string())).await;
        fixture.auth_header = Some(format!("Bearer {}", key));
        fixture
    }

    /// Stop sending credentials (to test rejection paths).
    pub fn without_credentials(mut self) -> Self {
        self.auth_header = None;
        self
    }

    async fn build(method: AuthMethod, api_key: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            auth: AuthConfig {
                method,
                api_key: api_key.clone(),
            },
            server: ServerConfig::default(),
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            engine: EngineConfig {
                url: "http://localhost:9091".to_string(),
                username: None,
                password: None,
                timeout_secs: 5,
            },
            token: TokenConfig {
                signing_key: TEST_SIGNING_KEY.to_string(),
            },
        };

        let records: Arc<dyn RecordStore> = Arc::new(
            SqliteRecordStore::new(&db_path).expect("Failed to create record store"),
        );
        let engine = Arc::new(MockEngineClient::new());
        let tokens = Arc::new(TokenService::new(TEST_SIGNING_KEY));

        let authenticator =
            Arc::from(create_authenticator(&config.auth).expect("Failed to create authenticator"));
        let reconciler = Reconciler::new(
            Arc::clone(&records),
            Arc::clone(&engine) as Arc<dyn EngineClient>,
        );
        let coordinator = TorrentCoordinator::new(
            Arc::clone(&engine) as Arc<dyn EngineClient>,
            Arc::clone(&records),
            Arc::clone(&tokens),
        );

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            reconciler,
            coordinator,
            Arc::clone(&tokens),
        ));

        Self {
            router: create_router(state),
            engine,
            tokens,
            temp_dir,
            auth_header: None,
        }
    }

    fn apply_auth(&self, builder: axum::http::request::Builder) -> axum::http::request::Builder {
        match &self.auth_header {
            Some(value) => builder.header(header::AUTHORIZATION, value),
            None => builder,
        }
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).to_string(),
            ))
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = self
            .apply_auth(Request::builder().method("GET").uri(path))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        let request = self
            .apply_auth(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header(header::CONTENT_TYPE, "application/json"),
            )
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// POST a single field as multipart/form-data.
    pub async fn post_file(
        &self,
        path: &str,
        field: &str,
        filename: &str,
        data: &[u8],
    ) -> TestResponse {
        let boundary = "driftwood-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = self
            .apply_auth(
                Request::builder().method("POST").uri(path).header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                ),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let request = self
            .apply_auth(Request::builder().method("DELETE").uri(path))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Script the engine and add a torrent via the API. Returns the record id.
    pub async fn add_torrent(&self, hash: &str, name: &str) -> i64 {
        self.engine.script_ingest(hash, name).await;
        let response = self
            .post(
                "/api/v1/torrents/link",
                serde_json::json!({ "link": format!("magnet:?xt=urn:btih:{}", hash) }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_i64().expect("record id")
    }
}
