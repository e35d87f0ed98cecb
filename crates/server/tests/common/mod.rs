//! In-process server fixture for HTTP-level tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use gatelink_core::{
    create_authenticator, create_status_exchange, AccountStore, AuthConfig, AuthMethod,
    Authenticator, CallbackConfig, CallbackGateway, Config, DatabaseConfig, ExchangeBackend,
    ExchangeConfig, ServerConfig, SqliteAccountStore,
};
use gatelink_server::api::create_router;
use gatelink_server::state::AppState;

pub const SECRET: &str = "test-secret";
pub const SESSION: &str = "front-end-session";

/// Fixture wiring the real gateway over temporary storage.
pub struct TestFixture {
    pub router: Router,
    pub accounts: Arc<SqliteAccountStore>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct TestConfig {
    pub exchange: ExchangeBackend,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            exchange: ExchangeBackend::Memory,
        }
    }
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            auth: AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(SESSION.to_string()),
            },
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0,
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            callback: CallbackConfig {
                secret: SECRET.to_string(),
            },
            exchange: ExchangeConfig {
                backend: test_config.exchange,
                dir: temp_dir.path().join("status"),
            },
        };

        let authenticator: Arc<dyn Authenticator> =
            Arc::from(create_authenticator(&config.auth).expect("Failed to create authenticator"));
        let accounts =
            Arc::new(SqliteAccountStore::new(&db_path).expect("Failed to open account store"));
        let exchange = create_status_exchange(&config.exchange, &db_path)
            .expect("Failed to create status exchange");
        let gateway = Arc::new(CallbackGateway::new(
            SECRET,
            exchange,
            Arc::clone(&accounts) as Arc<dyn AccountStore>,
        ));

        let state = Arc::new(AppState::new(config, authenticator, gateway));

        Self {
            router: create_router(state),
            accounts,
            temp_dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// POST a raw body, as a worker would.
    pub async fn post_raw(&self, path: &str, body: impl Into<String>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.into()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.post_raw(path, body.to_string()).await
    }

    /// GET with the front-end session cookie.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .uri(path)
            .header(header::COOKIE, format!("gatelink_session={SESSION}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn get_anonymous(&self, path: &str) -> TestResponse {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn poll(&self, correlation_id: &str) -> TestResponse {
        self.get(&format!("/api/v1/status?correlationId={correlation_id}"))
            .await
    }
}
