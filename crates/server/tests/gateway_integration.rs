//! HTTP-level tests of the callback gateway and status poll.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestConfig, TestFixture, SECRET};
use gatelink_core::{AccountStore, ExchangeBackend, SyncedStatus};

fn qr_ready(correlation_id: &str) -> serde_json::Value {
    json!({
        "secret": SECRET,
        "status": "success",
        "correlationId": correlation_id,
        "ownerId": "user-1",
        "type": "qr_ready",
        "image": "data:image/png;base64,AAAA"
    })
}

fn connected(correlation_id: &str, external_id: &str) -> serde_json::Value {
    json!({
        "secret": SECRET,
        "status": "success",
        "correlationId": correlation_id,
        "ownerId": "user-1",
        "type": "connected",
        "phoneNumber": "+15550001111",
        "externalAccountId": external_id
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let fixture = TestFixture::new();
    let response = fixture.get_anonymous("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_poll_before_any_callback_is_pending() {
    let fixture = TestFixture::new();
    let response = fixture.poll("job_1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"status": "pending"}));
}

#[tokio::test]
async fn test_callback_then_poll_reads_once() {
    let fixture = TestFixture::new();

    let accepted = fixture.post("/api/v1/callback", qr_ready("job_1")).await;
    assert_eq!(accepted.status, StatusCode::OK);
    assert_eq!(accepted.body, json!({"status": "ok"}));

    let first = fixture.poll("job_1").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["type"], "qr_ready");
    assert_eq!(first.body["image"], "data:image/png;base64,AAAA");
    assert_eq!(first.body["correlationId"], "job_1");
    assert!(first.body.get("secret").is_none());

    let second = fixture.poll("job_1").await;
    assert_eq!(second.body, json!({"status": "pending"}));
}

#[tokio::test]
async fn test_wrong_secret_is_403_and_not_stored() {
    let fixture = TestFixture::new();
    let mut body = qr_ready("job_1");
    body["secret"] = json!("nope");

    let response = fixture.post("/api/v1/callback", body).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["status"], "error");

    let poll = fixture.poll("job_1").await;
    assert_eq!(poll.body, json!({"status": "pending"}));
}

#[tokio::test]
async fn test_malformed_body_is_403() {
    let fixture = TestFixture::new();
    let response = fixture.post_raw("/api/v1/callback", "{not json").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["status"], "error");
}

#[tokio::test]
async fn test_traversal_ids_are_400_on_both_sides() {
    let fixture = TestFixture::new();

    let response = fixture.post("/api/v1/callback", qr_ready("../etc")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = fixture.poll("a..b").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["status"], "error");
}

#[tokio::test]
async fn test_poll_without_correlation_id_is_403() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/status").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["status"], "error");

    let response = fixture.get("/api/v1/status?correlationId=").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_poll_without_session_is_403() {
    let fixture = TestFixture::new();
    fixture.post("/api/v1/callback", qr_ready("job_1")).await;

    let response = fixture
        .get_anonymous("/api/v1/status?correlationId=job_1")
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // The unauthorized poll must not consume the record
    let response = fixture.poll("job_1").await;
    assert_eq!(response.body["type"], "qr_ready");
}

#[tokio::test]
async fn test_anonymous_poll_is_rejected_for_every_exchange_backend() {
    for exchange in [ExchangeBackend::Memory, ExchangeBackend::Sqlite] {
        let fixture = TestFixture::with_config(TestConfig { exchange });
        fixture.post("/api/v1/callback", qr_ready("job_1")).await;

        let response = fixture
            .get_anonymous("/api/v1/status?correlationId=job_1")
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.body["message"], "Authentication required");
    }
}

#[tokio::test]
async fn test_connected_persists_account_and_overwrites_code() {
    let fixture = TestFixture::new();

    fixture.post("/api/v1/callback", qr_ready("job_7")).await;
    let response = fixture
        .post("/api/v1/callback", connected("job_7", "dev-42"))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let account = fixture.accounts.get("dev-42").unwrap().unwrap();
    assert_eq!(account.owner_id, "user-1");
    assert_eq!(account.phone_number, "+15550001111");
    assert_eq!(account.status, SyncedStatus::Active);

    let poll = fixture.poll("job_7").await;
    assert_eq!(poll.body["type"], "connected");
    assert_eq!(poll.body["externalAccountId"], "dev-42");
}

#[tokio::test]
async fn test_connected_without_owner_stores_generic_error() {
    let fixture = TestFixture::new();
    let mut body = connected("job_8", "dev-43");
    body.as_object_mut().unwrap().remove("ownerId");

    let response = fixture.post("/api/v1/callback", body).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(fixture.accounts.get("dev-43").unwrap().is_none());

    let poll = fixture.poll("job_8").await;
    assert_eq!(poll.body["status"], "error");
    assert_eq!(poll.body["type"], "error");
    assert!(poll.body.get("externalAccountId").is_none());
}

#[tokio::test]
async fn test_sync_updates_known_accounts() {
    let fixture = TestFixture::new();
    fixture
        .post("/api/v1/callback", connected("job_9", "dev-1"))
        .await;

    let response = fixture
        .post(
            "/api/v1/sync",
            json!({
                "secret": SECRET,
                "devices": [
                    {"externalAccountId": "dev-1", "sentCount": 12, "status": "suspended"},
                    {"externalAccountId": "unknown", "sentCount": 1, "status": "active"}
                ]
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"status": "ok", "updated": 1}));

    let account = fixture.accounts.get("dev-1").unwrap().unwrap();
    assert_eq!(account.sent_count, 12);
    assert_eq!(account.status, SyncedStatus::Suspended);
}

#[tokio::test]
async fn test_sync_requires_secret() {
    let fixture = TestFixture::new();
    let response = fixture
        .post("/api/v1/sync", json!({"devices": []}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_filesystem_exchange_round_trip() {
    let fixture = TestFixture::with_config(TestConfig {
        exchange: ExchangeBackend::Filesystem,
        ..Default::default()
    });

    fixture.post("/api/v1/callback", qr_ready("job_fs")).await;
    assert!(fixture.temp_dir.path().join("status/job_fs.json").exists());

    let poll = fixture.poll("job_fs").await;
    assert_eq!(poll.body["type"], "qr_ready");
    assert!(!fixture.temp_dir.path().join("status/job_fs.json").exists());
}

#[tokio::test]
async fn test_sqlite_exchange_round_trip() {
    let fixture = TestFixture::with_config(TestConfig {
        exchange: ExchangeBackend::Sqlite,
        ..Default::default()
    });

    fixture.post("/api/v1/callback", qr_ready("job_db")).await;
    assert_eq!(fixture.poll("job_db").await.body["type"], "qr_ready");
    assert_eq!(
        fixture.poll("job_db").await.body,
        json!({"status": "pending"})
    );
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let fixture = TestFixture::new();
    let response = fixture.get_anonymous("/api/v1/nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["status"], "error");
}

#[tokio::test]
async fn test_config_hides_secrets() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/config").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["callback"]["secret_configured"], true);
    assert!(!response.body.to_string().contains(SECRET));
}
