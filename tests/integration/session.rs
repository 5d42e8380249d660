//! Integration tests for the session token store

use super::*;
use oidc_session_tokens::{
    DefaultRefreshExecutor, ErrorCode, ExchangeResult, InMemorySessionStorage, MockClock,
    MockHttpTransport, ReqwestHttpTransport, SessionStorage, SessionTokenStore,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::Mock;

const T0: i64 = 1_700_000_000_000;

fn expired_exchange() -> ExchangeResult {
    ExchangeResult {
        access_token: Some(ACCESS_TOKEN.to_string()),
        refresh_token: Some("rt-1".to_string()),
        id_token: Some("original.id.token".to_string()),
        expires_at: Some(0),
        expires_in: None,
    }
}

#[tokio::test]
async fn test_session_integration_refresh_and_keep_id_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(success_response(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 300,
            "refresh_token": "rt-2"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = Arc::new(ReqwestHttpTransport::new().expect("Failed to build transport"));
    let executor = DefaultRefreshExecutor::new(test_config(&issuer_for(&mock_server)), transport);
    let store = SessionTokenStore::new(Arc::new(executor));

    let record = store.on_initial_sign_in(expired_exchange(), profile());
    let resolved = store.resolve(&record).await;

    assert!(resolved.is_usable());
    assert_eq!(resolved.refresh_token.as_deref(), Some("rt-2"));
    assert_eq!(resolved.id_token.as_deref(), Some("original.id.token"));
    assert_eq!(resolved.generation, 1);

    let projection = store.project_for_presentation(&resolved);
    assert_eq!(projection.username, "jdoe");
    assert_eq!(projection.error, None);
}

#[tokio::test]
async fn test_session_integration_expired_refresh_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(error_response(
            400,
            json!({"error": "invalid_grant", "error_description": "Session not active"}),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = Arc::new(ReqwestHttpTransport::new().expect("Failed to build transport"));
    let executor = DefaultRefreshExecutor::new(test_config(&issuer_for(&mock_server)), transport);
    let store = SessionTokenStore::new(Arc::new(executor));

    let record = store.on_initial_sign_in(expired_exchange(), profile());
    let resolved = store.resolve(&record).await;

    assert_eq!(resolved.access_token, None);
    assert_eq!(resolved.last_error, Some(ErrorCode::RefreshTokenExpired));
    assert!(resolved.last_error.unwrap().requires_reauthentication());

    let projection = store.project_for_presentation(&resolved);
    assert_eq!(projection.error, Some(ErrorCode::RefreshTokenExpired));
    assert_eq!(
        serde_json::to_value(&projection).unwrap()["error"],
        "RefreshTokenExpired"
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.queue_json_response(500, json!({"error": "server_error"}));
    transport.queue_json_response(200, token_body(ACCESS_TOKEN, 300));

    let config = oidc_config()
        .issuer("https://id.example.com/realms/demo")
        .client_id("web-app")
        .client_secret("s3cret")
        .build()
        .expect("valid test configuration");
    let clock = Arc::new(MockClock::new(T0));
    let executor = DefaultRefreshExecutor::with_clock(config, transport.clone(), clock.clone());
    let store = SessionTokenStore::with_clock(Arc::new(executor), clock);

    let record = store.on_initial_sign_in(expired_exchange(), profile());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        });
    }

    let resolved = store.resolve_until_cancelled(&record, &cancel).await;

    assert_eq!(resolved.last_error, Some(ErrorCode::NetworkError));
    assert_eq!(resolved.access_token, None);
    assert_eq!(resolved.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_refresh() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.queue_json_response(200, token_body(ACCESS_TOKEN, 300));

    let executor = DefaultRefreshExecutor::new(
        test_config("https://id.example.com/realms/demo"),
        transport.clone(),
    );
    let store = Arc::new(SessionTokenStore::new(Arc::new(executor)));
    let storage = Arc::new(InMemorySessionStorage::new());

    let record = store.on_initial_sign_in(expired_exchange(), profile());
    assert_ok!(storage.save("session-1", record).await);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            let storage = storage.clone();
            tokio::spawn(async move { store.resolve_stored(storage.as_ref(), "session-1").await })
        })
        .collect();

    for handle in handles {
        let resolved = assert_ok!(handle.await.expect("task panicked"));
        assert!(resolved.is_usable());
        assert_eq!(resolved.generation, 1);
    }

    assert_eq!(transport.request_count(), 1);
    assert_eq!(
        storage.load("session-1").await.unwrap().map(|r| r.generation),
        Some(1)
    );
}

#[tokio::test]
async fn test_unknown_session_key() {
    let store = SessionTokenStore::new(Arc::new(DefaultRefreshExecutor::new(
        OidcConfig::default(),
        Arc::new(MockHttpTransport::new()),
    )));
    let storage = InMemorySessionStorage::new();

    assert_err!(store.resolve_stored(&storage, "nope").await);
}
