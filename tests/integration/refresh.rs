//! Integration tests for the refresh executor over HTTP

use super::*;
use oidc_session_tokens::{
    DefaultRefreshExecutor, ErrorCode, RefreshExecutor, RefreshMetrics, RefreshOutcome,
    ReqwestHttpTransport,
};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn executor(config: OidcConfig) -> DefaultRefreshExecutor<ReqwestHttpTransport> {
    let transport = ReqwestHttpTransport::new().expect("Failed to build transport");
    DefaultRefreshExecutor::new(config, Arc::new(transport))
}

#[tokio::test]
async fn test_refresh_integration_success() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .and(body_string_contains("client_id=web-app"))
        .and(body_string_contains("client_secret=s3cret"))
        .respond_with(success_response(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 300,
            "refresh_token": "rt-2",
            "id_token": "new.id.token"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = executor(test_config(&issuer_for(&mock_server)))
        .refresh(Some("rt-1"))
        .await;

    match outcome {
        RefreshOutcome::Success(tokens) => {
            assert_eq!(tokens.access_token, ACCESS_TOKEN);
            assert_eq!(tokens.refresh_token, "rt-2");
            assert_eq!(tokens.id_token.as_deref(), Some("new.id.token"));
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_integration_invalid_grant_single_attempt() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(error_response(
            400,
            json!({"error": "invalid_grant", "error_description": "Token is not active"}),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(RefreshMetrics::new());
    let outcome = executor(test_config(&issuer_for(&mock_server)))
        .with_metrics(metrics.clone())
        .refresh(Some("rt-1"))
        .await;

    let RefreshOutcome::Failure(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.code, ErrorCode::RefreshTokenExpired);
    assert_eq!(failure.http_status, Some(400));
    assert_eq!(failure.description, "Token is not active");

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.attempts, 1);
    assert_eq!(snapshot.refresh_token_expired, 1);
}

#[tokio::test]
async fn test_refresh_integration_recovers_from_server_errors() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(error_response(500, json!({"error": "server_error"})))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(success_response(token_body(ACCESS_TOKEN, 300)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = executor(test_config(&issuer_for(&mock_server)))
        .refresh(Some("rt-1"))
        .await;

    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_refresh_integration_exhausts_attempts() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let outcome = executor(test_config(&issuer_for(&mock_server)))
        .refresh(Some("rt-1"))
        .await;

    let RefreshOutcome::Failure(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.code, ErrorCode::RefreshTokenError);
    assert_eq!(failure.http_status, Some(503));
    assert_eq!(failure.description, "Unknown error");
}

#[tokio::test]
async fn test_refresh_integration_redirect_is_retried() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(307).insert_header("location", "https://login.example.com/"),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let outcome = executor(test_config(&issuer_for(&mock_server)))
        .refresh(Some("rt-1"))
        .await;

    let RefreshOutcome::Failure(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.code, ErrorCode::RefreshTokenError);
    assert_eq!(failure.http_status, Some(307));
}

fn small_limit_executor(config: OidcConfig) -> DefaultRefreshExecutor<ReqwestHttpTransport> {
    let transport = ReqwestHttpTransport::with_options(Duration::from_secs(5), 1024)
        .expect("Failed to build transport");
    DefaultRefreshExecutor::new(config, Arc::new(transport))
}

#[tokio::test]
async fn test_refresh_integration_large_error_page_is_retried() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>".repeat(1000)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let outcome = small_limit_executor(test_config(&issuer_for(&mock_server)))
        .refresh(Some("rt-1"))
        .await;

    let RefreshOutcome::Failure(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.code, ErrorCode::RefreshTokenError);
    assert_eq!(failure.http_status, Some(503));
    assert_eq!(failure.description, "Unknown error");
}

#[tokio::test]
async fn test_refresh_integration_large_error_body_keeps_description() {
    let mock_server = setup_mock_server().await;

    let mut body = r#"{"error":"invalid_grant","error_description":"Token is not active"}"#
        .to_string();
    body.push_str(&" ".repeat(4096));

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = small_limit_executor(test_config(&issuer_for(&mock_server)))
        .refresh(Some("rt-1"))
        .await;

    assert_eq!(outcome.error_code(), Some(ErrorCode::RefreshTokenExpired));
}

#[tokio::test]
async fn test_refresh_integration_oversized_success_is_invalid_token() {
    let mock_server = setup_mock_server().await;

    let mut body = token_body(ACCESS_TOKEN, 300);
    body["padding"] = json!("x".repeat(4096));

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(success_response(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = small_limit_executor(test_config(&issuer_for(&mock_server)))
        .refresh(Some("rt-1"))
        .await;

    assert_eq!(outcome.error_code(), Some(ErrorCode::InvalidToken));
}

#[tokio::test]
async fn test_refresh_integration_timeout_is_network_error() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            success_response(token_body(ACCESS_TOKEN, 300)).set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let config = oidc_config()
        .issuer(issuer_for(&mock_server))
        .client_id("web-app")
        .client_secret("s3cret")
        .timeout(Duration::from_millis(100))
        .max_refresh_attempts(1)
        .build()
        .expect("valid test configuration");

    let outcome = executor(config).refresh(Some("rt-1")).await;

    assert_eq!(outcome.error_code(), Some(ErrorCode::NetworkError));
}

#[tokio::test]
async fn test_refresh_integration_unreachable_issuer() {
    // Nothing listens on port 9 locally
    let outcome = executor(test_config("http://127.0.0.1:9/realms/demo"))
        .refresh(Some("rt-1"))
        .await;

    assert_eq!(outcome.error_code(), Some(ErrorCode::NetworkError));
}
