//! Retry timing and transport expectations, on paused time

use super::*;
use async_trait::async_trait;
use mockall::mock;
use oidc_session_tokens::{
    DefaultRefreshExecutor, ErrorCode, HttpRequest, HttpResponse, HttpTransport, MockClock,
    MockHttpTransport, RefreshExecutor, RefreshOutcome, SessionError,
};
use std::sync::Arc;
use tokio::time::Instant;

mock! {
    pub Transport {}

    #[async_trait]
    impl HttpTransport for Transport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SessionError>;
    }
}

const NOW: i64 = 1_700_000_000_000;

fn default_delay_config() -> OidcConfig {
    oidc_config()
        .issuer("https://id.example.com/realms/demo")
        .client_id("web-app")
        .client_secret("s3cret")
        .build()
        .expect("valid test configuration")
}

#[tokio::test(start_paused = true)]
async fn test_linear_backoff_between_attempts() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.queue_json_response(500, json!({"error": "server_error"}));
    transport.queue_json_response(500, json!({"error": "server_error"}));
    transport.queue_json_response(200, token_body(ACCESS_TOKEN, 300));

    let executor = DefaultRefreshExecutor::with_clock(
        default_delay_config(),
        transport.clone(),
        Arc::new(MockClock::new(NOW)),
    );

    let start = Instant::now();
    let outcome = executor.refresh(Some("rt-1")).await;
    let elapsed = start.elapsed();

    assert!(outcome.is_success());
    assert_eq!(transport.request_count(), 3);
    assert!(elapsed >= Duration::from_millis(3000), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(3100), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_failure_does_not_wait() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.queue_json_response(400, json!({"error": "invalid_request"}));

    let executor = DefaultRefreshExecutor::with_clock(
        default_delay_config(),
        transport.clone(),
        Arc::new(MockClock::new(NOW)),
    );

    let start = Instant::now();
    let outcome = executor.refresh(Some("rt-1")).await;

    assert_eq!(outcome.error_code(), Some(ErrorCode::RefreshTokenError));
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_transport_expectations() {
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(|request: &HttpRequest| {
            let fields = request.form_fields();
            request.url == "https://id.example.com/realms/demo/protocol/openid-connect/token"
                && fields.get("grant_type").map(String::as_str) == Some("refresh_token")
                && fields.get("refresh_token").map(String::as_str) == Some("rt-1")
        })
        .times(1)
        .returning(|_| Ok(HttpResponse::json(200, &token_body(ACCESS_TOKEN, 60))));

    let executor = DefaultRefreshExecutor::with_clock(
        default_delay_config(),
        Arc::new(transport),
        Arc::new(MockClock::new(NOW)),
    );

    let outcome = executor.refresh(Some("rt-1")).await;
    let RefreshOutcome::Success(tokens) = outcome else {
        panic!("expected success");
    };
    assert_eq!(tokens.expires_at_ms, NOW + 60_000);
}

#[tokio::test]
async fn test_missing_configuration_never_reaches_transport() {
    let mut transport = MockTransport::new();
    transport.expect_send().never();

    let executor = DefaultRefreshExecutor::new(OidcConfig::default(), Arc::new(transport));
    let outcome = executor.refresh(Some("rt-1")).await;

    assert_eq!(outcome.error_code(), Some(ErrorCode::NetworkError));
    assert_eq!(executor.metrics().snapshot().attempts, 0);
}
