//! Integration tests for the service credential cache

use super::*;
use oidc_session_tokens::{
    service_credential_config, ProviderError, ReqwestHttpTransport, ServiceCredentialProvider,
    SessionError,
};
use std::sync::Arc;
use tokio_test::assert_ok;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::Mock;

#[tokio::test]
async fn test_service_token_integration_cached() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_secret=admin-secret"))
        .respond_with(success_response(token_body("svc-token", 300)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = service_credential_config()
        .base_url(issuer_for(&mock_server))
        .client_secret("admin-secret")
        .build()
        .expect("valid service configuration");
    let transport = Arc::new(ReqwestHttpTransport::new().expect("Failed to build transport"));
    let provider = ServiceCredentialProvider::new(config, transport);

    assert_eq!(assert_ok!(provider.access_token().await), "svc-token");
    assert_eq!(assert_ok!(provider.access_token().await), "svc-token");
}

#[tokio::test]
async fn test_service_token_integration_rejected_client() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(error_response(
            401,
            json!({"error": "invalid_client", "error_description": "Invalid client secret"}),
        ))
        .mount(&mock_server)
        .await;

    let config = service_credential_config()
        .base_url(issuer_for(&mock_server))
        .client_id("admin-cli")
        .client_secret("wrong")
        .build()
        .expect("valid service configuration");
    let transport = Arc::new(ReqwestHttpTransport::new().expect("Failed to build transport"));
    let provider = ServiceCredentialProvider::new(config, transport);

    let err = provider.access_token().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Provider(ProviderError::InvalidClient { .. })
    ));
    assert!(provider.cached().await.value.is_none());
}
