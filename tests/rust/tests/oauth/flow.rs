//! OAuthFlow token endpoint tests with a mock HTTP server

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use toolmux_core::{AuthorizationServerMetadata, OAuthRegistration};
use toolmux_gateway::oauth::{OAuthFlow, PkceChallenge};
use toolmux_gateway::OAuthError;

fn test_metadata(server_url: &str) -> AuthorizationServerMetadata {
    AuthorizationServerMetadata {
        authorization_endpoint: format!("{}/authorize", server_url),
        token_endpoint: format!("{}/token", server_url),
        registration_endpoint: None,
        issuer: Some(server_url.to_string()),
        scopes_supported: None,
        code_challenge_methods_supported: Some(vec!["S256".to_string()]),
    }
}

fn test_registration(secret: Option<&str>) -> OAuthRegistration {
    OAuthRegistration {
        client_id: "client_123".to_string(),
        client_secret: secret.map(str::to_string),
        expires_at: None,
        redirect_uri: "http://127.0.0.1:8765/".to_string(),
    }
}

#[tokio::test]
async fn test_exchange_code_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth_code_123"))
        .and(body_string_contains("client_id=client_123"))
        .and(body_string_contains("code_verifier="))
        .and(body_string_contains("resource=https%3A%2F%2Fapi.example.com%2Fmcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access_token_xyz",
            "token_type": "Bearer",
            "expires_in": 120,
            "refresh_token": "refresh_abc",
            "scope": "mcp:tools"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let flow = OAuthFlow::new(test_metadata(&mock_server.uri()), test_registration(None));
    let pkce = PkceChallenge::generate();

    let before = Utc::now();
    let token = flow
        .exchange_code(
            &reqwest::Client::new(),
            "auth_code_123",
            &pkce.verifier,
            "https://api.example.com/mcp",
        )
        .await
        .unwrap();

    assert_eq!(token.access_token, "access_token_xyz");
    assert_eq!(token.expires_in, 120);
    assert_eq!(token.refresh_token.as_deref(), Some("refresh_abc"));
    assert_eq!(token.scope.as_deref(), Some("mcp:tools"));
    assert!(token.obtained_at >= before);
    assert!(token.is_valid());
}

#[tokio::test]
async fn test_exchange_code_sends_client_secret() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("client_secret=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "confidential_token"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let flow = OAuthFlow::new(
        test_metadata(&mock_server.uri()),
        test_registration(Some("s3cret")),
    );
    let pkce = PkceChallenge::generate();

    let token = flow
        .exchange_code(&reqwest::Client::new(), "code", &pkce.verifier, "https://api.example.com/mcp")
        .await
        .unwrap();

    assert_eq!(token.access_token, "confidential_token");
    // No expires_in: one hour is assumed
    assert_eq!(token.expires_in, 3600);
}

#[tokio::test]
async fn test_exchange_code_error_is_authorization_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Authorization code expired"
        })))
        .mount(&mock_server)
        .await;

    let flow = OAuthFlow::new(test_metadata(&mock_server.uri()), test_registration(None));
    let pkce = PkceChallenge::generate();

    let err = flow
        .exchange_code(&reqwest::Client::new(), "expired", &pkce.verifier, "https://api.example.com/mcp")
        .await
        .unwrap_err();

    match err {
        OAuthError::Authorization { message, .. } => {
            assert!(message.contains("400"));
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("expected Authorization error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_not_rotated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=keep_me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new_access",
            "expires_in": 3600
        })))
        .mount(&mock_server)
        .await;

    let flow = OAuthFlow::new(test_metadata(&mock_server.uri()), test_registration(None));
    let token = flow
        .refresh_token(&reqwest::Client::new(), "keep_me", "https://api.example.com/mcp")
        .await
        .unwrap();

    assert_eq!(token.access_token, "new_access");
    assert_eq!(token.refresh_token.as_deref(), Some("keep_me"));
}

#[tokio::test]
async fn test_refresh_uses_rotated_refresh_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new_access",
            "refresh_token": "rotated"
        })))
        .mount(&mock_server)
        .await;

    let flow = OAuthFlow::new(test_metadata(&mock_server.uri()), test_registration(None));
    let token = flow
        .refresh_token(&reqwest::Client::new(), "old", "https://api.example.com/mcp")
        .await
        .unwrap();

    assert_eq!(token.refresh_token.as_deref(), Some("rotated"));
}

#[test]
fn test_authorization_request_includes_required_params() {
    let flow = OAuthFlow::new(test_metadata("https://auth.example.com"), test_registration(None));

    let request = flow
        .create_authorization_request(&["read".to_string(), "write".to_string()], "https://api.example.com/mcp")
        .unwrap();
    let url = url::Url::parse(&request.authorization_url).unwrap();
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    assert_eq!(param("response_type").as_deref(), Some("code"));
    assert_eq!(param("client_id").as_deref(), Some("client_123"));
    assert_eq!(param("redirect_uri").as_deref(), Some("http://127.0.0.1:8765/"));
    assert_eq!(param("scope").as_deref(), Some("read write"));
    assert_eq!(param("state").as_deref(), Some(request.state.as_str()));
    assert_eq!(param("code_challenge").as_deref(), Some(request.pkce.challenge.as_str()));
    assert_eq!(param("code_challenge_method").as_deref(), Some("S256"));
    assert_eq!(param("resource").as_deref(), Some("https://api.example.com/mcp"));
}

#[test]
fn test_authorization_request_state_is_unique() {
    let flow = OAuthFlow::new(test_metadata("https://auth.example.com"), test_registration(None));

    let first = flow.create_authorization_request(&[], "https://api.example.com/mcp").unwrap();
    let second = flow.create_authorization_request(&[], "https://api.example.com/mcp").unwrap();

    assert_ne!(first.state, second.state);
    assert_ne!(first.pkce.challenge, second.pkce.challenge);
    assert!(!first.authorization_url.contains("scope="));
}
