//! Authorization server discovery against a mock HTTP server

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tests::oauth_server::{metadata_json, resource_url};
use toolmux_gateway::oauth::OAuthDiscovery;

fn discovery() -> OAuthDiscovery {
    OAuthDiscovery::new(reqwest::Client::new())
}

fn resource(server: &MockServer) -> Url {
    Url::parse(&resource_url(server)).unwrap()
}

#[tokio::test]
async fn test_protected_resource_metadata_is_preferred() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("HEAD"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(401).insert_header(
            "WWW-Authenticate",
            format!(
                r#"Bearer realm="mcp", resource_metadata="{}/.well-known/oauth-protected-resource""#,
                base
            )
            .as_str(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resource": format!("{}/mcp", base),
            "authorization_servers": [format!("{}/issuer", base)],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/issuer/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": format!("{}/issuer", base),
            "authorization_endpoint": format!("{}/issuer/authorize", base),
            "token_endpoint": format!("{}/issuer/token", base),
            "registration_endpoint": format!("{}/issuer/register", base),
        })))
        .mount(&server)
        .await;
    // Would win if protected resource metadata were ignored
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json(&server, true)))
        .mount(&server)
        .await;

    let metadata = discovery().discover(&resource(&server)).await.unwrap();

    assert_eq!(metadata.authorization_endpoint, format!("{}/issuer/authorize", base));
    assert_eq!(metadata.token_endpoint, format!("{}/issuer/token", base));
    assert_eq!(
        metadata.registration_endpoint,
        Some(format!("{}/issuer/register", base))
    );
}

#[tokio::test]
async fn test_path_well_known_before_origin() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/mcp/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorization_endpoint": format!("{}/mcp/authorize", base),
            "token_endpoint": format!("{}/mcp/token", base),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json(&server, true)))
        .mount(&server)
        .await;

    let metadata = discovery().discover(&resource(&server)).await.unwrap();

    assert_eq!(metadata.authorization_endpoint, format!("{}/mcp/authorize", base));
    assert_eq!(metadata.registration_endpoint, None);
}

#[tokio::test]
async fn test_origin_openid_configuration() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": base,
            "authorization_endpoint": format!("{}/oidc/authorize", base),
            "token_endpoint": format!("{}/oidc/token", base),
            "registration_endpoint": format!("{}/oidc/register", base),
            "scopes_supported": ["openid", "offline_access"],
        })))
        .mount(&server)
        .await;

    let metadata = discovery().discover(&resource(&server)).await.unwrap();

    assert_eq!(metadata.authorization_endpoint, format!("{}/oidc/authorize", base));
    assert_eq!(
        metadata.scopes_supported,
        Some(vec!["openid".to_string(), "offline_access".to_string()])
    );
}

#[tokio::test]
async fn test_malformed_document_falls_through_to_next_probe() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/mcp/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not metadata</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json(&server, true)))
        .mount(&server)
        .await;

    let metadata = discovery().discover(&resource(&server)).await.unwrap();

    assert_eq!(metadata.authorization_endpoint, format!("{}/authorize", base));
}

#[tokio::test]
async fn test_convention_endpoints_when_nothing_is_published() {
    let server = MockServer::start().await;
    let base = server.uri();

    let metadata = discovery().discover(&resource(&server)).await.unwrap();

    assert_eq!(metadata.authorization_endpoint, format!("{}/mcp/authorize", base));
    assert_eq!(metadata.token_endpoint, format!("{}/mcp/access_token", base));
    assert_eq!(metadata.registration_endpoint, None);
}
