//! BackendConnection over mock transports

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use tests::{MockBackend, MockTransportFactory};
use toolmux_core::BackendConfig;
use toolmux_gateway::{BackendConnection, ConnectError, InvocationError};

#[tokio::test]
async fn test_connect_and_list_tools() {
    let factory = MockTransportFactory::new()
        .with_backend("fs", MockBackend::with_tools(&["read", "write"]));

    let connection = BackendConnection::connect(BackendConfig::stdio("fs", "fs-server"), &factory, None)
        .await
        .unwrap();

    assert_eq!(connection.name(), "fs");
    let names: Vec<String> = connection
        .list_tools()
        .await
        .unwrap()
        .into_iter()
        .map(|tool| tool.name)
        .collect();
    assert_eq!(names, vec!["read", "write"]);
}

#[tokio::test]
async fn test_connect_failure_is_transport_error() {
    let factory = MockTransportFactory::new().with_backend("fs", MockBackend::unreachable("boom"));

    let err = BackendConnection::connect(BackendConfig::stdio("fs", "fs-server"), &factory, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectError::Transport(_)));
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn test_list_failure_is_tool_discovery_error() {
    let factory = MockTransportFactory::new()
        .with_backend("fs", MockBackend::with_tools(&["read"]).with_list_error("bad list"));

    let connection = BackendConnection::connect(BackendConfig::stdio("fs", "fs-server"), &factory, None)
        .await
        .unwrap();

    assert!(matches!(
        connection.list_tools().await,
        Err(ConnectError::ToolDiscovery(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_invoke_uses_configured_timeout() {
    let factory = MockTransportFactory::new().with_backend(
        "slow",
        MockBackend::with_tools(&["wait"]).with_call_delay(Duration::from_secs(30)),
    );
    let config = BackendConfig::stdio("slow", "slow-server").with_timeout(Duration::from_secs(2));
    let connection = BackendConnection::connect(config, &factory, None).await.unwrap();

    let err = connection.invoke("wait", json!({})).await.unwrap_err();

    match err {
        InvocationError::Timeout(timeout) => assert_eq!(timeout, Duration::from_secs(2)),
        other => panic!("expected Timeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_invoke_within_timeout_succeeds() {
    let factory = MockTransportFactory::new().with_backend(
        "slow",
        MockBackend::with_tools(&["wait"]).with_call_delay(Duration::from_secs(1)),
    );
    let config = BackendConfig::stdio("slow", "slow-server").with_timeout(Duration::from_secs(2));
    let connection = BackendConnection::connect(config, &factory, None).await.unwrap();

    let result = connection.invoke("wait", json!({ "n": 1 })).await.unwrap();
    assert_eq!(result["arguments"]["n"], 1);
}

#[tokio::test]
async fn test_invoke_rejects_non_object_arguments() {
    let factory = MockTransportFactory::new().with_backend("fs", MockBackend::with_tools(&["read"]));
    let connection = BackendConnection::connect(BackendConfig::stdio("fs", "fs-server"), &factory, None)
        .await
        .unwrap();

    let err = connection.invoke("read", json!("path")).await.unwrap_err();
    assert!(matches!(err, InvocationError::InvalidArguments(_)));
}

#[tokio::test]
async fn test_close_swallows_errors() {
    let factory = MockTransportFactory::new()
        .with_backend("fs", MockBackend::with_tools(&["read"]).with_close_error("already gone"));
    let state = factory.state();
    let connection = BackendConnection::connect(BackendConfig::stdio("fs", "fs-server"), &factory, None)
        .await
        .unwrap();

    connection.close().await;

    assert_eq!(state.closed(), vec!["fs"]);
}
