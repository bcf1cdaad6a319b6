//! Shared test utilities and fixtures for ToolMux integration tests.

/// Scripted transports and tool clients
pub mod mocks;
pub use mocks::{tool_descriptor, MockBackend, MockState, MockTransportFactory, RecordedCall};

pub use browsers::{CountingBrowser, RedirectOutcome, RedirectingBrowser};


/// Tracing output for tests (`RUST_LOG=debug cargo test`)
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Async test helpers
pub mod async_helpers {
    use std::time::Duration;
    use tokio::time::timeout;

    /// Run an async operation with a timeout
    pub async fn with_timeout<F, T>(duration: Duration, f: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        timeout(duration, f).await.expect("Operation timed out")
    }

    /// Default test timeout (10 seconds)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
}
