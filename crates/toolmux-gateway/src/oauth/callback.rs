//! Loopback redirect listener (RFC 8252 section 7.3)
//!
//! Scoped to a single authorization attempt: bind, wait for exactly one
//! request, close. The first request on any path is taken as the redirect and
//! always answered with the same static page, whatever it carried.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::response::Html;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use toolmux_core::branding;

use super::flow::AuthorizationCallback;
use super::OAuthError;

/// How long `close` waits for in-flight responses before aborting the server task.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<AuthorizationCallback>>>>;

pub struct LoopbackListener {
    port: u16,
    redirect_uri: String,
    callback_rx: Option<oneshot::Receiver<AuthorizationCallback>>,
    shutdown: CancellationToken,
    server: Option<JoinHandle<()>>,
}

impl LoopbackListener {
    /// Bind `127.0.0.1:port` (0 for an ephemeral port) and start serving.
    ///
    /// Bind errors are returned as-is so callers can tell `AddrInUse` apart.
    pub async fn bind(port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = branding::oauth_callback_uri_with_port(port);

        let (callback_tx, callback_rx) = oneshot::channel();
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(callback_tx)));
        let app = Router::new().fallback(handle_redirect).with_state(slot);

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let server = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                signal.cancelled().await;
            });
            if let Err(e) = serve.await {
                warn!(port, error = %e, "[OAuth] Loopback listener error");
            }
            debug!(port, "[OAuth] Loopback listener stopped");
        });

        info!(port, "[OAuth] Loopback listener bound");
        Ok(Self {
            port,
            redirect_uri,
            callback_rx: Some(callback_rx),
            shutdown,
            server: Some(server),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Wait for the redirect, bounded by `timeout` and `cancel`.
    pub async fn wait_for_callback(
        &mut self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<AuthorizationCallback, OAuthError> {
        let callback_rx = self.callback_rx.take().ok_or(OAuthError::Cancelled)?;

        info!(
            port = self.port,
            timeout_secs = timeout.as_secs(),
            "[OAuth] Waiting for authorization redirect"
        );

        tokio::select! {
            result = tokio::time::timeout(timeout, callback_rx) => match result {
                Ok(Ok(callback)) => Ok(callback),
                Ok(Err(_)) => Err(OAuthError::Cancelled),
                Err(_) => Err(OAuthError::CallbackTimeout(timeout)),
            },
            _ = cancel.cancelled() => Err(OAuthError::Cancelled),
        }
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(mut server) = self.server.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut server).await.is_err() {
                warn!(port = self.port, "[OAuth] Loopback listener did not stop in time, aborting");
                server.abort();
            }
        }
        debug!(port = self.port, "[OAuth] Loopback listener closed");
    }
}

impl Drop for LoopbackListener {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

async fn handle_redirect(
    State(slot): State<CallbackSlot>,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let callback = AuthorizationCallback::from_query(query.as_deref().unwrap_or_default());
    match slot.lock().take() {
        Some(callback_tx) => {
            info!(
                has_code = callback.code.is_some(),
                error = callback.error.as_deref().unwrap_or(""),
                "[OAuth] Authorization redirect received"
            );
            let _ = callback_tx.send(callback);
        }
        None => debug!("[OAuth] Ignoring additional request on loopback listener"),
    }
    Html(callback_page())
}

fn callback_page() -> String {
    let app_name = branding::DISPLAY_NAME;
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{app_name} - Authorization</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            min-height: 100vh;
            margin: 0;
            display: flex;
            align-items: center;
            justify-content: center;
            background: #1a1210;
            color: #e6e6e6;
        }}
        h1 {{ font-size: 1.5rem; font-weight: 600; }}
        p {{ color: #a0917e; }}
    </style>
</head>
<body>
    <div>
        <h1>{app_name} received the authorization response</h1>
        <p>You may close this tab and return to your terminal.</p>
    </div>
</body>
</html>"##
    )
}
