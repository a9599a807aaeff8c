//! Transient local HTTP listener that captures a single OAuth redirect.
//!
//! Each flow gets its own router and listener, so concurrent flows never
//! collide on a shared handler registration.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use {
    axum::{Router, extract::Query, response::Html, routing::get},
    tokio::{
        net::TcpListener,
        sync::{Mutex, oneshot},
        task::JoinHandle,
    },
    tracing::{debug, error},
};

use crate::error::AuthError;

/// Bounded grace period for releasing the listener socket on shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <body style="font-family: system-ui; text-align: center; padding-top: 80px;">
    <h1>Authentication successful</h1>
    <p>You can close this window and return to the terminal.</p>
  </body>
</html>"#;

const ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <body style="font-family: system-ui; text-align: center; padding-top: 80px;">
    <h1>Authentication failed</h1>
    <p>The redirect did not contain an authorization code. Return to the terminal for details.</p>
  </body>
</html>"#;

/// Query parameters delivered by the provider redirect.
#[derive(Debug, Clone)]
pub struct Callback {
    pub code: String,
    pub state: String,
}

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<Result<Callback, String>>>>>;

/// A running single-shot callback listener.
///
/// Exactly one result is ever produced: the first request on the callback
/// path wins, and later requests only receive a static page.
pub struct CallbackServer {
    addr: SocketAddr,
    result_rx: oneshot::Receiver<Result<Callback, String>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CallbackServer {
    /// Bind the listener and start serving the callback path.
    pub async fn bind(addr: &str, path: &str) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| AuthError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local = listener.local_addr().map_err(|source| AuthError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        let (result_tx, result_rx) = oneshot::channel();
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(result_tx)));
        let app = Router::new().route(
            path,
            get(move |Query(params): Query<HashMap<String, String>>| {
                let slot = slot.clone();
                async move { handle_redirect(slot, params).await }
            }),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                error!(error = %e, "callback listener failed");
            }
        });

        debug!(addr = %local, path, "callback listener started");
        Ok(Self {
            addr: local,
            result_rx,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }

    /// The address the listener actually bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the single redirect, bounded by `timeout`.
    pub async fn wait(&mut self, timeout: Duration) -> Result<Callback, AuthError> {
        match tokio::time::timeout(timeout, &mut self.result_rx).await {
            Err(_) => Err(AuthError::Timeout),
            Ok(Err(_)) => Err(AuthError::Receiver(
                "callback listener stopped before a redirect arrived".into(),
            )),
            Ok(Ok(Err(message))) => Err(AuthError::Receiver(message)),
            Ok(Ok(Ok(callback))) => Ok(callback),
        }
    }

    /// Shut the listener down, waiting at most `grace` for the socket to be
    /// released. Never blocks past the grace period.
    pub async fn stop(mut self, grace: Duration) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(_) => debug!("callback listener stopped"),
            Err(_) => {
                error!("callback listener did not stop within the grace period");
                self.task.abort();
            }
        }
    }
}

async fn handle_redirect(slot: CallbackSlot, params: HashMap<String, String>) -> Html<&'static str> {
    let outcome = if let Some(err) = params.get("error") {
        Err(format!("provider returned error: {err}"))
    } else {
        match params.get("code").filter(|code| !code.is_empty()) {
            Some(code) => Ok(Callback {
                code: code.clone(),
                state: params.get("state").cloned().unwrap_or_default(),
            }),
            None => Err("no authorization code in redirect".to_string()),
        }
    };

    let page = if outcome.is_ok() {
        SUCCESS_PAGE
    } else {
        ERROR_PAGE
    };

    // First request wins; later requests find the slot empty.
    if let Some(tx) = slot.lock().await.take() {
        let _ = tx.send(outcome);
    }
    Html(page)
}
