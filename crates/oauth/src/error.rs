use thiserror::Error;

/// Errors from the on-disk token store.
///
/// A missing token file is not an error: [`crate::TokenStore::load`] reports
/// it as `Ok(None)` so the caller can fall back to an interactive flow. The
/// variants here are always surfaced instead of silently re-authenticating.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("token file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("token file malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from the authorization flow.
///
/// Everything except the non-fatal paths noted on
/// [`crate::Manager::acquire_client`] is terminal for the attempt: the
/// interactive flow is never retried automatically.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to bind callback listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out waiting for the authorization redirect")]
    Timeout,

    #[error("callback error: {0}")]
    Receiver(String),

    #[error("oauth state mismatch")]
    StateMismatch,

    #[error("token exchange failed (HTTP {status}): {body}")]
    Exchange {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("token refresh failed (HTTP {status}): {body}")]
    Refresh {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("access token expired and no refresh token is available")]
    NoRefreshToken,

    #[error("failed to persist token: {0}")]
    Persist(#[source] StorageError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
