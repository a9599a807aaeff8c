use std::{
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Default address for the local callback listener.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:15440";
/// Default path the provider redirects back to.
pub const DEFAULT_CALLBACK_PATH: &str = "/callback";
/// Default file the token is persisted to.
pub const DEFAULT_TOKEN_FILE: &str = "token.json";
/// Default time to wait for the user to finish authorizing in the browser.
pub const DEFAULT_AUTHORIZE_TIMEOUT: Duration = Duration::from_secs(300);

/// Leeway subtracted from the expiry when deciding whether to refresh, so a
/// token is never handed out moments before the provider rejects it.
const EXPIRY_LEEWAY_SECS: u64 = 30;

/// OAuth 2.0 provider configuration.
///
/// Immutable for the lifetime of a [`crate::Manager`].
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Client secret for confidential clients. Public PKCE-only clients
    /// leave this `None`.
    pub client_secret: Option<SecretString>,
    /// Authorization endpoint URL.
    pub auth_url: String,
    /// Token endpoint URL.
    pub token_url: String,
    pub scopes: Vec<String>,
    /// Address the local callback listener binds to.
    pub bind_addr: String,
    /// Path the provider redirects back to.
    pub callback_path: String,
    /// File the token is persisted to.
    pub token_file: PathBuf,
    /// How long to wait for the authorization redirect before giving up.
    pub authorize_timeout: Duration,
    /// Open the user's browser automatically. The authorization URL is
    /// printed for manual use when this is disabled or the launch fails.
    pub open_browser: bool,
    /// Force a specific state value (for testing).
    pub force_state: Option<String>,
}

impl OAuthConfig {
    /// Build a config with the given endpoints and defaults for everything
    /// else: no scopes, public client, `127.0.0.1:15440`, `/callback`,
    /// `token.json`, 5-minute authorize timeout, browser launch enabled.
    pub fn new(
        client_id: impl Into<String>,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            scopes: Vec::new(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            authorize_timeout: DEFAULT_AUTHORIZE_TIMEOUT,
            open_browser: true,
            force_state: None,
        }
    }

    /// The redirect URI the provider sends the user back to. Derived from the
    /// bind address and callback path; register this exact value with the
    /// provider.
    pub fn redirect_uri(&self) -> String {
        format!("http://{}{}", self.bind_addr, self.callback_path)
    }
}

/// Stored OAuth tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    /// Usually "Bearer".
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix timestamp when the access token expires. `None` means the
    /// provider reported no expiry; the token is treated as valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl OAuthTokens {
    /// Whether the access token is expired (or about to be, within the
    /// leeway window).
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => unix_now() + EXPIRY_LEEWAY_SECS >= expires_at,
            None => false,
        }
    }
}

pub(crate) fn default_token_type() -> String {
    "Bearer".to_string()
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// PKCE challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

/// One prepared authorization attempt: the URL the user must visit plus the
/// ephemeral state nonce and PKCE verifier that have to survive until the
/// code exchange. Never persisted.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub url: String,
    pub state: String,
    pub pkce: PkceChallenge,
}
