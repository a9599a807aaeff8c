//! The token-lifecycle orchestrator.

use {
    reqwest::Method,
    tracing::{info, warn},
};

use crate::{
    browser,
    callback_server::{CallbackServer, SHUTDOWN_GRACE},
    error::AuthError,
    flow::OAuthFlow,
    storage::TokenStore,
    types::{OAuthConfig, OAuthTokens},
};

/// Drives the whole token lifecycle: cached token reuse, the interactive
/// authorization handshake on cache miss, eager refresh of expired tokens,
/// and persistence of anything newly issued.
///
/// Safe to share across tasks after construction. The token file itself is
/// not locked: concurrent `acquire_client` calls, or multiple processes
/// pointed at the same file, race last-write-wins.
pub struct Manager {
    flow: OAuthFlow,
    store: TokenStore,
    http: reqwest::Client,
}

impl Manager {
    pub fn new(config: OAuthConfig) -> Self {
        let store = TokenStore::new(config.token_file.clone());
        Self {
            flow: OAuthFlow::new(config),
            store,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        self.flow.config()
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Return a client holding a valid, non-expired token, driving the
    /// interactive flow first when nothing is cached.
    ///
    /// A token freshly issued by the interactive flow must be persisted:
    /// failure there is fatal, since the user would otherwise re-authenticate
    /// on every call. Failing to persist an opportunistically refreshed token
    /// is only logged; the caller still gets a working client.
    pub async fn acquire_client(&self) -> Result<AuthenticatedClient, AuthError> {
        let mut tokens = match self.store.load()? {
            Some(tokens) => tokens,
            None => {
                let tokens = self.interactive_flow().await?;
                self.store.save(&tokens).map_err(AuthError::Persist)?;
                info!(path = %self.store.path().display(), "new token persisted");
                tokens
            }
        };

        // Eager validation: only hand out a non-expired token.
        if tokens.is_expired() {
            let refresh_token = tokens
                .refresh_token
                .clone()
                .ok_or(AuthError::NoRefreshToken)?;
            let refreshed = self.flow.refresh(&refresh_token).await?;
            if refreshed.access_token != tokens.access_token {
                if let Err(e) = self.store.save(&refreshed) {
                    warn!(error = %e, "failed to persist refreshed token, continuing with in-memory token");
                }
            }
            tokens = refreshed;
        }

        Ok(AuthenticatedClient {
            http: self.http.clone(),
            tokens,
        })
    }

    /// Run the interactive flow unconditionally and persist the result,
    /// replacing any cached token.
    pub async fn login(&self) -> Result<OAuthTokens, AuthError> {
        let tokens = self.interactive_flow().await?;
        self.store.save(&tokens).map_err(AuthError::Persist)?;
        info!(path = %self.store.path().display(), "new token persisted");
        Ok(tokens)
    }

    /// The interactive authorization handshake: open the consent page,
    /// capture the redirect on a local listener, exchange the code.
    ///
    /// Terminal on timeout, receiver error, state mismatch, or provider
    /// rejection; the listener is always torn down within its grace period.
    async fn interactive_flow(&self) -> Result<OAuthTokens, AuthError> {
        let config = self.flow.config();
        let request = self.flow.start();

        let mut server = CallbackServer::bind(&config.bind_addr, &config.callback_path).await?;

        println!("Opening browser for authentication...");
        let opened = config.open_browser
            && match browser::open_in_browser(&request.url) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "failed to open browser");
                    false
                }
            };
        if !opened {
            println!(
                "Please open the following URL in your browser:\n{}",
                request.url
            );
        }

        let outcome = server.wait(config.authorize_timeout).await;
        server.stop(SHUTDOWN_GRACE).await;
        let callback = outcome?;

        if callback.state != request.state {
            return Err(AuthError::StateMismatch);
        }

        println!("Exchanging authorization code for token...");
        self.flow
            .exchange(&callback.code, &request.pkce.verifier)
            .await
    }
}

/// An HTTP client that attaches the bearer token to every outgoing request.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    tokens: OAuthTokens,
}

impl AuthenticatedClient {
    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.tokens.access_token)
    }

    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    pub fn tokens(&self) -> &OAuthTokens {
        &self.tokens
    }
}
