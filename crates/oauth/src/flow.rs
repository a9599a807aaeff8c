//! Authorization URL construction, code exchange, and token refresh.

use {
    secrecy::ExposeSecret,
    serde::Deserialize,
    tracing::debug,
    url::form_urlencoded,
};

use crate::{
    error::AuthError,
    pkce::generate_state,
    types::{AuthorizeRequest, OAuthConfig, OAuthTokens, PkceChallenge, default_token_type, unix_now},
};

/// Stateless protocol plumbing for one provider: builds authorization URLs
/// and talks to the token endpoint. The ephemeral per-attempt state lives in
/// the [`AuthorizeRequest`] returned by [`OAuthFlow::start`].
pub struct OAuthFlow {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl OAuthFlow {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Prepare one authorization attempt: PKCE pair, state nonce, and the
    /// URL the user must visit. `access_type=offline` asks the provider to
    /// also issue a refresh token.
    pub fn start(&self) -> AuthorizeRequest {
        let pkce = PkceChallenge::generate();
        let state = self
            .config
            .force_state
            .clone()
            .unwrap_or_else(generate_state);

        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri())
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &state)
            .append_pair("access_type", "offline");
        if !self.config.scopes.is_empty() {
            query.append_pair("scope", &self.config.scopes.join(" "));
        }
        let query = query.finish();

        let sep = if self.config.auth_url.contains('?') {
            '&'
        } else {
            '?'
        };
        let url = format!("{}{sep}{query}", self.config.auth_url);

        AuthorizeRequest {
            url,
            state,
            pkce,
        }
    }

    /// Exchange an authorization code plus PKCE verifier for tokens.
    /// Provider rejection is terminal; nothing is retried.
    pub async fn exchange(&self, code: &str, verifier: &str) -> Result<OAuthTokens, AuthError> {
        let redirect_uri = self.config.redirect_uri();
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier),
        ];
        if let Some(secret) = &self.config.client_secret {
            params.push(("client_secret", secret.expose_secret().as_str()));
        }

        debug!(token_url = %self.config.token_url, "exchanging authorization code");
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::Exchange {
                status,
                body,
            });
        }
        parse_token_response(&body).map_err(|e| AuthError::Exchange {
            status,
            body: format!("invalid token response: {e}"),
        })
    }

    /// Refresh the access token. The prior refresh token is preserved when
    /// the provider does not return a new one.
    pub async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, AuthError> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            params.push(("client_secret", secret.expose_secret().as_str()));
        }

        debug!(token_url = %self.config.token_url, "refreshing access token");
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::Refresh {
                status,
                body,
            });
        }

        let mut tokens = parse_token_response(&body).map_err(|e| AuthError::Refresh {
            status,
            body: format!("invalid token response: {e}"),
        })?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        Ok(tokens)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

fn parse_token_response(body: &str) -> Result<OAuthTokens, serde_json::Error> {
    let response: TokenResponse = serde_json::from_str(body)?;
    Ok(OAuthTokens {
        access_token: response.access_token,
        token_type: response.token_type,
        refresh_token: response.refresh_token,
        expires_at: response.expires_in.map(|secs| unix_now() + secs),
    })
}
