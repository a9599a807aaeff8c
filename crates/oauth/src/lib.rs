//! OAuth2 authorization-code + PKCE login for local, single-user tools.
//!
//! Opens the provider's consent page in the browser, captures the redirect
//! on a short-lived local listener, exchanges the code for tokens, and
//! persists them so later runs never need the browser again. Expired access
//! tokens are refreshed and saved transparently.
//!
//! ```no_run
//! use lantern_oauth::{Manager, OAuthConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = OAuthConfig::new(
//!     std::env::var("CLIENT_ID")?,
//!     "https://accounts.google.com/o/oauth2/auth",
//!     "https://oauth2.googleapis.com/token",
//! );
//! config.scopes = vec!["email".into(), "profile".into()];
//!
//! let manager = Manager::new(config);
//! let client = manager.acquire_client().await?;
//! let me = client
//!     .get("https://www.googleapis.com/oauth2/v1/userinfo")
//!     .send()
//!     .await?
//!     .text()
//!     .await?;
//! println!("{me}");
//! # Ok(()) }
//! ```

pub mod browser;
pub mod callback_server;
pub mod error;
pub mod flow;
pub mod manager;
pub mod pkce;
pub mod storage;
pub mod types;

pub use callback_server::{Callback, CallbackServer};
pub use error::{AuthError, StorageError};
pub use flow::OAuthFlow;
pub use manager::{AuthenticatedClient, Manager};
pub use storage::TokenStore;
pub use types::{AuthorizeRequest, OAuthConfig, OAuthTokens, PkceChallenge};
