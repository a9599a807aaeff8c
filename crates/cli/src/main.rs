use std::{
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    anyhow::{Context, Result},
    clap::{Args, Parser, Subcommand},
    lantern_oauth::{Manager, OAuthConfig, TokenStore},
    secrecy::SecretString,
    tracing_subscriber::EnvFilter,
};

#[derive(Parser)]
#[command(
    name = "lantern",
    about = "Log in to an OAuth2 provider and make authenticated requests"
)]
struct Cli {
    #[command(flatten)]
    provider: ProviderArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ProviderArgs {
    /// OAuth2 client ID.
    #[arg(long, env = "LANTERN_CLIENT_ID")]
    client_id: String,

    /// OAuth2 client secret (omit for public PKCE-only clients).
    #[arg(long, env = "LANTERN_CLIENT_SECRET")]
    client_secret: Option<String>,

    /// Authorization endpoint URL.
    #[arg(long, env = "LANTERN_AUTH_URL")]
    auth_url: String,

    /// Token endpoint URL.
    #[arg(long, env = "LANTERN_TOKEN_URL")]
    token_url: String,

    /// Requested scopes, comma-separated.
    #[arg(long, env = "LANTERN_SCOPES", value_delimiter = ',')]
    scopes: Vec<String>,

    /// Address for the local callback listener.
    #[arg(long, env = "LANTERN_BIND_ADDR", default_value = "127.0.0.1:15440")]
    bind_addr: String,

    /// Path the provider redirects back to.
    #[arg(long, env = "LANTERN_CALLBACK_PATH", default_value = "/callback")]
    callback_path: String,

    /// File the token is persisted to.
    #[arg(long, env = "LANTERN_TOKEN_FILE", default_value = "token.json")]
    token_file: PathBuf,

    /// Seconds to wait for the authorization redirect.
    #[arg(long, default_value_t = 300)]
    authorize_timeout: u64,

    /// Do not open the browser automatically; print the URL instead.
    #[arg(long, default_value_t = false)]
    no_browser: bool,
}

impl ProviderArgs {
    fn into_config(self) -> OAuthConfig {
        let mut config = OAuthConfig::new(self.client_id, self.auth_url, self.token_url);
        config.client_secret = self.client_secret.map(SecretString::new);
        config.scopes = self.scopes;
        config.bind_addr = self.bind_addr;
        config.callback_path = self.callback_path;
        config.token_file = self.token_file;
        config.authorize_timeout = Duration::from_secs(self.authorize_timeout);
        config.open_browser = !self.no_browser;
        config
    }
}

#[derive(Subcommand)]
enum Command {
    /// Log in interactively, replacing any cached token.
    Login,
    /// Show cached token status.
    Status,
    /// Delete the cached token.
    Logout,
    /// Perform an authenticated GET and print the response body.
    Get { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let manager = Manager::new(cli.provider.into_config());

    match cli.command {
        Command::Login => login(&manager).await,
        Command::Status => status(manager.store()),
        Command::Logout => logout(manager.store()),
        Command::Get { url } => get(&manager, &url).await,
    }
}

async fn login(manager: &Manager) -> Result<()> {
    let tokens = manager.login().await.context("login failed")?;
    match remaining(tokens.expires_at) {
        Some(text) => println!("Logged in [{text}]"),
        None => println!("Logged in"),
    }
    Ok(())
}

fn status(store: &TokenStore) -> Result<()> {
    match store.load()? {
        None => println!("Not logged in."),
        Some(tokens) => {
            let expiry = remaining(tokens.expires_at).unwrap_or_else(|| "no expiry".to_string());
            let refresh = if tokens.refresh_token.is_some() {
                "refreshable"
            } else {
                "no refresh token"
            };
            println!("{} [{expiry}, {refresh}]", store.path().display());
        }
    }
    Ok(())
}

fn logout(store: &TokenStore) -> Result<()> {
    store.delete()?;
    println!("Logged out; removed {}", store.path().display());
    Ok(())
}

async fn get(manager: &Manager, url: &str) -> Result<()> {
    let client = manager.acquire_client().await?;
    let response = client.get(url).send().await.context("request failed")?;
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{body}"),
    }

    if !status.is_success() {
        anyhow::bail!("request returned HTTP {status}");
    }
    Ok(())
}

fn remaining(expires_at: Option<u64>) -> Option<String> {
    let ts = expires_at?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if ts > now {
        let left = ts - now;
        Some(format!("valid ({}h {}m remaining)", left / 3600, (left % 3600) / 60))
    } else {
        Some("expired".to_string())
    }
}
