//! CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;
use directories::ProjectDirs;
use finranks_core::persistence::AuthPersistence;
use finranks_core::storage::{CookieAttributes, CookieJar, FileStore, KeyValueCookieJar};
use finranks_core::{AuthState, AuthSynchronizer, Clock, ClientConfig, SystemClock, TokenStore};
use finranks_http::{ApiClient, ApiClientBuilder};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config;

const SESSION_FILE: &str = "auth.json";
const COOKIE_FILE: &str = "cookies.json";

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "FINRANKS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,

        #[arg(long, env = "FINRANKS_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name for the account
        #[arg(long)]
        name: String,
    },

    /// Show the stored session as JSON, tokens masked
    Status,

    /// Forget the stored session
    Logout,

    /// Authenticated GET against the API, printing the JSON body
    Get {
        /// Path relative to the API base URL, e.g. /watchlist
        path: String,
    },

    /// Configuration file operations
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate a default configuration file
    Init {
        /// Output file path (defaults to <data-dir>/config.json)
        output: Option<PathBuf>,
    },
}

/// Data directory: explicit flag or `FINRANKS_STATE_DIR`, then the platform
/// data dir, then `./.finranks`
pub fn resolve_data_dir(data_dir: Option<PathBuf>) -> PathBuf {
    data_dir.unwrap_or_else(|| {
        ProjectDirs::from("com", "Finranks", "finranks").map_or_else(
            || {
                // Logging is not up yet, it needs this directory
                eprintln!("warning: no platform data directory, using ./.finranks");
                PathBuf::from(".finranks")
            },
            |dirs| dirs.data_dir().to_path_buf(),
        )
    })
}

/// Build an API client whose "local storage" and cookie jar are JSON files
/// under `data_dir`
pub fn open_client(data_dir: &Path, config: &ClientConfig) -> Result<ApiClient> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let local = FileStore::open(data_dir.join(SESSION_FILE))
        .context("Failed to open session store")?;
    let cookie_store =
        FileStore::open(data_dir.join(COOKIE_FILE)).context("Failed to open cookie store")?;
    let cookies: Arc<dyn CookieJar> =
        Arc::new(KeyValueCookieJar::new(Arc::new(cookie_store), clock.clone()));

    let attributes = CookieAttributes::for_environment(
        config.cookies.environment,
        config.root_domain().as_deref(),
    );
    let persistence = AuthPersistence::new(Arc::new(local), Some(cookies), attributes);
    let tokens = TokenStore::new(AuthSynchronizer::new(persistence, clock));

    ApiClientBuilder::from_config(&config.api)
        .token_store(tokens)
        .build()
        .context("Failed to build API client")
}

impl Commands {
    pub async fn execute(self, data_dir: PathBuf, client_config: ClientConfig) -> Result<()> {
        match self {
            Self::Config { command } => command.execute(&data_dir),
            Self::Login { email, password } => {
                let client = open_client(&data_dir, &client_config)?;
                let state = client
                    .login(&email, &password)
                    .await
                    .context("Login failed")?;
                info!("Signed in");
                print_json(&masked_state(&state))
            }
            Self::Register {
                email,
                password,
                name,
            } => {
                let client = open_client(&data_dir, &client_config)?;
                let state = client
                    .register(&email, &password, &name)
                    .await
                    .context("Registration failed")?;
                info!("Account created");
                print_json(&masked_state(&state))
            }
            Self::Status => {
                let client = open_client(&data_dir, &client_config)?;
                print_json(&masked_state(&client.synchronizer().get_auth_state()))
            }
            Self::Logout => {
                let client = open_client(&data_dir, &client_config)?;
                client.logout();
                println!("Signed out");
                Ok(())
            }
            Self::Get { path } => {
                let client = open_client(&data_dir, &client_config)?;
                let path = if path.starts_with('/') {
                    path
                } else {
                    format!("/{path}")
                };
                let body: Value = client
                    .get(&path)
                    .await
                    .with_context(|| format!("GET {path} failed"))?;
                print_json(&body)
            }
        }
    }
}

impl ConfigCommands {
    pub fn execute(self, data_dir: &Path) -> Result<()> {
        match self {
            Self::Init { output } => {
                let config_path = output.unwrap_or_else(|| data_dir.join(config::CONFIG_FILE));

                // Create parent directory if it doesn't exist
                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                config::generate_default_config(&config_path)?;
                println!("Generated configuration at: {}", config_path.display());
                Ok(())
            }
        }
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Keep the first few characters of a token
fn mask(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}***")
}

fn masked_state(state: &AuthState) -> Value {
    json!({
        "is_authenticated": state.is_authenticated,
        "is_expired": state.is_expired,
        "expires_at": state.expires_at,
        "access_token": state.access_token.as_deref().map(mask),
        "refresh_token": state.refresh_token.as_deref().map(mask),
        "profile": state.profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use finranks_core::AuthData;
    use finranks_core::types::CookieMode;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_data_dir_wins() {
        let dir = PathBuf::from("/tmp/finranks-state");
        assert_eq!(resolve_data_dir(Some(dir.clone())), dir);
        assert!(!resolve_data_dir(None).as_os_str().is_empty());
    }

    #[test]
    fn test_mask_hides_token_tail() {
        assert_eq!(mask("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbG***");
        assert_eq!(mask("abc"), "abc***");
    }

    #[test]
    fn test_session_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::default();

        let client = open_client(dir.path(), &config).unwrap();
        assert!(
            client
                .synchronizer()
                .set_auth_data(&AuthData::new("access-1", "refresh-1", 3600), CookieMode::Write)
        );

        let reopened = open_client(dir.path(), &config).unwrap();
        let state = reopened.synchronizer().get_auth_state();
        assert!(state.is_authenticated);

        let masked = masked_state(&state);
        assert_eq!(masked["access_token"], "access***");
        assert_eq!(masked["refresh_token"], "refres***");

        reopened.logout();
        assert!(!open_client(dir.path(), &config).unwrap().synchronizer().is_authenticated());
    }

    #[test]
    fn test_config_init_writes_default() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("nested").join("finranks.json");

        ConfigCommands::Init {
            output: Some(output.clone()),
        }
        .execute(dir.path())
        .unwrap();

        assert!(output.exists());
    }
}
