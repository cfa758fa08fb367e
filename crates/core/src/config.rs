//! Client configuration and persisted key names

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names of every persisted auth key
pub struct AuthKeys;

impl AuthKeys {
    pub const ACCESS_TOKEN: &'static str = "access_token";
    pub const REFRESH_TOKEN: &'static str = "refresh_token";
    /// Holds the absolute expiry in epoch milliseconds
    pub const EXPIRES_AT: &'static str = "expires_in";
    pub const PROFILE: &'static str = "profile_data";

    pub const LEGACY_ACCESS_TOKEN: &'static str = "token";
    pub const LEGACY_REFRESH_TOKEN: &'static str = "refreshToken";
    pub const LEGACY_EXPIRES_AT: &'static str = "tokenExpiresAt";

    pub const ANONYMOUS_ACCESS_TOKEN: &'static str = "anonymous_access_token";
    pub const ANONYMOUS_EXPIRES_AT: &'static str = "anonymous_expires_in";
    pub const ANONYMOUS_SESSION_ID: &'static str = "anonymous_session_id";

    pub const COOKIE_ACCESS_TOKEN: &'static str = "finranks.access-token";
    pub const COOKIE_USER_TYPE: &'static str = "finranks.user-type";
    pub const COOKIE_EXPIRES_AT: &'static str = "finranks.expires-at";
    pub const COOKIE_USER_NAME: &'static str = "finranks.user-name";
    pub const COOKIE_SUBSCRIPTION_STATUS: &'static str = "finranks.subscription-status";

    /// Local keys removed on logout
    pub const SESSION_KEYS: [&'static str; 7] = [
        Self::ACCESS_TOKEN,
        Self::REFRESH_TOKEN,
        Self::EXPIRES_AT,
        Self::PROFILE,
        Self::LEGACY_ACCESS_TOKEN,
        Self::LEGACY_REFRESH_TOKEN,
        Self::LEGACY_EXPIRES_AT,
    ];

    pub const COOKIES: [&'static str; 5] = [
        Self::COOKIE_ACCESS_TOKEN,
        Self::COOKIE_USER_TYPE,
        Self::COOKIE_EXPIRES_AT,
        Self::COOKIE_USER_NAME,
        Self::COOKIE_SUBSCRIPTION_STATUS,
    ];
}

/// Deployment environment, decides cookie scoping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cookies: CookieConfig,

    /// Log level filter (e.g. "info", "debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,

    /// Request timeout in seconds (0 disables it)
    pub timeout_secs: u64,

    pub user_agent: String,
}

/// Cookie scoping configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default)]
    pub environment: Environment,

    /// Registrable domain cookies are scoped to in production.
    /// Derived from `api.base_url` when unset.
    #[serde(default)]
    pub root_domain: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            cookies: CookieConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            user_agent: concat!("finranks-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file, with `FINRANKS_` environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder()?
            .add_source(config::File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> Result<Self> {
        Self::builder()?
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Load from `path` when given, otherwise from the environment alone
    ///
    /// # Errors
    ///
    /// Returns an error if any source cannot be parsed
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_env(),
        }
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = Self::default();

        Ok(config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default("api.user_agent", defaults.api.user_agent)?
            .set_default("cookies.environment", "development")?
            .set_default("log_level", default_log_level())?)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("FINRANKS")
            .prefix_separator("_")
            .separator("__")
    }

    /// Root domain for production cookies
    pub fn root_domain(&self) -> Option<String> {
        self.cookies
            .root_domain
            .clone()
            .or_else(|| root_domain_of(&self.api.base_url))
    }
}

/// Last two labels of the URL's host, `None` for IP hosts and bare names
pub fn root_domain_of(base_url: &str) -> Option<String> {
    let url = url::Url::parse(base_url).ok()?;
    let url::Host::Domain(host) = url.host()? else {
        return None;
    };

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return None;
    }
    Some(labels[labels.len() - 2..].join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_root_domain_of() {
        assert_eq!(
            root_domain_of("https://api.finranks.com/v1"),
            Some("finranks.com".to_string())
        );
        assert_eq!(
            root_domain_of("https://finranks.com"),
            Some("finranks.com".to_string())
        );
        assert_eq!(root_domain_of("http://localhost:8000"), None);
        assert_eq!(root_domain_of("http://127.0.0.1:8000"), None);
        assert_eq!(root_domain_of("not a url"), None);
    }

    #[test]
    fn test_explicit_root_domain_wins() {
        let config = ClientConfig {
            cookies: CookieConfig {
                environment: Environment::Production,
                root_domain: Some("example.org".into()),
            },
            ..ClientConfig::default()
        };
        assert_eq!(config.root_domain().as_deref(), Some("example.org"));
    }

    #[test]
    fn test_from_file_merges_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"https://api.finranks.com\"\n\n[cookies]\nenvironment = \"production\""
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url, "https://api.finranks.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.cookies.environment, Environment::Production);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_session_keys_exclude_anonymous_session() {
        assert!(!AuthKeys::SESSION_KEYS.contains(&AuthKeys::ANONYMOUS_ACCESS_TOKEN));
        assert!(AuthKeys::SESSION_KEYS.contains(&AuthKeys::PROFILE));
    }
}
