//! Auth payloads and the state derived from them

use serde::{Deserialize, Serialize};

/// Profile fields returned alongside a token pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<String>,
}

impl Profile {
    /// True when no field carries a non-empty value
    pub fn is_empty(&self) -> bool {
        [
            &self.id,
            &self.email,
            &self.name,
            &self.user_type,
            &self.subscription_status,
        ]
        .iter()
        .all(|field| field.as_deref().is_none_or(str::is_empty))
    }
}

/// Token pair produced by login, registration, OAuth callbacks and refreshes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    #[serde(flatten)]
    pub profile: Profile,
}

impl AuthData {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_in,
            profile: Profile::default(),
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Name the first missing required field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.access_token.trim().is_empty() {
            Some("access_token")
        } else if self.refresh_token.trim().is_empty() {
            Some("refresh_token")
        } else {
            None
        }
    }
}

/// Bare token triple written by the token store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl From<&AuthData> for TokenData {
    fn from(data: &AuthData) -> Self {
        Self {
            access_token: data.access_token.clone(),
            refresh_token: data.refresh_token.clone(),
            expires_in: data.expires_in,
        }
    }
}

/// Snapshot of the authentication state, derived from storage on every read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Absolute expiry in epoch milliseconds
    pub expires_at: Option<i64>,
    pub profile: Option<Profile>,
    pub is_expired: bool,
}

impl AuthState {
    /// State reported when nothing is stored or no storage exists
    pub const fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            access_token: None,
            refresh_token: None,
            expires_at: None,
            profile: None,
            is_expired: true,
        }
    }

    pub(crate) fn derive(
        access_token: Option<String>,
        refresh_token: Option<String>,
        expires_at: Option<i64>,
        profile: Option<Profile>,
        now_millis: i64,
    ) -> Self {
        let is_expired = expires_at.is_none_or(|at| now_millis >= at);
        let is_authenticated = access_token.is_some() && refresh_token.is_some() && !is_expired;

        Self {
            is_authenticated,
            access_token,
            refresh_token,
            expires_at,
            profile,
            is_expired,
        }
    }
}

/// Whether a write mirrors the essential fields into cookies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CookieMode {
    /// Write cookies alongside local storage
    #[default]
    Write,
    /// The server already issued the cookies with its response
    ServerManaged,
}

/// Why the persisted auth state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthChangeReason {
    Login,
    Logout,
    Refresh,
}

/// Notification published after every persisted auth change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChange {
    pub reason: AuthChangeReason,
}
