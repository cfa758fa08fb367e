//! Wire types for the auth endpoints

use finranks_core::{AuthData, Profile};
use serde::{Deserialize, Serialize};

/// Refresh endpoint; 401s from it are never retried
pub const REFRESH_TOKEN_PATH: &str = "/auth/refresh-token";
pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";

/// Refresh token request
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Login request
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Display name for the account
    pub name: String,
}

/// Token pair issued by login and registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Profile>,
}

impl From<AuthResponse> for AuthData {
    fn from(response: AuthResponse) -> Self {
        Self::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
        )
        .with_profile(response.user.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_response_without_user() {
        let response: AuthResponse = serde_json::from_value(json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "expires_in": 3600
        }))
        .unwrap();

        let data = AuthData::from(response);
        assert_eq!(data.access_token, "a1");
        assert!(data.profile.is_empty());
    }

    #[test]
    fn test_auth_response_carries_profile() {
        let response: AuthResponse = serde_json::from_value(json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "expires_in": 60,
            "user": { "name": "Ada", "user_type": "premium" }
        }))
        .unwrap();

        let data = AuthData::from(response);
        assert_eq!(data.profile.name.as_deref(), Some("Ada"));
        assert_eq!(data.profile.user_type.as_deref(), Some("premium"));
    }
}
