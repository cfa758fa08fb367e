//! Authentication API client methods

use super::{ApiClient, ClientError};
use crate::types::{AuthResponse, LOGIN_PATH, LoginRequest, REGISTER_PATH, RegisterRequest};
use finranks_core::{AuthData, AuthState, CookieMode, TokenData};
use tracing::{error, info};

impl ApiClient {
    /// Exchange credentials for a session and persist it
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthState, ClientError> {
        let req = self
            .request(reqwest::Method::POST, LOGIN_PATH)
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            });
        let response: AuthResponse = self.execute_public(req).await?;
        self.establish_session(&response.into(), CookieMode::Write)
    }

    /// Create an account and persist the session it comes with
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthState, ClientError> {
        let req = self
            .request(reqwest::Method::POST, REGISTER_PATH)
            .json(&RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
            });
        let response: AuthResponse = self.execute_public(req).await?;
        self.establish_session(&response.into(), CookieMode::Write)
    }

    /// Persist tokens handed over by an OAuth callback; the server has
    /// already set the cookies
    pub fn complete_oauth(&self, data: &AuthData) -> Result<AuthState, ClientError> {
        self.establish_session(data, CookieMode::ServerManaged)
    }

    /// Drop the local session
    pub fn logout(&self) {
        self.synchronizer().clear_auth();
        info!("Logged out");
    }

    fn establish_session(
        &self,
        data: &AuthData,
        mode: CookieMode,
    ) -> Result<AuthState, ClientError> {
        if let Some(field) = data.missing_field() {
            return Err(ClientError::InvalidAuthPayload(format!("missing {field}")));
        }
        if !self.synchronizer().set_auth_data(data, mode) {
            return Err(ClientError::InvalidAuthPayload(
                "session could not be stored".into(),
            ));
        }
        if let Err(err) = self.tokens().set_token_data(&TokenData::from(data)) {
            error!(error = %err, "Failed to write legacy token keys");
        }
        info!(expires_in = data.expires_in, "Session established");
        Ok(self.synchronizer().get_auth_state())
    }
}
