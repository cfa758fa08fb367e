//! Finranks API client
//!
//! Every request built here goes through the same pipeline: the current
//! bearer token is attached right before sending, and a 401 triggers one
//! refresh-and-retry, deduplicated across concurrent requests by the
//! client's [`refresh::RefreshCoordinator`].

pub mod auth;
pub mod error;
pub mod refresh;

use crate::types::{REFRESH_TOKEN_PATH, RefreshTokenRequest, RefreshTokenResponse};
use error::{ClientError, RefreshError};
use finranks_core::config::ApiConfig;
use finranks_core::{AuthData, AuthSynchronizer, TokenData, TokenStore, sanitize_token};
use refresh::RefreshCoordinator;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, ClientBuilder, Request, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// API client with bearer attachment and silent token refresh
///
/// Clones share one refresh gate; separately built clients never do.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: TokenStore,
    refresh: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn synchronizer(&self) -> &AuthSynchronizer {
        self.tokens.synchronizer()
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a request builder; the bearer token is attached at send time
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Send through the auth pipeline and decode a JSON body
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// Send without a bearer token and without refresh handling
    pub async fn execute_public<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        Self::decode(response).await
    }

    /// GET `path` through the auth pipeline
    pub async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(self.request(reqwest::Method::GET, path)).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }

    /// Send through the auth pipeline, returning the raw response
    ///
    /// A 401 is retried at most once, after a refresh. A non-retryable 401
    /// comes back as [`ClientError::AuthenticationFailed`] and a failed
    /// refresh as [`ClientError::SessionExpired`]; the retried attempt's
    /// response is returned whatever its status.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ClientError> {
        let request = request.build()?;
        let is_refresh_call = request.url().path().ends_with(REFRESH_TOKEN_PATH);
        let retry = request.try_clone();

        let sent_with = self.tokens.get_token();
        let response = self
            .client
            .execute(with_bearer(request, sent_with.as_deref())?)
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| StatusCode::UNAUTHORIZED.to_string());

        if is_refresh_call {
            debug!("Refresh endpoint rejected the request, not refreshing");
            return Err(ClientError::AuthenticationFailed(message));
        }
        let Some(retry) = retry else {
            debug!("Request body cannot be replayed, not refreshing");
            return Err(ClientError::AuthenticationFailed(message));
        };

        let token = match self.tokens.get_token() {
            // A refresh finished while this request was on the wire
            Some(current)
                if sent_with.as_deref() != Some(current.as_str())
                    && self.refresh.is_latest(&current) =>
            {
                current
            }
            _ => self
                .refresh
                .run(|| self.refresh_session())
                .await
                .map_err(|reason| ClientError::SessionExpired { message, reason })?,
        };

        debug!(url = %retry.url(), "Retrying request with refreshed token");
        Ok(self.client.execute(with_bearer(retry, Some(&token))?).await?)
    }

    /// Exchange the stored refresh token for a new pair and persist it;
    /// clears the session when that is impossible
    async fn refresh_session(&self) -> Result<String, RefreshError> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            warn!("No refresh token stored, clearing session");
            self.synchronizer().clear_auth();
            return Err(RefreshError::MissingRefreshToken);
        };

        match self.call_refresh_endpoint(&refresh_token).await {
            Ok(tokens) => {
                let data = AuthData::new(tokens.access_token, tokens.refresh_token, tokens.expires_in);
                if !self.synchronizer().record_refresh(&data) {
                    error!("Refreshed tokens could not be stored");
                }
                if let Err(err) = self.tokens.set_token_data(&TokenData::from(&data)) {
                    error!(error = %err, "Failed to write legacy token keys");
                }
                info!(expires_in = data.expires_in, "Session refreshed");
                Ok(data.access_token)
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed, clearing session");
                self.synchronizer().clear_auth();
                Err(err)
            }
        }
    }

    async fn call_refresh_endpoint(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshTokenResponse, RefreshError> {
        let response = self
            .client
            .post(self.url(REFRESH_TOKEN_PATH))
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|err| RefreshError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let tokens: RefreshTokenResponse = response
            .json()
            .await
            .map_err(|err| RefreshError::InvalidResponse(err.to_string()))?;
        if tokens.access_token.trim().is_empty() || tokens.refresh_token.trim().is_empty() {
            return Err(RefreshError::InvalidResponse("empty token in response".into()));
        }
        Ok(tokens)
    }
}

/// Replace the request's `Authorization` header with the sanitized token
fn with_bearer(mut request: Request, token: Option<&str>) -> Result<Request, ClientError> {
    if let Some(token) = token.and_then(sanitize_token) {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::Configuration("token is not a valid header value".into()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    tokens: Option<TokenStore>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Start from the `api` section of the client configuration
    pub fn from_config(config: &ApiConfig) -> Self {
        let mut builder = Self::default()
            .base_url(&config.base_url)
            .user_agent(&config.user_agent);
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        builder
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the token store the bearer is read from and refreshes write to
    #[must_use]
    pub fn token_store(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Set the request timeout; it also bounds the refresh call
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let tokens = self
            .tokens
            .ok_or_else(|| ClientError::Configuration("token_store is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| concat!("finranks-client/", env!("CARGO_PKG_VERSION")).into()),
        );

        Ok(ApiClient {
            client: client_builder.build()?,
            base_url,
            tokens,
            refresh: Arc::new(RefreshCoordinator::new()),
        })
    }
}
