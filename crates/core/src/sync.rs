//! Canonical auth state derived from persisted storage
//!
//! Nothing is cached: every read goes back to the stores, and every write
//! publishes an [`AuthChange`] so subscribers re-derive their view.

use crate::clock::{self, Clock};
use crate::config::AuthKeys;
use crate::persistence::{AuthPersistence, SessionRecord};
use crate::types::{AuthChange, AuthChangeReason, AuthData, AuthState, CookieMode};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

const CHANGE_CHANNEL_CAPACITY: usize = 32;

/// Reads, writes and broadcasts the unified auth state
#[derive(Clone, Debug)]
pub struct AuthSynchronizer {
    persistence: AuthPersistence,
    clock: Arc<dyn Clock>,
    changes: broadcast::Sender<AuthChange>,
}

impl AuthSynchronizer {
    pub fn new(persistence: AuthPersistence, clock: Arc<dyn Clock>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            persistence,
            clock,
            changes,
        }
    }

    pub fn persistence(&self) -> &AuthPersistence {
        &self.persistence
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Receive a notification after every login, refresh and logout
    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }

    /// Persist a freshly obtained session
    ///
    /// Returns `false` without writing anything when either token is empty,
    /// and `false` when a backend rejects the write.
    pub fn set_auth_data(&self, data: &AuthData, mode: CookieMode) -> bool {
        self.write(data, mode, AuthChangeReason::Login)
    }

    /// Persist the token pair returned by a refresh
    pub fn record_refresh(&self, data: &AuthData) -> bool {
        self.write(data, CookieMode::Write, AuthChangeReason::Refresh)
    }

    fn write(&self, data: &AuthData, mode: CookieMode, reason: AuthChangeReason) -> bool {
        if let Some(field) = data.missing_field() {
            error!(field, "Refusing to store auth data without a token");
            return false;
        }

        let record = SessionRecord {
            access_token: data.access_token.clone(),
            refresh_token: data.refresh_token.clone(),
            expires_at: clock::expires_at(self.clock.now_millis(), data.expires_in),
            expires_in: data.expires_in,
            profile: (!data.profile.is_empty()).then(|| data.profile.clone()),
        };

        if let Err(err) = self.persistence.store_session(&record, mode) {
            error!(error = %err, ?reason, "Failed to persist auth data");
            return false;
        }

        debug!(?reason, expires_at = record.expires_at, "Auth data stored");
        self.publish(reason);
        true
    }

    /// Derive the current state from storage
    pub fn get_auth_state(&self) -> AuthState {
        if !self.persistence.is_available() {
            return AuthState::unauthenticated();
        }

        let expires_at = self
            .persistence
            .read(AuthKeys::EXPIRES_AT)
            .and_then(|raw| raw.trim().parse::<i64>().ok());

        AuthState::derive(
            self.persistence.read(AuthKeys::ACCESS_TOKEN),
            self.persistence.read(AuthKeys::REFRESH_TOKEN),
            expires_at,
            self.persistence.read_profile(),
            self.clock.now_millis(),
        )
    }

    /// Remove every stored session key and expire every auth cookie
    pub fn clear_auth(&self) {
        if !self.persistence.is_available() {
            return;
        }

        if let Err(err) = self.persistence.erase_session() {
            error!(error = %err, "Failed to fully clear auth state");
        }
        info!("Auth state cleared");
        self.publish(AuthChangeReason::Logout);
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_auth_state().is_authenticated
    }

    /// Access token of an authenticated session; `None` once it expired
    pub fn access_token(&self) -> Option<String> {
        let state = self.get_auth_state();
        if state.is_authenticated {
            state.access_token
        } else {
            None
        }
    }

    /// `Authorization` header value for an authenticated session
    pub fn auth_header(&self) -> Option<String> {
        self.access_token().map(|token| format!("Bearer {token}"))
    }

    fn publish(&self, reason: AuthChangeReason) {
        // No receivers is fine
        let _ = self.changes.send(AuthChange { reason });
    }
}
