//! Bearer token lookup with legacy and anonymous fallbacks

use crate::clock;
use crate::config::AuthKeys;
use crate::sync::AuthSynchronizer;
use crate::types::TokenData;
use crate::Result;

/// Strip wrapping quotes and whitespace; blank tokens are absent
pub fn sanitize_token(raw: &str) -> Option<String> {
    let token = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Accessor for the bearer token attached to outgoing requests
#[derive(Clone, Debug)]
pub struct TokenStore {
    sync: AuthSynchronizer,
}

impl TokenStore {
    pub fn new(sync: AuthSynchronizer) -> Self {
        Self { sync }
    }

    pub fn synchronizer(&self) -> &AuthSynchronizer {
        &self.sync
    }

    /// Current bearer token
    ///
    /// Precedence: authenticated unified token, then the legacy token (even
    /// if stale, so the server can answer 401 and trigger a refresh), then a
    /// live anonymous session token.
    pub fn get_token(&self) -> Option<String> {
        let persistence = self.sync.persistence();

        self.sync
            .access_token()
            .and_then(|token| sanitize_token(&token))
            .or_else(|| {
                persistence
                    .read(AuthKeys::LEGACY_ACCESS_TOKEN)
                    .and_then(|token| sanitize_token(&token))
            })
            .or_else(|| self.anonymous_token())
    }

    /// Refresh token from the unified keys, then the legacy key
    pub fn refresh_token(&self) -> Option<String> {
        let persistence = self.sync.persistence();

        persistence
            .read(AuthKeys::REFRESH_TOKEN)
            .or_else(|| persistence.read(AuthKeys::LEGACY_REFRESH_TOKEN))
            .and_then(|token| sanitize_token(&token))
    }

    /// Write a token triple to the unified and legacy keys
    ///
    /// # Errors
    ///
    /// Returns an error if the local store rejects a write
    pub fn set_token_data(&self, data: &TokenData) -> Result<()> {
        let expires_at =
            clock::expires_at(self.sync.clock().now_millis(), data.expires_in).to_string();

        self.sync.persistence().write_local(&[
            (AuthKeys::ACCESS_TOKEN, data.access_token.as_str()),
            (AuthKeys::REFRESH_TOKEN, data.refresh_token.as_str()),
            (AuthKeys::EXPIRES_AT, expires_at.as_str()),
            (AuthKeys::LEGACY_ACCESS_TOKEN, data.access_token.as_str()),
            (AuthKeys::LEGACY_REFRESH_TOKEN, data.refresh_token.as_str()),
            (AuthKeys::LEGACY_EXPIRES_AT, expires_at.as_str()),
        ])
    }

    /// Store the token of an anonymous browsing session
    ///
    /// # Errors
    ///
    /// Returns an error if the local store rejects a write
    pub fn set_anonymous_session(
        &self,
        token: &str,
        expires_in: i64,
        session_id: Option<&str>,
    ) -> Result<()> {
        let expires_at = clock::expires_at(self.sync.clock().now_millis(), expires_in).to_string();
        let persistence = self.sync.persistence();

        persistence.write_local(&[
            (AuthKeys::ANONYMOUS_ACCESS_TOKEN, token),
            (AuthKeys::ANONYMOUS_EXPIRES_AT, expires_at.as_str()),
        ])?;
        match session_id {
            Some(id) => persistence.write_local(&[(AuthKeys::ANONYMOUS_SESSION_ID, id)]),
            None => persistence.remove_local(&[AuthKeys::ANONYMOUS_SESSION_ID]),
        }
    }

    /// # Errors
    ///
    /// Returns the first removal failure
    pub fn clear_anonymous_session(&self) -> Result<()> {
        self.sync.persistence().remove_local(&[
            AuthKeys::ANONYMOUS_ACCESS_TOKEN,
            AuthKeys::ANONYMOUS_EXPIRES_AT,
            AuthKeys::ANONYMOUS_SESSION_ID,
        ])
    }

    /// Drop the legacy token keys, leaving the unified session intact
    ///
    /// # Errors
    ///
    /// Returns the first removal failure
    pub fn clear_legacy(&self) -> Result<()> {
        self.sync.persistence().remove_local(&[
            AuthKeys::LEGACY_ACCESS_TOKEN,
            AuthKeys::LEGACY_REFRESH_TOKEN,
            AuthKeys::LEGACY_EXPIRES_AT,
        ])
    }

    pub fn anonymous_session_id(&self) -> Option<String> {
        self.sync.persistence().read(AuthKeys::ANONYMOUS_SESSION_ID)
    }

    fn anonymous_token(&self) -> Option<String> {
        let persistence = self.sync.persistence();
        let token = persistence
            .read(AuthKeys::ANONYMOUS_ACCESS_TOKEN)
            .and_then(|token| sanitize_token(&token))?;

        let expired = persistence
            .read(AuthKeys::ANONYMOUS_EXPIRES_AT)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .is_some_and(|at| self.sync.clock().now_millis() >= at);

        (!expired).then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::persistence::AuthPersistence;
    use crate::storage::{CookieAttributes, KeyValueStore, MemoryStore};
    use crate::types::{AuthData, CookieMode};
    use std::sync::Arc;
    use std::time::Duration;

    fn store() -> (TokenStore, Arc<ManualClock>, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let local = Arc::new(MemoryStore::new());
        let persistence = AuthPersistence::new(local.clone(), None, CookieAttributes::default());
        let sync = AuthSynchronizer::new(persistence, clock.clone());
        (TokenStore::new(sync), clock, local)
    }

    #[test]
    fn test_sanitize_token() {
        assert_eq!(sanitize_token("\"abc\""), Some("abc".to_string()));
        assert_eq!(sanitize_token("  'abc'  "), Some("abc".to_string()));
        assert_eq!(sanitize_token(" \" abc \" "), Some("abc".to_string()));
        assert_eq!(sanitize_token("\"\""), None);
        assert_eq!(sanitize_token("   "), None);
    }

    #[test]
    fn test_unified_token_takes_precedence() {
        let (store, _, local) = store();
        local.set(AuthKeys::LEGACY_ACCESS_TOKEN, "legacy").unwrap();
        local.set(AuthKeys::ANONYMOUS_ACCESS_TOKEN, "anon").unwrap();
        store
            .synchronizer()
            .set_auth_data(&AuthData::new("\"unified\"", "r1", 3600), CookieMode::Write);

        assert_eq!(store.get_token().as_deref(), Some("unified"));
    }

    #[test]
    fn test_expired_session_falls_back_to_legacy_token() {
        let (store, clock, _) = store();
        store
            .set_token_data(&TokenData {
                access_token: "a1".into(),
                refresh_token: "r1".into(),
                expires_in: 60,
            })
            .unwrap();

        clock.advance(Duration::from_secs(120));
        assert!(!store.synchronizer().is_authenticated());
        assert_eq!(store.get_token().as_deref(), Some("a1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
    }

    #[test]
    fn test_anonymous_token_is_last_resort() {
        let (store, clock, _) = store();
        assert_eq!(store.get_token(), None);

        store
            .set_anonymous_session(" anon ", 60, Some("session-1"))
            .unwrap();
        assert_eq!(store.get_token().as_deref(), Some("anon"));
        assert_eq!(store.anonymous_session_id().as_deref(), Some("session-1"));

        clock.advance(Duration::from_secs(60));
        assert_eq!(store.get_token(), None);

        store.clear_anonymous_session().unwrap();
        assert_eq!(store.anonymous_session_id(), None);
    }

    #[test]
    fn test_set_token_data_writes_unified_and_legacy() {
        let (store, _, local) = store();
        store
            .set_token_data(&TokenData {
                access_token: "a2".into(),
                refresh_token: "r2".into(),
                expires_in: 3600,
            })
            .unwrap();

        let expected_expiry = (1_700_000_000_000_i64 + 3_600_000).to_string();
        assert_eq!(local.get(AuthKeys::ACCESS_TOKEN).unwrap().as_deref(), Some("a2"));
        assert_eq!(local.get(AuthKeys::LEGACY_REFRESH_TOKEN).unwrap().as_deref(), Some("r2"));
        assert_eq!(local.get(AuthKeys::EXPIRES_AT).unwrap(), Some(expected_expiry.clone()));
        assert_eq!(local.get(AuthKeys::LEGACY_EXPIRES_AT).unwrap(), Some(expected_expiry));
        assert!(store.synchronizer().is_authenticated());
    }

    #[test]
    fn test_clear_legacy_keeps_unified_session() {
        let (store, clock, local) = store();
        store
            .set_token_data(&TokenData {
                access_token: "a1".into(),
                refresh_token: "r1".into(),
                expires_in: 60,
            })
            .unwrap();

        store.clear_legacy().unwrap();
        assert_eq!(local.get(AuthKeys::LEGACY_ACCESS_TOKEN).unwrap(), None);
        assert_eq!(store.get_token().as_deref(), Some("a1"));

        clock.advance(Duration::from_secs(60));
        assert_eq!(store.get_token(), None);
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
    }

    #[test]
    fn test_clear_auth_keeps_anonymous_session() {
        let (store, _, _) = store();
        store.set_anonymous_session("anon", 3600, None).unwrap();
        store
            .synchronizer()
            .set_auth_data(&AuthData::new("a1", "r1", 3600), CookieMode::Write);

        store.synchronizer().clear_auth();
        assert_eq!(store.get_token().as_deref(), Some("anon"));
    }
}
