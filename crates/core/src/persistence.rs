//! Write-through persistence over the local store and the cookie jar

use crate::config::AuthKeys;
use crate::storage::{CookieAttributes, CookieJar, KeyValueStore};
use crate::types::{CookieMode, Profile};
use crate::{AuthError, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything written for one authenticated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry in epoch milliseconds
    pub expires_at: i64,
    /// Lifetime in seconds, used as the cookie `Max-Age`
    pub expires_in: i64,
    /// Profile to store; `None` leaves any stored profile untouched
    pub profile: Option<Profile>,
}

/// Single entry point for every auth write and read
///
/// Without a local store (`detached`) reads return nothing and writes fail
/// with [`AuthError::StorageUnavailable`].
#[derive(Clone)]
pub struct AuthPersistence {
    local: Option<Arc<dyn KeyValueStore>>,
    cookies: Option<Arc<dyn CookieJar>>,
    attributes: CookieAttributes,
}

impl AuthPersistence {
    pub fn new(
        local: Arc<dyn KeyValueStore>,
        cookies: Option<Arc<dyn CookieJar>>,
        attributes: CookieAttributes,
    ) -> Self {
        Self {
            local: Some(local),
            cookies,
            attributes,
        }
    }

    /// Persistence for a context with no storage at all
    pub fn detached() -> Self {
        Self {
            local: None,
            cookies: None,
            attributes: CookieAttributes::default(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.local.is_some()
    }

    pub fn cookie_attributes(&self) -> &CookieAttributes {
        &self.attributes
    }

    fn local(&self) -> Result<&Arc<dyn KeyValueStore>> {
        self.local.as_ref().ok_or(AuthError::StorageUnavailable)
    }

    /// Read a local key, treating storage failures and empty values as absent
    pub fn read(&self, key: &str) -> Option<String> {
        let local = self.local.as_ref()?;
        match local.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!(key, error = %err, "Failed to read auth key");
                None
            }
        }
    }

    /// Stored profile; malformed JSON resolves to `None`
    pub fn read_profile(&self) -> Option<Profile> {
        let raw = self.read(AuthKeys::PROFILE)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(err) => {
                debug!(error = %err, "Ignoring malformed stored profile");
                None
            }
        }
    }

    /// Live cookie value
    pub fn read_cookie(&self, name: &str) -> Option<String> {
        let jar = self.cookies.as_ref()?;
        match jar.get(name) {
            Ok(value) => value,
            Err(err) => {
                warn!(cookie = name, error = %err, "Failed to read cookie");
                None
            }
        }
    }

    /// Write raw local entries in order
    ///
    /// # Errors
    ///
    /// Fails on the first entry the store rejects
    pub fn write_local(&self, entries: &[(&str, &str)]) -> Result<()> {
        let local = self.local()?;
        for (key, value) in entries {
            local.set(key, value)?;
        }
        Ok(())
    }

    /// Remove raw local keys, attempting every key before reporting
    ///
    /// # Errors
    ///
    /// Returns the first failure after all removals were attempted
    pub fn remove_local(&self, keys: &[&str]) -> Result<()> {
        let local = self.local()?;
        let mut first_error = None;
        for key in keys {
            if let Err(err) = local.remove(key) {
                warn!(key, error = %err, "Failed to remove auth key");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Persist a session to the local store and, unless the server manages
    /// them, the cookies
    ///
    /// # Errors
    ///
    /// Returns an error if either backend rejects a write
    pub fn store_session(&self, record: &SessionRecord, mode: CookieMode) -> Result<()> {
        let expires_at = record.expires_at.to_string();
        self.write_local(&[
            (AuthKeys::ACCESS_TOKEN, record.access_token.as_str()),
            (AuthKeys::REFRESH_TOKEN, record.refresh_token.as_str()),
            (AuthKeys::EXPIRES_AT, expires_at.as_str()),
        ])?;

        if let Some(profile) = record.profile.as_ref().filter(|p| !p.is_empty()) {
            let json = serde_json::to_string(profile)?;
            self.write_local(&[(AuthKeys::PROFILE, json.as_str())])?;
        }

        match (mode, &self.cookies) {
            (CookieMode::Write, Some(jar)) => {
                let profile = record
                    .profile
                    .clone()
                    .filter(|p| !p.is_empty())
                    .or_else(|| self.read_profile())
                    .unwrap_or_default();
                self.store_cookies(jar.as_ref(), record, &profile, &expires_at)
            }
            (CookieMode::ServerManaged, _) => {
                debug!("Skipping cookie mirror, server issued cookies");
                Ok(())
            }
            (CookieMode::Write, None) => Ok(()),
        }
    }

    fn store_cookies(
        &self,
        jar: &dyn CookieJar,
        record: &SessionRecord,
        profile: &Profile,
        expires_at: &str,
    ) -> Result<()> {
        let max_age = record.expires_in;
        let attrs = &self.attributes;

        jar.set(&attrs.build(AuthKeys::COOKIE_ACCESS_TOKEN, &record.access_token, max_age))?;
        jar.set(&attrs.build(
            AuthKeys::COOKIE_USER_TYPE,
            profile.user_type.as_deref().unwrap_or_default(),
            max_age,
        ))?;
        jar.set(&attrs.build(AuthKeys::COOKIE_EXPIRES_AT, expires_at, max_age))?;

        if let Some(name) = profile.name.as_deref().filter(|n| !n.is_empty()) {
            jar.set(&attrs.build(AuthKeys::COOKIE_USER_NAME, name, max_age))?;
        }
        if let Some(status) = profile.subscription_status.as_deref().filter(|s| !s.is_empty()) {
            jar.set(&attrs.build(AuthKeys::COOKIE_SUBSCRIPTION_STATUS, status, max_age))?;
        }
        Ok(())
    }

    /// Remove every session key and expire every auth cookie
    ///
    /// # Errors
    ///
    /// Returns the first failure after every key and cookie was attempted
    pub fn erase_session(&self) -> Result<()> {
        let local_result = self.remove_local(&AuthKeys::SESSION_KEYS);

        let mut cookie_error = None;
        if let Some(jar) = &self.cookies {
            for name in AuthKeys::COOKIES {
                if let Err(err) = jar.set(&self.attributes.expire(name)) {
                    warn!(cookie = name, error = %err, "Failed to expire cookie");
                    cookie_error.get_or_insert(err);
                }
            }
        }

        local_result?;
        cookie_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for AuthPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthPersistence")
            .field("local", &self.local.is_some())
            .field("cookies", &self.cookies.is_some())
            .field("attributes", &self.attributes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{KeyValueCookieJar, MemoryStore};

    fn persistence() -> (AuthPersistence, Arc<MemoryStore>, Arc<KeyValueCookieJar>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let local = Arc::new(MemoryStore::new());
        let jar = Arc::new(KeyValueCookieJar::in_memory(clock));
        let cookies: Arc<dyn CookieJar> = jar.clone();
        let persistence =
            AuthPersistence::new(local.clone(), Some(cookies), CookieAttributes::default());
        (persistence, local, jar)
    }

    fn record(profile: Option<Profile>) -> SessionRecord {
        SessionRecord {
            access_token: "a1".into(),
            refresh_token: "r1".into(),
            expires_at: 3_601_000,
            expires_in: 3600,
            profile,
        }
    }

    #[test]
    fn test_store_session_writes_both_backends() {
        let (persistence, local, jar) = persistence();
        let profile = Profile {
            name: Some("Ada".into()),
            user_type: Some("premium".into()),
            ..Profile::default()
        };

        persistence
            .store_session(&record(Some(profile)), CookieMode::Write)
            .unwrap();

        assert_eq!(local.get(AuthKeys::ACCESS_TOKEN).unwrap().as_deref(), Some("a1"));
        assert_eq!(local.get(AuthKeys::EXPIRES_AT).unwrap().as_deref(), Some("3601000"));
        assert_eq!(jar.get(AuthKeys::COOKIE_ACCESS_TOKEN).unwrap().as_deref(), Some("a1"));
        assert_eq!(jar.get(AuthKeys::COOKIE_USER_TYPE).unwrap().as_deref(), Some("premium"));
        assert_eq!(jar.get(AuthKeys::COOKIE_USER_NAME).unwrap().as_deref(), Some("Ada"));
        assert_eq!(jar.get(AuthKeys::COOKIE_SUBSCRIPTION_STATUS).unwrap(), None);
    }

    #[test]
    fn test_empty_profile_is_not_written() {
        let (persistence, local, _) = persistence();
        persistence
            .store_session(&record(Some(Profile::default())), CookieMode::Write)
            .unwrap();
        assert_eq!(local.get(AuthKeys::PROFILE).unwrap(), None);
    }

    #[test]
    fn test_server_managed_skips_cookies() {
        let (persistence, local, jar) = persistence();
        persistence
            .store_session(&record(None), CookieMode::ServerManaged)
            .unwrap();

        assert_eq!(local.get(AuthKeys::ACCESS_TOKEN).unwrap().as_deref(), Some("a1"));
        assert_eq!(jar.get(AuthKeys::COOKIE_ACCESS_TOKEN).unwrap(), None);
    }

    #[test]
    fn test_cookie_mirror_falls_back_to_stored_profile() {
        let (persistence, _, jar) = persistence();
        let profile = Profile {
            user_type: Some("premium".into()),
            ..Profile::default()
        };
        persistence
            .store_session(&record(Some(profile)), CookieMode::Write)
            .unwrap();

        // A refresh carries no profile
        persistence.store_session(&record(None), CookieMode::Write).unwrap();
        assert_eq!(jar.get(AuthKeys::COOKIE_USER_TYPE).unwrap().as_deref(), Some("premium"));
    }

    #[test]
    fn test_erase_session_clears_everything() {
        let (persistence, local, jar) = persistence();
        persistence.store_session(&record(None), CookieMode::Write).unwrap();
        persistence
            .write_local(&[(AuthKeys::LEGACY_ACCESS_TOKEN, "a1")])
            .unwrap();

        persistence.erase_session().unwrap();

        assert!(local.is_empty());
        for name in AuthKeys::COOKIES {
            assert_eq!(jar.get(name).unwrap(), None);
        }
    }

    #[test]
    fn test_malformed_profile_reads_as_none() {
        let (persistence, local, _) = persistence();
        local.set(AuthKeys::PROFILE, "{not json").unwrap();
        assert_eq!(persistence.read_profile(), None);
    }

    #[test]
    fn test_detached_reads_nothing_and_rejects_writes() {
        let persistence = AuthPersistence::detached();
        assert!(!persistence.is_available());
        assert_eq!(persistence.read(AuthKeys::ACCESS_TOKEN), None);
        assert!(matches!(
            persistence.store_session(&record(None), CookieMode::Write),
            Err(AuthError::StorageUnavailable)
        ));
    }
}
