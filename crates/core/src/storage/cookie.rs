//! Auth cookies: scoping attributes, rendering and jars

use super::{KeyValueStore, MemoryStore};
use crate::clock::Clock;
use crate::config::Environment;
use crate::Result;
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::{Cookie, Expiration};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use cookie::SameSite;

/// Scoping attributes applied identically when setting and expiring a cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
    pub domain: Option<String>,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            same_site: SameSite::Lax,
            secure: false,
            domain: None,
        }
    }
}

impl CookieAttributes {
    /// Attributes for the given deployment; production adds `Secure` and
    /// scopes to `.<root_domain>`
    pub fn for_environment(environment: Environment, root_domain: Option<&str>) -> Self {
        match environment {
            Environment::Development => Self::default(),
            Environment::Production => Self {
                secure: true,
                domain: root_domain.map(|domain| format!(".{}", domain.trim_start_matches('.'))),
                ..Self::default()
            },
        }
    }

    /// Build a cookie that lives `max_age_secs` seconds
    pub fn build(&self, name: &str, value: &str, max_age_secs: i64) -> Cookie<'static> {
        let mut cookie = Cookie::build((name.to_string(), value.to_string()))
            .path(self.path.clone())
            .same_site(self.same_site)
            .secure(self.secure)
            .max_age(CookieDuration::seconds(max_age_secs.max(0)))
            .build();

        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }

    /// Build a cookie that expires `name` immediately
    pub fn expire(&self, name: &str) -> Cookie<'static> {
        let mut cookie = self.build(name, "", 0);
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    }
}

/// Cookie storage as seen by the client
pub trait CookieJar: Send + Sync {
    /// Current value of a live cookie
    fn get(&self, name: &str) -> Result<Option<String>>;

    /// Set or, when already expired, delete a cookie
    fn set(&self, cookie: &Cookie<'_>) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    expires_at: Option<i64>,
    header: String,
}

/// Cookie jar persisted in a [`KeyValueStore`] under `cookie:<name>`
#[derive(Clone)]
pub struct KeyValueCookieJar {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl KeyValueCookieJar {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), clock)
    }

    fn key(name: &str) -> String {
        format!("cookie:{name}")
    }

    /// `Set-Cookie` value last written for `name`, if it is still live
    pub fn header(&self, name: &str) -> Result<Option<String>> {
        Ok(self.live(name)?.map(|stored| stored.header))
    }

    fn live(&self, name: &str) -> Result<Option<StoredCookie>> {
        let Some(raw) = self.store.get(&Self::key(name))? else {
            return Ok(None);
        };
        let stored: StoredCookie = serde_json::from_str(&raw)?;
        let now = self.clock.now_millis();

        Ok(stored
            .expires_at
            .is_none_or(|at| now < at)
            .then_some(stored))
    }

    fn expiry_of(&self, cookie: &Cookie<'_>) -> Option<i64> {
        let from_max_age = cookie.max_age().map(|age| {
            self.clock
                .now_millis()
                .saturating_add(i64::try_from(age.whole_milliseconds()).unwrap_or(i64::MAX))
        });
        let from_expires = match cookie.expires() {
            Some(Expiration::DateTime(at)) => {
                i64::try_from(at.unix_timestamp_nanos() / 1_000_000).ok()
            }
            _ => None,
        };

        match (from_max_age, from_expires) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

impl CookieJar for KeyValueCookieJar {
    fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.live(name)?.map(|stored| stored.value))
    }

    fn set(&self, cookie: &Cookie<'_>) -> Result<()> {
        let key = Self::key(cookie.name());
        let expires_at = self.expiry_of(cookie);

        if expires_at.is_some_and(|at| at <= self.clock.now_millis()) {
            return self.store.remove(&key);
        }

        let stored = StoredCookie {
            value: cookie.value().to_string(),
            expires_at,
            header: cookie.encoded().to_string(),
        };
        self.store.set(&key, &serde_json::to_string(&stored)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_production_attributes() {
        let attrs = CookieAttributes::for_environment(Environment::Production, Some("finranks.com"));
        assert!(attrs.secure);
        assert_eq!(attrs.domain.as_deref(), Some(".finranks.com"));
        assert_eq!(attrs.same_site, SameSite::Lax);

        let dev = CookieAttributes::for_environment(Environment::Development, Some("finranks.com"));
        assert!(!dev.secure);
        assert_eq!(dev.domain, None);
    }

    #[test]
    fn test_rendered_header_carries_scoping() {
        let attrs = CookieAttributes::for_environment(Environment::Production, Some("finranks.com"));
        let header = attrs
            .build("finranks.user-name", "Ada Lovelace", 3600)
            .encoded()
            .to_string();

        assert!(header.starts_with("finranks.user-name=Ada%20Lovelace"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Secure"));
        assert!(header.contains("Domain=finranks.com") || header.contains("Domain=.finranks.com"));
        assert!(header.contains("Max-Age=3600"));
    }

    #[test]
    fn test_jar_honours_max_age() {
        let clock = Arc::new(ManualClock::new(0));
        let jar = KeyValueCookieJar::in_memory(clock.clone());
        let attrs = CookieAttributes::default();

        jar.set(&attrs.build("finranks.access-token", "a1", 60)).unwrap();
        assert_eq!(jar.get("finranks.access-token").unwrap().as_deref(), Some("a1"));

        clock.advance(std::time::Duration::from_secs(60));
        assert_eq!(jar.get("finranks.access-token").unwrap(), None);
    }

    #[test]
    fn test_expired_cookie_deletes_entry() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let jar = KeyValueCookieJar::in_memory(clock);
        let attrs = CookieAttributes::default();

        jar.set(&attrs.build("finranks.user-type", "premium", 3600)).unwrap();
        jar.set(&attrs.expire("finranks.user-type")).unwrap();

        assert_eq!(jar.get("finranks.user-type").unwrap(), None);
        assert_eq!(jar.header("finranks.user-type").unwrap(), None);
    }
}
