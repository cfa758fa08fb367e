//! Auth view a server renderer derives from request cookies alone

use crate::config::AuthKeys;
use cookie::Cookie;
use serde::Serialize;

/// Auth cookies parsed from a `Cookie` request header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerAuthSnapshot {
    pub access_token: Option<String>,
    pub user_type: Option<String>,
    pub expires_at: Option<i64>,
    pub user_name: Option<String>,
    pub subscription_status: Option<String>,
}

impl ServerAuthSnapshot {
    /// Parse a `Cookie` header; unknown and malformed pairs are skipped
    pub fn from_cookie_header(header: &str) -> Self {
        let mut snapshot = Self::default();

        for cookie in Cookie::split_parse_encoded(header).filter_map(Result::ok) {
            let value = cookie.value().trim();
            if value.is_empty() {
                continue;
            }
            let value = Some(value.to_string());

            match cookie.name() {
                AuthKeys::COOKIE_ACCESS_TOKEN => snapshot.access_token = value,
                AuthKeys::COOKIE_USER_TYPE => snapshot.user_type = value,
                AuthKeys::COOKIE_EXPIRES_AT => {
                    snapshot.expires_at = value.and_then(|raw| raw.parse().ok());
                }
                AuthKeys::COOKIE_USER_NAME => snapshot.user_name = value,
                AuthKeys::COOKIE_SUBSCRIPTION_STATUS => snapshot.subscription_status = value,
                _ => {}
            }
        }

        snapshot
    }

    /// Same expiry rule as the client: missing expiry or `now >= expires_at`
    /// is expired
    pub fn is_authenticated(&self, now_millis: i64) -> bool {
        self.access_token.is_some() && self.expires_at.is_some_and(|at| now_millis < at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_header() {
        let snapshot = ServerAuthSnapshot::from_cookie_header(
            "theme=dark; finranks.access-token=a1; finranks.user-type=premium; \
             finranks.expires-at=2000; finranks.user-name=Ada%20Lovelace; \
             finranks.subscription-status=active",
        );

        assert_eq!(snapshot.access_token.as_deref(), Some("a1"));
        assert_eq!(snapshot.user_type.as_deref(), Some("premium"));
        assert_eq!(snapshot.expires_at, Some(2000));
        assert_eq!(snapshot.user_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(snapshot.subscription_status.as_deref(), Some("active"));

        assert!(snapshot.is_authenticated(1999));
        assert!(!snapshot.is_authenticated(2000));
    }

    #[test]
    fn test_missing_cookies_are_unauthenticated() {
        let snapshot = ServerAuthSnapshot::from_cookie_header("finranks.user-type=; other=1");
        assert_eq!(snapshot, ServerAuthSnapshot::default());
        assert!(!snapshot.is_authenticated(0));

        let no_expiry = ServerAuthSnapshot::from_cookie_header("finranks.access-token=a1");
        assert!(!no_expiry.is_authenticated(0));
    }
}
