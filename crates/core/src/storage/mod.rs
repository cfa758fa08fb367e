//! Key-value and cookie backends the auth state is persisted to
//!
//! Two adapters sit behind [`crate::persistence::AuthPersistence`]: a
//! [`KeyValueStore`] standing in for browser local storage and a
//! [`CookieJar`] for the cookies server-rendered pages read.

#[cfg(target_arch = "wasm32")]
pub mod browser;
pub mod cookie;
pub mod file;

pub use cookie::{CookieAttributes, CookieJar, KeyValueCookieJar, SameSite};
pub use file::FileStore;

use crate::Result;
use std::collections::HashMap;
use std::sync::RwLock;

/// String key-value storage with local-storage semantics
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| crate::AuthError::storage("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| crate::AuthError::storage("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| crate::AuthError::storage("memory store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("access_token", "abc").unwrap();
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("abc"));
        assert_eq!(store.len(), 1);

        store.remove("access_token").unwrap();
        assert_eq!(store.get("access_token").unwrap(), None);
        // Removing a missing key is not an error
        store.remove("access_token").unwrap();
    }
}
