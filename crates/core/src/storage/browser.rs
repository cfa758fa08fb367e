//! Browser backends: `window.localStorage` and `document.cookie`
//!
//! Handles are looked up per call so the adapters stay `Send + Sync`.

use super::{CookieJar, KeyValueStore};
use crate::{AuthError, Result};
use cookie::Cookie;
use wasm_bindgen::JsCast;
use web_sys::{HtmlDocument, Storage};

fn js_error(context: &str, err: &wasm_bindgen::JsValue) -> AuthError {
    AuthError::storage(format!("{context}: {err:?}"))
}

/// `window.localStorage`
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserLocalStorage;

impl BrowserLocalStorage {
    /// True when a window with local storage is reachable
    pub fn is_available() -> bool {
        Self::storage().is_ok()
    }

    fn storage() -> Result<Storage> {
        web_sys::window()
            .and_then(|window| window.local_storage().ok().flatten())
            .ok_or(AuthError::StorageUnavailable)
    }
}

impl KeyValueStore for BrowserLocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Self::storage()?
            .get_item(key)
            .map_err(|err| js_error("localStorage.getItem", &err))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|err| js_error("localStorage.setItem", &err))
    }

    fn remove(&self, key: &str) -> Result<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|err| js_error("localStorage.removeItem", &err))
    }
}

/// `document.cookie`
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentCookieJar;

impl DocumentCookieJar {
    fn document() -> Result<HtmlDocument> {
        web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.dyn_into::<HtmlDocument>().ok())
            .ok_or(AuthError::StorageUnavailable)
    }
}

impl CookieJar for DocumentCookieJar {
    fn get(&self, name: &str) -> Result<Option<String>> {
        let raw = Self::document()?
            .cookie()
            .map_err(|err| js_error("document.cookie", &err))?;

        Ok(Cookie::split_parse_encoded(raw)
            .filter_map(std::result::Result::ok)
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string()))
    }

    fn set(&self, cookie: &Cookie<'_>) -> Result<()> {
        Self::document()?
            .set_cookie(&cookie.encoded().to_string())
            .map_err(|err| js_error("document.cookie", &err))
    }
}
