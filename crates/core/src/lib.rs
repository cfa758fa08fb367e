//! Finranks client auth core
//!
//! Persisted auth state shared by the API client and the UI: a write-through
//! [`persistence::AuthPersistence`] over local storage and cookies, the
//! [`sync::AuthSynchronizer`] deriving [`AuthState`] from it, and the
//! [`token_store::TokenStore`] that picks the bearer token for requests.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod server;
pub mod storage;
pub mod sync;
pub mod token_store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthKeys, ClientConfig, Environment};
pub use error::{AuthError, Result};
pub use persistence::AuthPersistence;
pub use server::ServerAuthSnapshot;
pub use sync::AuthSynchronizer;
pub use token_store::{TokenStore, sanitize_token};
pub use types::{AuthChange, AuthChangeReason, AuthData, AuthState, CookieMode, Profile, TokenData};
