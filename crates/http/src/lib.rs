//! Finranks HTTP client
//!
//! A reqwest client that attaches the stored bearer token to every request
//! and silently refreshes the session on a 401.

pub mod client;
pub mod types;

pub use client::error::{ClientError, RefreshError};
pub use client::{ApiClient, ApiClientBuilder};
