//! Common types and utilities shared across copyvio crates.
//!
//! This crate defines the settings shapes handed from configuration to the
//! search and transport layers, plus observability helpers. It stays
//! dependency-light so every crate in the workspace can depend on it.
//!
//! # Overview
//!
//! - [`Credentials`]: consumer key/secret pair for a search provider
//! - [`SearchSettings`]: which engine to use and with what credentials
//! - [`TransportSettings`]: user agent and timeout for the HTTP transport
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use copyvio_common::{Credentials, TransportSettings};
//!
//! let creds = Credentials::new("consumer-key", "consumer-secret");
//! assert_eq!(creds.key, "consumer-key");
//! assert!(!format!("{creds:?}").contains("consumer-secret"));
//!
//! let transport = TransportSettings::default();
//! assert_eq!(transport.timeout_secs, 15);
//! ```
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub mod observability;

/// Default `User-Agent` sent by the HTTP transport.
pub const DEFAULT_USER_AGENT: &str = concat!("copyvio-search/", env!("CARGO_PKG_VERSION"));

/// Consumer key/secret pair used to sign provider requests.
///
/// The secret is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Which search engine to query and how to authenticate against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Engine display name, e.g. `"Yahoo! BOSS"`.
    pub engine: String,
    pub credentials: Credentials,
}

/// Knobs for the outbound HTTP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout in seconds. Accepts a number or numeric text so
    /// environment overrides work.
    #[serde(default = "default_timeout_secs", deserialize_with = "secs_from_int_or_text")]
    pub timeout_secs: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrText {
    Int(u64),
    Text(String),
}

fn secs_from_int_or_text<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match IntOrText::deserialize(deserializer)? {
        IntOrText::Int(n) => Ok(n),
        IntOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
