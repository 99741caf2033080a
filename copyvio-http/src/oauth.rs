//! OAuth 1.0 request signing (HMAC-SHA1).
//!
//! Supports both two-legged (consumer only) and three-legged (consumer +
//! token) signing. The signed request renders to a plain GET URL carrying
//! every `oauth_*` parameter in its query string.
//!
//! ```
//! use copyvio_http::oauth::{Consumer, OAuthRequest};
//! use url::Url;
//!
//! let endpoint = Url::parse("https://api.example.com/search").unwrap();
//! let consumer = Consumer::new("key", "secret");
//! let mut req = OAuthRequest::new("GET", &endpoint, [("q", "rust")]);
//! req.sign_hmac_sha1(&consumer, None).unwrap();
//!
//! let url = req.to_url();
//! assert!(url.query().unwrap().contains("oauth_signature="));
//! ```

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha1::Sha1;
use url::Url;

use crate::HttpError;

pub const OAUTH_VERSION: &str = "1.0";
pub const SIGNATURE_METHOD_HMAC_SHA1: &str = "HMAC-SHA1";

const NONCE_LEN: usize = 16;

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

type HmacSha1 = Hmac<Sha1>;

/// Percent-encode a string the way OAuth 1.0 requires (RFC 3986, UTF-8).
pub fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, RFC3986).to_string()
}

/// Fresh random token for `oauth_nonce`.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// Current Unix time in seconds, as sent in `oauth_timestamp`.
pub fn make_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

#[derive(Clone)]
pub struct Consumer {
    pub key: String,
    pub secret: String,
}

impl Consumer {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// User access token for three-legged signing.
#[derive(Clone)]
pub struct Token {
    pub key: String,
    pub secret: String,
}

impl Token {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A request under construction: method, base URL, and its parameters.
#[derive(Debug, Clone)]
pub struct OAuthRequest {
    method: String,
    url: Url,
    params: Vec<(String, String)>,
}

impl OAuthRequest {
    /// Query pairs already present on `url` are folded into the parameter
    /// list so they take part in the signature.
    pub fn new<I, K, V>(method: &str, url: &Url, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut base = url.clone();
        let mut all: Vec<(String, String)> = base
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        all.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        base.set_query(None);
        base.set_fragment(None);

        Self {
            method: method.to_ascii_uppercase(),
            url: base,
            params: all,
        }
    }

    /// First value for `name`, if any.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn set_param(&mut self, name: &str, value: String) {
        self.params.retain(|(k, _)| k != name);
        self.params.push((name.to_string(), value));
    }

    /// Scheme and host lowercased, default port dropped, no query.
    pub fn normalized_url(&self) -> String {
        let scheme = self.url.scheme();
        let host = self.url.host_str().unwrap_or_default();
        let path = self.url.path();
        match self.url.port() {
            Some(port) => format!("{scheme}://{host}:{port}{path}"),
            None => format!("{scheme}://{host}{path}"),
        }
    }

    /// Sorted, encoded `k=v` pairs joined by `&`; `oauth_signature` excluded.
    pub fn normalized_params(&self) -> String {
        let mut encoded: Vec<(String, String)> = self
            .params
            .iter()
            .filter(|(k, _)| k != "oauth_signature")
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        encoded.sort();
        encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn signature_base_string(&self) -> String {
        format!(
            "{}&{}&{}",
            encode(&self.method),
            encode(&self.normalized_url()),
            encode(&self.normalized_params())
        )
    }

    /// Sign with HMAC-SHA1. Pass `None` for two-legged (consumer only) signing.
    pub fn sign_hmac_sha1(
        &mut self,
        consumer: &Consumer,
        token: Option<&Token>,
    ) -> Result<(), HttpError> {
        self.set_param("oauth_signature_method", SIGNATURE_METHOD_HMAC_SHA1.into());
        if let Some(token) = token {
            self.set_param("oauth_token", token.key.clone());
        }

        let key = format!(
            "{}&{}",
            encode(&consumer.secret),
            token.map(|t| encode(&t.secret)).unwrap_or_default()
        );
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| HttpError::Build(format!("hmac key rejected: {e}")))?;
        mac.update(self.signature_base_string().as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        self.set_param("oauth_signature", signature);
        Ok(())
    }

    /// Full URL with every parameter encoded into the query string.
    pub fn to_url(&self) -> Url {
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let mut url = self.url.clone();
        url.set_query(Some(&query));
        url
    }
}
