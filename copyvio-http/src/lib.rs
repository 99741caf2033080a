//! Minimal HTTP transport with safe logging and OAuth 1.0 signing.
//!
//! - [`Transport`]: the capability search engines use to issue one GET
//! - [`HttpTransport`]: reqwest-backed implementation with timeout and
//!   default headers (`User-Agent`, `Accept-Encoding: gzip`)
//! - [`oauth`]: HMAC-SHA1 request signing
//!
//! The transport hands back status, headers, and raw body bytes for every
//! response, including non-2xx ones. It never retries and never decompresses;
//! callers decide what a status or a `Content-Encoding` means.
//!
//! Security: OAuth and other secret-looking query params are replaced with
//! `<redacted>` in every log line. Network errors are stripped of their URL
//! before they are logged or returned.
//!
//! Observability: `tracing` debug events for request start and response
//! headers, plus raw curl/response lines (target `http.raw`) when
//! `COPYVIO_HTTP_RAW=1`.

use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING, HeaderValue, USER_AGENT};
use reqwest::Client;
use thiserror::Error;
use url::Url;

pub mod oauth;

pub use reqwest::StatusCode;
pub use reqwest::header::HeaderMap;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "COPYVIO_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "oauth_signature"
            | "oauth_consumer_key"
            | "oauth_token"
            | "oauth_nonce"
            | "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "token"
            | "secret"
            | "client_secret"
    )
}

/// Host + path and the query pairs with secrets replaced, for logging.
fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    (host_path, redacted)
}

/// Best-effort curl command for repro/debug, with secret params redacted.
fn make_curl(url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), "-XGET".to_string()];
    for (name, val) in headers.iter() {
        let v = val.to_str().unwrap_or("");
        parts.push(format!(
            "-H '{}: {}'",
            name.as_str(),
            v.replace('\'', r"'\''")
        ));
    }
    let mut safe = url.clone();
    let (_, pairs) = redact_query(url);
    if pairs.is_empty() {
        safe.set_query(None);
    } else {
        safe.query_pairs_mut().clear().extend_pairs(pairs);
    }
    parts.push(format!("'{}'", safe.as_str()));
    parts.join(" ")
}

fn snip_body(body: &[u8], max: usize) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > max {
        let mut cut = max;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

fn next_request_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("r{:x}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
}

// ==============================
// Transport contract
// ==============================

/// Status, headers, and undecoded body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Header value as text; `None` if absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// True when the server declared `Content-Encoding: gzip`.
    pub fn is_gzip(&self) -> bool {
        self.headers
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"))
    }

    /// Body as lossy UTF-8, truncated for log lines.
    pub fn body_snippet(&self) -> String {
        snip_body(&self.body, SNIPPET_MAX)
    }
}

/// Executes a fully-formed GET URL.
///
/// Implementations decide their own timeout and concurrency story; callers
/// share them behind `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, url: &Url) -> Result<HttpResponse, HttpError>;
}

// ==============================
// reqwest transport
// ==============================

#[derive(Clone)]
pub struct HttpTransport {
    inner: Client,
    headers: HeaderMap,
    pub default_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport that sends `user_agent` and `Accept-Encoding: gzip`.
    ///
    /// ```no_run
    /// use copyvio_http::{HttpError, HttpTransport};
    /// use std::time::Duration;
    ///
    /// let transport = HttpTransport::new("copyvio-search/0.1")?;
    /// assert_eq!(transport.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(user_agent: &str) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| HttpError::Build(format!("invalid User-Agent: {e}")))?,
        );
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        Ok(Self {
            inner,
            headers,
            default_timeout: Duration::from_secs(15),
        })
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, url: &Url) -> Result<HttpResponse, HttpError> {
        let req_id = next_request_id();
        let (host_path, query) = redact_query(url);

        tracing::debug!(
            req_id=%req_id,
            method="GET",
            host_path=%host_path,
            query=?query,
            timeout_ms=self.default_timeout.as_millis() as u64,
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(url, &self.headers);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = Instant::now();
        let resp = self
            .inner
            .get(url.clone())
            .headers(self.headers.clone())
            .timeout(self.default_timeout)
            .send()
            .await
            .map_err(|err| {
                let message = err.without_url().to_string();
                tracing::warn!(req_id=%req_id, message=%message, "http.network_error.send");
                HttpError::Network(message)
            })?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(|err| {
            let message = err.without_url().to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.body");
            HttpError::Network(message)
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        let x_request_id = headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        let content_encoding = headers
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("identity");

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=body.len(),
            content_encoding,
            x_request_id,
            "http.response.headers"
        );

        if raw_enabled() {
            let truncated = body.len() > RAW_MAX_BODY;
            let text = snip_body(&body, RAW_MAX_BODY);
            tracing::info!(
                target: "http.raw",
                %req_id,
                %status,
                duration_ms=dur_ms,
                headers=?headers,
                body=%text,
                truncated
            );
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
