//! Yahoo! BOSS web search over OAuth-signed GET requests.
//!
//! The query is sent as an exact phrase. Responses may arrive gzip-encoded;
//! that is honoured only when `Content-Encoding: gzip` says so. A response
//! without the `bossresponse.web.results` path is treated as "no results".

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use copyvio_common::Credentials;
use copyvio_http::oauth::{self, Consumer, OAuthRequest};
use copyvio_http::{HttpError, HttpResponse, Transport};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;
use url::{Url, form_urlencoded};

use crate::traits::{SearchEngine, SearchEngineKind, SearchError};

pub const BOSS_ENDPOINT: &str = "http://yboss.yahooapis.com/ysearch/web";

const ENGINE: &str = "Yahoo! BOSS";
const SNIPPET_CHARS: usize = 500;

/// Wrap `query` in double quotes and form-encode its UTF-8 bytes.
///
/// ```
/// use copyvio_search::boss::quote_phrase;
///
/// assert_eq!(quote_phrase("café au lait"), "%22caf%C3%A9+au+lait%22");
/// ```
pub fn quote_phrase(query: &str) -> String {
    let phrase = format!("\"{query}\"");
    form_urlencoded::byte_serialize(phrase.as_bytes()).collect()
}

#[derive(Debug, Deserialize)]
struct BossResult {
    url: String,
}

#[derive(Clone)]
pub struct YahooBossSearchEngine {
    credentials: Arc<Credentials>,
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl YahooBossSearchEngine {
    pub fn new(credentials: Arc<Credentials>, transport: Arc<dyn Transport>) -> Self {
        Self {
            credentials,
            transport,
            endpoint: BOSS_ENDPOINT.to_string(),
        }
    }

    /// Point the engine at a different endpoint (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build and sign the request URL for `query` (two-legged HMAC-SHA1).
    fn signed_url(&self, query: &str, nonce: String, timestamp: String) -> Result<Url, SearchError> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| HttpError::Url(e.to_string()))?;
        let consumer = Consumer::new(&self.credentials.key, &self.credentials.secret);

        let mut req = OAuthRequest::new(
            "GET",
            &endpoint,
            [
                ("oauth_version", oauth::OAUTH_VERSION.to_string()),
                ("oauth_nonce", nonce),
                ("oauth_timestamp", timestamp),
                ("oauth_consumer_key", consumer.key.clone()),
                ("q", quote_phrase(query)),
                ("type", "html,text".to_string()),
                ("format", "json".to_string()),
            ],
        );
        req.sign_hmac_sha1(&consumer, None)?;
        Ok(req.to_url())
    }
}

impl fmt::Debug for YahooBossSearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YahooBossSearchEngine")
            .field("credentials", &self.credentials)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

fn decode_body(resp: &HttpResponse) -> Result<Vec<u8>, SearchError> {
    if !resp.is_gzip() {
        return Ok(resp.body.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(&resp.body[..])
        .read_to_end(&mut out)
        .map_err(SearchError::Decompress)?;
    Ok(out)
}

fn extract_urls(payload: &Value) -> Result<Vec<String>, SearchError> {
    let results = payload
        .get("bossresponse")
        .and_then(|r| r.get("web"))
        .and_then(|w| w.get("results"));
    let Some(results) = results else {
        return Ok(Vec::new());
    };

    let entries = Vec::<BossResult>::deserialize(results).map_err(|e| SearchError::Decode {
        engine: ENGINE,
        reason: format!("malformed results list: {e}"),
    })?;
    Ok(entries.into_iter().map(|r| r.url).collect())
}

#[async_trait]
impl SearchEngine for YahooBossSearchEngine {
    fn kind(&self) -> SearchEngineKind {
        SearchEngineKind::YahooBoss
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let url = self.signed_url(query, oauth::generate_nonce(), oauth::make_timestamp())?;
        tracing::debug!(
            engine = ENGINE,
            query_chars = query.chars().count(),
            "search.request"
        );

        let resp = self.transport.execute(&url).await?;
        let body = decode_body(&resp)?;
        let status = resp.status.as_u16();
        tracing::debug!(
            engine = ENGINE,
            status,
            gzip = resp.is_gzip(),
            body_len = body.len(),
            "search.response"
        );

        if status != 200 {
            let text = String::from_utf8_lossy(&body).into_owned();
            let snippet: String = text.chars().take(SNIPPET_CHARS).collect();
            tracing::warn!(engine = ENGINE, status, body_snippet = %snippet, "search.error.status");
            return Err(SearchError::Status {
                engine: ENGINE,
                status,
                body: text,
            });
        }

        let payload: Value = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(engine = ENGINE, serde_err = %e, "search.error.decode");
            SearchError::Decode {
                engine: ENGINE,
                reason: e.to_string(),
            }
        })?;

        let urls = extract_urls(&payload)?;
        tracing::debug!(engine = ENGINE, count = urls.len(), "search.results");
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copyvio_http::{HeaderMap, StatusCode};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use std::sync::Mutex;

    /// Replays one canned response and records every URL it was asked for.
    struct FakeTransport {
        reply: Result<HttpResponse, String>,
        seen: Mutex<Vec<Url>>,
    }

    impl FakeTransport {
        fn replying(status: u16, headers: &[(&'static str, &'static str)], body: Vec<u8>) -> Arc<Self> {
            let mut map = HeaderMap::new();
            for (k, v) in headers {
                map.insert(*k, v.parse().unwrap());
            }
            Arc::new(Self {
                reply: Ok(HttpResponse::new(
                    StatusCode::from_u16(status).unwrap(),
                    map,
                    body,
                )),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn json(status: u16, body: &str) -> Arc<Self> {
            Self::replying(status, &[], body.as_bytes().to_vec())
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Url> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn execute(&self, url: &Url) -> Result<HttpResponse, HttpError> {
            self.seen.lock().unwrap().push(url.clone());
            self.reply.clone().map_err(HttpError::Network)
        }
    }

    fn engine(transport: Arc<FakeTransport>) -> YahooBossSearchEngine {
        YahooBossSearchEngine::new(Arc::new(Credentials::new("ck", "cs")), transport)
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    fn query_param(url: &Url, name: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    const TWO_RESULTS: &str =
        r#"{"bossresponse":{"web":{"results":[{"url":"http://a.example"},{"url":"http://b.example"}]}}}"#;

    #[tokio::test]
    async fn returns_urls_in_provider_order() {
        let transport = FakeTransport::json(200, TWO_RESULTS);
        let urls = engine(transport.clone()).search("some text").await.unwrap();
        assert_eq!(urls, vec!["http://a.example", "http://b.example"]);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn missing_results_key_is_empty_success() {
        let urls = engine(FakeTransport::json(200, r#"{"bossresponse":{"web":{}}}"#))
            .search("x")
            .await
            .unwrap();
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn missing_outer_sections_are_empty_success() {
        for body in [r#"{}"#, r#"{"bossresponse":{}}"#, r#"{"bossresponse":{"news":{}}}"#] {
            let urls = engine(FakeTransport::json(200, body)).search("x").await.unwrap();
            assert!(urls.is_empty(), "body {body} should give no results");
        }
    }

    #[tokio::test]
    async fn non_200_is_a_query_error_with_code_and_body() {
        let err = engine(FakeTransport::json(500, "server error"))
            .search("x")
            .await
            .unwrap_err();
        assert!(err.is_query_error());
        let msg = err.to_string();
        assert!(msg.contains("500"), "{msg}");
        assert!(msg.contains("server error"), "{msg}");
    }

    #[tokio::test]
    async fn gzip_body_is_decompressed_when_signaled() {
        let transport =
            FakeTransport::replying(200, &[("content-encoding", "gzip")], gzip(TWO_RESULTS.as_bytes()));
        let urls = engine(transport).search("x").await.unwrap();
        assert_eq!(urls, vec!["http://a.example", "http://b.example"]);
    }

    #[tokio::test]
    async fn error_body_is_reported_after_decompression() {
        let transport =
            FakeTransport::replying(503, &[("content-encoding", "gzip")], gzip(b"try later"));
        let err = engine(transport).search("x").await.unwrap_err();
        match err {
            SearchError::Status { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "try later");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn gzip_is_never_attempted_without_the_header() {
        let err = engine(FakeTransport::replying(200, &[], gzip(TWO_RESULTS.as_bytes())))
            .search("x")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Decode { .. }));
    }

    #[tokio::test]
    async fn corrupt_gzip_is_not_a_query_error() {
        let transport =
            FakeTransport::replying(200, &[("content-encoding", "gzip")], b"not gzip".to_vec());
        let err = engine(transport).search("x").await.unwrap_err();
        assert!(matches!(err, SearchError::Decompress(_)));
        assert!(!err.is_query_error());
    }

    #[tokio::test]
    async fn invalid_json_is_a_decode_error() {
        let err = engine(FakeTransport::json(200, "not valid json"))
            .search("x")
            .await
            .unwrap_err();
        assert!(err.is_query_error());
        assert!(err.to_string().contains("JSON could not be decoded"));
    }

    #[tokio::test]
    async fn result_without_url_is_a_decode_error() {
        let body = r#"{"bossresponse":{"web":{"results":[{"title":"no link"}]}}}"#;
        let err = engine(FakeTransport::json(200, body))
            .search("x")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Decode { .. }));
    }

    #[tokio::test]
    async fn empty_query_never_reaches_transport() {
        let transport = FakeTransport::json(200, TWO_RESULTS);
        let err = engine(transport.clone()).search("").await.unwrap_err();
        assert!(matches!(err, SearchError::EmptyQuery));
        assert!(err.is_query_error());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn whitespace_query_is_sent_untrimmed() {
        let transport = FakeTransport::json(200, TWO_RESULTS);
        let urls = engine(transport.clone()).search("   ").await.unwrap();
        assert_eq!(urls.len(), 2);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(query_param(&calls[0], "q").as_deref(), Some("%22+++%22"));
    }

    #[tokio::test]
    async fn transport_faults_pass_through() {
        let err = engine(FakeTransport::failing("connection refused"))
            .search("x")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Transport(HttpError::Network(ref m)) if m == "connection refused"));
        assert!(!err.is_query_error());
    }

    #[tokio::test]
    async fn request_carries_signed_params() {
        let transport = FakeTransport::json(200, TWO_RESULTS);
        let eng = engine(transport.clone());
        eng.search("café").await.unwrap();
        eng.search("café").await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        let url = &calls[0];
        assert_eq!(url.host_str(), Some("yboss.yahooapis.com"));
        assert_eq!(url.path(), "/ysearch/web");
        assert_eq!(query_param(url, "oauth_version").as_deref(), Some("1.0"));
        assert_eq!(query_param(url, "oauth_consumer_key").as_deref(), Some("ck"));
        assert_eq!(
            query_param(url, "oauth_signature_method").as_deref(),
            Some("HMAC-SHA1")
        );
        assert!(query_param(url, "oauth_signature").is_some());
        assert!(query_param(url, "oauth_timestamp").is_some());
        assert_eq!(query_param(url, "type").as_deref(), Some("html,text"));
        assert_eq!(query_param(url, "format").as_deref(), Some("json"));

        let q = query_param(url, "q").unwrap();
        let decoded: String = form_urlencoded::parse(format!("q={q}").as_bytes())
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(decoded, "\"café\"");

        assert_ne!(
            query_param(&calls[0], "oauth_nonce"),
            query_param(&calls[1], "oauth_nonce")
        );
    }

    #[test]
    fn signature_is_deterministic_for_fixed_nonce_and_time() {
        let eng = engine(FakeTransport::json(200, "{}"));
        let url = eng
            .signed_url("café", "n0nce".into(), "1700000000".into())
            .unwrap();
        assert_eq!(
            query_param(&url, "oauth_signature").as_deref(),
            Some("QwuGKYHKmLG1aYbOkywcDzMiyI4=")
        );
    }

    #[test]
    fn quoting_round_trips_for_varied_text() {
        for query in ["plain", "two words", "café", "100% \"real\" & more", "日本語のテキスト"] {
            let encoded = quote_phrase(query);
            assert!(encoded.is_ascii());
            let decoded: String = form_urlencoded::parse(format!("q={encoded}").as_bytes())
                .map(|(_, v)| v.into_owned())
                .collect();
            assert_eq!(decoded, format!("\"{query}\""));
        }
    }

    #[test]
    fn bad_endpoint_is_a_transport_url_error() {
        let eng = engine(FakeTransport::json(200, "{}")).with_endpoint("not a url");
        let err = eng.signed_url("x", "n".into(), "1".into()).unwrap_err();
        assert!(matches!(err, SearchError::Transport(HttpError::Url(_))));
    }

    #[test]
    fn debug_hides_secret() {
        let eng = engine(FakeTransport::json(200, "{}"));
        let rendered = format!("{eng:?}");
        assert!(rendered.contains("ck"));
        assert!(!rendered.contains("\"cs\""));
    }
}
