use std::time::Duration;

use copyvio_http::{HttpError, HttpTransport, Transport};
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn url_for(server: &MockServer, rest: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), rest)).unwrap()
}

#[tokio::test]
async fn sends_default_headers_and_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ysearch/web"))
        .and(query_param("format", "json"))
        .and(header("user-agent", "copyvio-test/1.0"))
        .and(header("accept-encoding", "gzip"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "abc")
                .set_body_string("{\"ok\":true}"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new("copyvio-test/1.0").unwrap();
    let resp = transport
        .execute(&url_for(&server, "/ysearch/web?format=json"))
        .await
        .unwrap();

    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(resp.header("x-request-id"), Some("abc"));
    assert_eq!(&resp.body[..], b"{\"ok\":true}");
}

#[tokio::test]
async fn error_statuses_are_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new("copyvio-test/1.0").unwrap();
    let resp = transport.execute(&url_for(&server, "/x")).await.unwrap();

    assert_eq!(resp.status.as_u16(), 500);
    assert_eq!(resp.body_snippet(), "server error");
}

#[tokio::test]
async fn gzip_bodies_are_left_compressed() {
    let server = MockServer::start().await;
    let raw = vec![0x1f, 0x8b, 0x08, 0x00, 0xde, 0xad];
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(raw.clone()),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new("copyvio-test/1.0").unwrap();
    let resp = transport.execute(&url_for(&server, "/gz")).await.unwrap();

    assert!(resp.is_gzip());
    assert_eq!(resp.body.to_vec(), raw);
}

#[tokio::test]
async fn timeout_surfaces_as_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let transport = HttpTransport::new("copyvio-test/1.0")
        .unwrap()
        .with_timeout(Duration::from_millis(50));
    let err = transport
        .execute(&url_for(&server, "/slow?oauth_signature=SECRETSIG"))
        .await
        .unwrap_err();

    match err {
        HttpError::Network(message) => assert!(!message.contains("SECRETSIG")),
        other => panic!("expected network error, got {other:?}"),
    }
}
