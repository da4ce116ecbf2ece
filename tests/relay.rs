//! End-to-end tests: a stub origin server and the relay, both on loopback.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::RawQuery;
use axum::http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, LOCATION, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use fetch_relay::relay::{ContentsBody, ErrorBody, RelayOptions};
use fetch_relay::server::{self, AppState};
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn header_or_dash(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn origin_router() -> Router {
    Router::new()
        .route(
            "/page",
            get(|| async { ([(CONTENT_TYPE, "text/html")], "<html>hi</html>") }),
        )
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/unavailable",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
        )
        .route(
            "/headers",
            get(|headers: HeaderMap| async move {
                [
                    header_or_dash(&headers, USER_AGENT.as_str()),
                    header_or_dash(&headers, "accept-language"),
                    header_or_dash(&headers, "dnt"),
                ]
                .join("\n")
            }),
        )
        .route(
            "/redirect",
            get(|| async { (StatusCode::FOUND, [(LOCATION, "/page")]) }),
        )
        .route(
            "/loop",
            get(|| async { (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, "/loop")]) }),
        )
        .route(
            "/query",
            get(|RawQuery(query): RawQuery| async move { query.unwrap_or_default() }),
        )
        .route(
            "/gzip",
            get(|| async {
                (
                    [(CONTENT_ENCODING, "gzip"), (CONTENT_TYPE, "text/html")],
                    gzip(b"<html>hi</html>"),
                )
            }),
        )
        .route(
            "/accept-encoding",
            get(|headers: HeaderMap| async move {
                header_or_dash(&headers, ACCEPT_ENCODING.as_str())
            }),
        )
        .route("/latin1", get(|| async { vec![b'h', 0xff, b'i'] }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        )
}

async fn serve(router: Router) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

/// An origin that promises ten body bytes, sends three, and hangs up.
async fn truncated_origin() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 10\r\n\r\nabc")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    addr
}

struct Harness {
    origin: SocketAddr,
    relay: SocketAddr,
    client: reqwest::Client,
    _origin_shutdown: tokio::sync::oneshot::Sender<()>,
    _relay_shutdown: tokio::sync::oneshot::Sender<()>,
}

impl Harness {
    async fn start(options: RelayOptions) -> Self {
        let (origin, origin_shutdown) = serve(origin_router()).await;
        let state = Arc::new(AppState::new(options));
        let (relay, relay_shutdown) = serve(server::build_router(state, "/fetch-url")).await;
        Self {
            origin,
            relay,
            client: reqwest::Client::new(),
            _origin_shutdown: origin_shutdown,
            _relay_shutdown: relay_shutdown,
        }
    }

    fn origin_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.origin)
    }

    async fn fetch(&self, target: &str) -> reqwest::Response {
        self.client
            .get(format!("http://{}/fetch-url", self.relay))
            .query(&[("url", target)])
            .send()
            .await
            .unwrap()
    }
}

fn assert_json_cors(resp: &reqwest::Response) {
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(resp.headers()["content-type"], "application/json");
}

#[tokio::test]
async fn successful_fetch_relays_contents() {
    let h = Harness::start(RelayOptions::default()).await;

    let resp = h.fetch(&h.origin_url("/page")).await;
    assert_eq!(resp.status(), 200);
    assert_json_cors(&resp);

    let body: ContentsBody = resp.json().await.unwrap();
    assert_eq!(body.contents, "<html>hi</html>");
}

#[tokio::test]
async fn non_get_is_method_not_allowed_without_content_type() {
    let h = Harness::start(RelayOptions::default()).await;

    let resp = h
        .client
        .post(format!("http://{}/fetch-url", h.relay))
        .query(&[("url", h.origin_url("/page"))])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 405);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert!(resp.headers().get("content-type").is_none());
    assert_eq!(resp.text().await.unwrap(), "Method Not Allowed");
}

#[tokio::test]
async fn missing_url_parameter_is_bad_request() {
    let h = Harness::start(RelayOptions::default()).await;

    let resp = h
        .client
        .get(format!("http://{}/fetch-url", h.relay))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_json_cors(&resp);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "URL parameter is missing.");

    let resp = h.fetch("").await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "error": "URL parameter is missing." }));
}

#[tokio::test]
async fn upstream_status_is_relayed() {
    let h = Harness::start(RelayOptions::default()).await;

    let resp = h.fetch(&h.origin_url("/missing")).await;
    assert_eq!(resp.status(), 404);
    assert_json_cors(&resp);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "Failed to fetch target URL: Not Found");

    let resp = h.fetch(&h.origin_url("/unavailable")).await;
    assert_eq!(resp.status(), 503);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "Failed to fetch target URL: Service Unavailable");
}

#[tokio::test]
async fn unreachable_host_is_internal_error() {
    let h = Harness::start(RelayOptions::default()).await;

    // Grab a free port, then release it so nothing is listening there.
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed_addr = closed.local_addr().unwrap();
    drop(closed);

    let resp = h.fetch(&format!("http://{closed_addr}")).await;
    assert_eq!(resp.status(), 500);
    assert_json_cors(&resp);
    let body: ErrorBody = resp.json().await.unwrap();
    assert!(
        body.error.starts_with(&format!(
            "Serverless function experienced an error: request to http://{closed_addr}/ failed: "
        )),
        "unexpected error: {}",
        body.error
    );
}

#[tokio::test]
async fn unparsable_target_is_internal_error() {
    let h = Harness::start(RelayOptions::default()).await;

    let resp = h.fetch("example.com/no-scheme").await;
    assert_eq!(resp.status(), 500);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(
        body.error,
        "Serverless function experienced an error: \
         invalid target URL 'example.com/no-scheme': relative URL without a base"
    );
}

#[tokio::test]
async fn browser_headers_reach_the_origin() {
    let h = Harness::start(RelayOptions::default()).await;

    let body: ContentsBody = h
        .fetch(&h.origin_url("/headers"))
        .await
        .json()
        .await
        .unwrap();
    let lines: Vec<&str> = body.contents.lines().collect();
    assert!(lines[0].starts_with("Mozilla/5.0"));
    assert!(lines[0].contains("Chrome/126.0.0.0"));
    assert_eq!(lines[1], "en-US,en;q=0.9,ko;q=0.8");
    assert_eq!(lines[2], "1");
}

#[tokio::test]
async fn browser_headers_can_be_disabled() {
    let h = Harness::start(RelayOptions {
        browser_headers: false,
        timeout: None,
    })
    .await;

    let body: ContentsBody = h
        .fetch(&h.origin_url("/headers"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body.contents, "-\n-\n-");
}

#[tokio::test]
async fn redirects_are_followed() {
    let h = Harness::start(RelayOptions::default()).await;

    let resp = h.fetch(&h.origin_url("/redirect")).await;
    assert_eq!(resp.status(), 200);
    let body: ContentsBody = resp.json().await.unwrap();
    assert_eq!(body.contents, "<html>hi</html>");
}

#[tokio::test]
async fn redirect_loop_is_internal_error() {
    let h = Harness::start(RelayOptions::default()).await;

    let resp = h.fetch(&h.origin_url("/loop")).await;
    assert_eq!(resp.status(), 500);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(
        body.error,
        "Serverless function experienced an error: redirect count exceeded (more than 20 redirects)"
    );
}

#[tokio::test]
async fn target_query_string_survives_the_round_trip() {
    let h = Harness::start(RelayOptions::default()).await;

    let body: ContentsBody = h
        .fetch(&h.origin_url("/query?a=1&b=two%20words"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body.contents, "a=1&b=two%20words");
}

#[tokio::test]
async fn invalid_utf8_is_replaced() {
    let h = Harness::start(RelayOptions::default()).await;

    let body: ContentsBody = h
        .fetch(&h.origin_url("/latin1"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body.contents, "h\u{FFFD}i");
}

#[tokio::test]
async fn configured_timeout_is_internal_error() {
    let h = Harness::start(RelayOptions {
        browser_headers: true,
        timeout: Some(Duration::from_millis(100)),
    })
    .await;

    let resp = h.fetch(&h.origin_url("/slow")).await;
    assert_eq!(resp.status(), 500);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(
        body.error,
        "Serverless function experienced an error: upstream did not respond within 100ms"
    );
}

#[tokio::test]
async fn repeated_requests_are_identical() {
    let h = Harness::start(RelayOptions::default()).await;
    let target = h.origin_url("/page");

    let first = h.fetch(&target).await;
    let first_status = first.status();
    let first_body: serde_json::Value = first.json().await.unwrap();

    let second = h.fetch(&target).await;
    assert_eq!(second.status(), first_status);
    let second_body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(first_body, second_body);
}

#[tokio::test]
async fn other_paths_are_not_routed() {
    let h = Harness::start(RelayOptions::default()).await;

    let resp = h
        .client
        .get(format!("http://{}/elsewhere", h.relay))
        .query(&[("url", h.origin_url("/page"))])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn gzip_encoded_page_is_unpacked() {
    let h = Harness::start(RelayOptions::default()).await;

    let resp = h.fetch(&h.origin_url("/gzip")).await;
    assert_eq!(resp.status(), 200);
    let body: ContentsBody = resp.json().await.unwrap();
    assert_eq!(body.contents, "<html>hi</html>");
}

#[tokio::test]
async fn compressed_encodings_are_advertised() {
    for browser_headers in [true, false] {
        let h = Harness::start(RelayOptions {
            browser_headers,
            timeout: None,
        })
        .await;

        let body: ContentsBody = h
            .fetch(&h.origin_url("/accept-encoding"))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(body.contents, "gzip, deflate");
    }
}

#[tokio::test]
async fn truncated_body_is_internal_error() {
    let h = Harness::start(RelayOptions::default()).await;
    let origin = truncated_origin().await;

    let resp = h.fetch(&format!("http://{origin}/")).await;
    assert_eq!(resp.status(), 500);
    assert_json_cors(&resp);
    let body: ErrorBody = resp.json().await.unwrap();
    assert!(
        body.error.starts_with(&format!(
            "Serverless function experienced an error: \
             failed to read response body from http://{origin}/: "
        )),
        "unexpected error: {}",
        body.error
    );
}

#[tokio::test]
async fn credentials_in_target_are_refused_and_not_echoed() {
    let h = Harness::start(RelayOptions::default()).await;
    let target = format!("http://user:secret@{}/page", h.origin);

    let resp = h.fetch(&target).await;
    assert_eq!(resp.status(), 500);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(
        body.error,
        format!(
            "Serverless function experienced an error: \
             URL includes credentials: http://{}/page",
            h.origin
        )
    );
    assert!(!body.error.contains("secret"));
}
