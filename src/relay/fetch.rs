//! The outbound GET issued once per invocation.
//!
//! [`fetch_text`] parses the target, sends the request (with browser
//! headers when asked), follows redirects like a browser `fetch` would,
//! and buffers the whole body as text once any `Content-Encoding` is
//! undone. URLs carrying credentials are refused, and URLs are logged and
//! reported with userinfo removed. A non-2xx final status is not an
//! error here: it comes back as [`FetchOutcome::Rejected`] so the handler
//! can relay the origin's status code.

use std::time::Duration;

use axum::http::header::{ACCEPT_ENCODING, LOCATION};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use url::Url;

use crate::error::RelayError;
use crate::server::HttpClient;

use super::decode;

pub const MAX_REDIRECTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched { text: String },
    Rejected { status: StatusCode, status_text: String },
}

pub async fn fetch_text(
    client: &HttpClient,
    target: &str,
    extra_headers: Option<&HeaderMap>,
    timeout: Option<Duration>,
) -> Result<FetchOutcome, RelayError> {
    let fetch = fetch_following_redirects(client, target, extra_headers);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fetch)
            .await
            .map_err(|_| RelayError::TimedOut(limit))?,
        None => fetch.await,
    }
}

async fn fetch_following_redirects(
    client: &HttpClient,
    target: &str,
    extra_headers: Option<&HeaderMap>,
) -> Result<FetchOutcome, RelayError> {
    let mut current = Url::parse(target).map_err(|e| RelayError::InvalidTargetUrl {
        url: target.to_string(),
        source: Box::new(e),
    })?;
    let mut redirects = 0;

    loop {
        if has_credentials(&current) {
            return Err(RelayError::CredentialsInUrl {
                url: redacted(&current),
            });
        }

        let response = send_get(client, &current, extra_headers).await?;
        let status = response.status();

        if let Some(next) = redirect_location(&current, status, response.headers())? {
            if redirects == MAX_REDIRECTS {
                return Err(RelayError::TooManyRedirects(MAX_REDIRECTS));
            }
            redirects += 1;
            tracing::debug!(
                from = %redacted(&current),
                to = %redacted(&next),
                status = status.as_u16(),
                "following redirect"
            );
            current = next;
            continue;
        }

        if !status.is_success() {
            return Ok(FetchOutcome::Rejected {
                status,
                status_text: status_text(&response),
            });
        }

        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| RelayError::BodyRead {
                url: redacted(&current),
                source: Box::new(e),
            })?
            .to_bytes();
        let body = decode::decode_body(&redacted(&current), &headers, body)?;

        return Ok(FetchOutcome::Fetched {
            text: String::from_utf8_lossy(&body).into_owned(),
        });
    }
}

async fn send_get(
    client: &HttpClient,
    url: &Url,
    extra_headers: Option<&HeaderMap>,
) -> Result<hyper::Response<Incoming>, RelayError> {
    // Fragments never go on the wire.
    let mut wire_url = url.clone();
    wire_url.set_fragment(None);

    let mut builder = hyper::Request::builder()
        .method(Method::GET)
        .uri(wire_url.as_str());
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
    }
    builder = builder.header(
        ACCEPT_ENCODING,
        HeaderValue::from_static(decode::ACCEPT_ENCODING_VALUE),
    );

    let request = builder
        .body(Empty::<Bytes>::new())
        .map_err(|e| RelayError::Request {
            source: Box::new(e),
        })?;

    client
        .request(request)
        .await
        .map_err(|e| RelayError::Upstream {
            url: redacted(&wire_url),
            source: Box::new(e),
        })
}

fn has_credentials(url: &Url) -> bool {
    !url.username().is_empty() || url.password().is_some()
}

fn redacted(url: &Url) -> String {
    if !has_credentials(url) {
        return url.to_string();
    }
    let mut clean = url.clone();
    // Only fails for URLs that cannot carry userinfo at all.
    let _ = clean.set_username("");
    let _ = clean.set_password(None);
    clean.to_string()
}

/// A target as it may appear in logs: userinfo removed when it parses.
#[must_use]
pub fn redact_target(target: &str) -> String {
    Url::parse(target).map_or_else(|_| target.to_string(), |url| redacted(&url))
}

/// Resolve the next hop for a redirect response, or `None` when the
/// response is final (not a redirect status, or no `Location`).
fn redirect_location(
    current: &Url,
    status: StatusCode,
    headers: &HeaderMap,
) -> Result<Option<Url>, RelayError> {
    let is_redirect = matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );
    if !is_redirect {
        return Ok(None);
    }
    let Some(location) = headers.get(LOCATION) else {
        return Ok(None);
    };

    let location = location
        .to_str()
        .map_err(|e| RelayError::InvalidTargetUrl {
            url: String::from_utf8_lossy(location.as_bytes()).into_owned(),
            source: Box::new(e),
        })?;
    current
        .join(location)
        .map(Some)
        .map_err(|e| RelayError::InvalidTargetUrl {
            url: location.to_string(),
            source: Box::new(e),
        })
}

/// The reason phrase the origin actually sent, else the canonical one.
fn status_text<B>(response: &hyper::Response<B>) -> String {
    response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
        .or_else(|| response.status().canonical_reason().map(str::to_owned))
        .unwrap_or_default()
}
