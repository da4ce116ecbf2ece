//! Response header sets and browser-mimicking request headers.
//!
//! Every relay response carries `Access-Control-Allow-Origin: *`. JSON
//! responses add `Content-Type: application/json`; the 405 response
//! deliberately does not. [`browser_headers`] is the fixed header set sent
//! to the origin so that servers rejecting non-browser clients still
//! answer.

use std::sync::LazyLock;

use axum::http::header::{
    ACCEPT, ACCEPT_LANGUAGE, ACCESS_CONTROL_ALLOW_ORIGIN, CONNECTION, CONTENT_TYPE, USER_AGENT,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

pub const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
    image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9";

pub const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9,ko;q=0.8";

static BROWSER_HEADERS: LazyLock<HeaderMap> = LazyLock::new(|| {
    let mut headers = HeaderMap::with_capacity(5);
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE),
    );
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
});

/// Headers attached to the outbound GET when browser mimicking is on.
#[must_use]
pub fn browser_headers() -> &'static HeaderMap {
    &BROWSER_HEADERS
}

/// Headers for the plain-text 405 response: CORS only.
#[must_use]
pub fn cors_only() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(1);
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers
}

/// Headers for every JSON-bodied response.
#[must_use]
pub fn json_with_cors() -> HeaderMap {
    let mut headers = cors_only();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}
