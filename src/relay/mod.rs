//! The fetch relay handler.
//!
//! [`handle`] is the whole contract: reject non-GET methods, require a
//! `url` query parameter, fetch it once, and relay the outcome as JSON
//! with a permissive CORS header. [`relay_handler`] adapts it to axum and
//! wraps each invocation in a span carrying a correlation id. Submodules
//! cover the outbound call ([`fetch`]), body decoding ([`decode`]), and
//! header sets ([`headers`]).

pub mod decode;
pub mod fetch;
pub mod headers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::error::error_chain;
use crate::server::{AppState, HttpClient};

use self::fetch::FetchOutcome;

pub const METHOD_NOT_ALLOWED_BODY: &str = "Method Not Allowed";
pub const MISSING_URL_MESSAGE: &str = "URL parameter is missing.";
pub const FETCH_FAILED_PREFIX: &str = "Failed to fetch target URL: ";
pub const INTERNAL_ERROR_PREFIX: &str = "Serverless function experienced an error: ";

#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Send the fixed browser header set with the outbound GET.
    pub browser_headers: bool,
    /// Upper bound on the whole outbound call, body included.
    pub timeout: Option<Duration>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            browser_headers: true,
            timeout: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentsBody {
    pub contents: String,
}

/// What the caller sees: status, headers, and an already-encoded body.
#[derive(Debug)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RelayResponse {
    fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            headers: headers::cors_only(),
            body: METHOD_NOT_ALLOWED_BODY.to_string(),
        }
    }

    fn json<T: Serialize>(status: StatusCode, payload: &T) -> Self {
        let body = serde_json::to_string(payload).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to encode response body");
            String::from("{}")
        });
        Self {
            status,
            headers: headers::json_with_cors(),
            body,
        }
    }

    fn error(status: StatusCode, message: String) -> Self {
        Self::json(status, &ErrorBody { error: message })
    }
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Decode a raw query string. When a key repeats, the first value wins.
#[must_use]
pub fn query_params(raw: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(raw) = raw {
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
    }
    params
}

pub async fn handle(
    client: &HttpClient,
    options: &RelayOptions,
    method: &Method,
    params: &HashMap<String, String>,
) -> RelayResponse {
    if *method != Method::GET {
        tracing::debug!(method = %method, "rejecting non-GET request");
        return RelayResponse::method_not_allowed();
    }

    let Some(target) = params.get("url").filter(|url| !url.is_empty()) else {
        tracing::debug!("request without url parameter");
        return RelayResponse::error(StatusCode::BAD_REQUEST, MISSING_URL_MESSAGE.to_string());
    };

    let start = Instant::now();
    let logged_target = fetch::redact_target(target);
    let extra_headers = options.browser_headers.then(headers::browser_headers);

    match fetch::fetch_text(client, target, extra_headers, options.timeout).await {
        Ok(FetchOutcome::Fetched { text }) => {
            tracing::info!(
                target = %logged_target,
                bytes = text.len(),
                latency_ms = elapsed_ms(start),
                "target fetched"
            );
            RelayResponse::json(StatusCode::OK, &ContentsBody { contents: text })
        }
        Ok(FetchOutcome::Rejected {
            status,
            status_text,
        }) => {
            tracing::error!(
                target = %logged_target,
                status = status.as_u16(),
                status_text = %status_text,
                latency_ms = elapsed_ms(start),
                "target responded with non-success status"
            );
            RelayResponse::error(status, format!("{FETCH_FAILED_PREFIX}{status_text}"))
        }
        Err(e) => {
            let message = error_chain(&e);
            tracing::error!(
                target = %logged_target,
                error = %message,
                latency_ms = elapsed_ms(start),
                "fetch failed"
            );
            RelayResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{INTERNAL_ERROR_PREFIX}{message}"),
            )
        }
    }
}

pub async fn relay_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    RawQuery(raw_query): RawQuery,
    req_headers: HeaderMap,
) -> RelayResponse {
    let correlation_id = req_headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);
    let span = tracing::info_span!("relay", correlation_id = %correlation_id, method = %method);

    let params = query_params(raw_query.as_deref());
    handle(&state.http_client, &state.options, &method, &params)
        .instrument(span)
        .await
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
