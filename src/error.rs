//! Unified error types for fetch-relay.
//!
//! [`RelayError`] covers both process-level failures (bind address, I/O)
//! and everything that can go wrong during the outbound fetch. Fetch-path
//! variants carry their cause as `#[source]` and keep their own message
//! short, so [`error_chain`] can render the full cause chain without
//! repeating itself.

use std::fmt::Write;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RelayError {
    #[error("invalid target URL '{url}'")]
    InvalidTargetUrl {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to build upstream request")]
    Request {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("request to {url} failed")]
    Upstream {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to read response body from {url}")]
    BodyRead {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to decode '{encoding}' response body from {url}")]
    Decode {
        url: String,
        encoding: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported content-encoding '{encoding}' from {url}")]
    UnsupportedEncoding { url: String, encoding: String },

    #[error("URL includes credentials: {url}")]
    CredentialsInUrl { url: String },

    #[error("upstream did not respond within {}ms", .0.as_millis())]
    TimedOut(Duration),

    #[error("redirect count exceeded (more than {0} redirects)")]
    TooManyRedirects(usize),

    #[error("Invalid HTTP method: '{0}'")]
    InvalidMethod(String),

    #[error("Handler responded with status {0}")]
    InvokeFailed(axum::http::StatusCode),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Render an error followed by each of its causes, separated by `": "`.
#[must_use]
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        // write! to String is infallible
        let _ = write!(message, ": {inner}");
        cause = inner.source();
    }
    message
}
