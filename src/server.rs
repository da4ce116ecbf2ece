//! Axum server setup, shared application state, and graceful shutdown.
//!
//! [`AppState`] is immutable once built: the connection-pooled outbound
//! client plus the relay options. [`build_router`] mounts the relay
//! handler on the function path for every method, so non-GET requests
//! still reach it and get the relay's own 405.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::any;
use axum::Router;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::relay::{self, RelayOptions};

pub const DEFAULT_PATH: &str = "/fetch-url";

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, http_body_util::Empty<bytes::Bytes>>;

pub struct AppState {
    pub http_client: HttpClient,
    pub options: RelayOptions,
}

impl AppState {
    #[must_use]
    pub fn new(options: RelayOptions) -> Self {
        Self {
            http_client: build_http_client(),
            options,
        }
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // rustls cannot pick a provider when several are compiled in.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

pub fn build_router(state: Arc<AppState>, path: &str) -> Router {
    Router::new()
        .route(path, any(relay::relay_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
