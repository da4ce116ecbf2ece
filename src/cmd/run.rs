//! `fetch-relay run` — start the relay server.
//!
//! Sets up logging (and Sentry when enabled), builds the shared state and
//! router, and serves until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::error::RelayError;
use crate::logging;
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), RelayError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    #[cfg(feature = "sentry-integration")]
    let _sentry_guard = args
        .sentry_dsn
        .as_ref()
        .map(|dsn| crate::sentry_integration::init(dsn, args.sentry_environment.as_deref()));

    let options = args.relay.options();
    let state = Arc::new(AppState::new(options));
    let router = server::build_router(state, &args.path);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        path = %args.path,
        browser_headers = options.browser_headers,
        timeout_ms = ?options.timeout.map(|t| t.as_millis()),
        "fetch-relay started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("fetch-relay stopped");
    Ok(())
}
