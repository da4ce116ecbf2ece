//! Structured logging setup using the `tracing` ecosystem.
//!
//! Installs a `tracing-subscriber` registry with a `Targets` level filter
//! and either JSON output (for deployments) or pretty-printed output (for
//! a TTY). Format is auto-detected from the terminal but can be forced via
//! `--json` or `--pretty`. With the `sentry-integration` feature, error
//! events are also forwarded to Sentry.

use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Install the global subscriber. Later calls are ignored, so a second
/// initialization (e.g. in tests) never panics.
pub fn init(level: &LogLevel, format: LogFormat) {
    let filter = Targets::new().with_default(level.to_tracing_level());
    let registry = tracing_subscriber::registry().with(filter);

    #[cfg(feature = "sentry-integration")]
    let registry = registry.with(sentry::integrations::tracing::layer());

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(false))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };

    if let Err(e) = installed {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}
