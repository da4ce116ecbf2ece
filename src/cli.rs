//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, invoke), and their argument structs. Every server
//! flag has an environment variable equivalent for container and
//! serverless deployments.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::relay::RelayOptions;
use crate::server::DEFAULT_PATH;

#[derive(Parser)]
#[command(
    name = "fetch-relay",
    version,
    about = "CORS-enabled HTTP fetch relay for browser clients",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        fetch-relay run                                   Serve on :3000/fetch-url\n  \
        fetch-relay invoke https://example.com            Fetch once and print the result"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay server
    Run(Box<RunArgs>),

    /// Run the relay handler once, without a server
    Invoke(InvokeArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        fetch-relay run                                   Defaults\n  \
        fetch-relay run -p 8080 --pretty                  Local dev mode\n  \
        fetch-relay run --path /api/fetch --timeout 10000 Custom path, 10s upstream limit")]
pub struct RunArgs {
    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Path the relay function is mounted on
    #[arg(long, env = "RELAY_PATH", default_value = DEFAULT_PATH)]
    pub path: String,

    #[command(flatten)]
    pub relay: RelayArgs,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Observability --
    /// Sentry DSN (enables error tracking)
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_DSN", help_heading = "Observability")]
    pub sentry_dsn: Option<String>,

    /// Sentry environment tag
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_ENVIRONMENT", help_heading = "Observability")]
    pub sentry_environment: Option<String>,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        fetch-relay invoke https://example.com\n  \
        fetch-relay invoke https://example.com --browser-headers false\n  \
        fetch-relay invoke https://example.com --method POST")]
pub struct InvokeArgs {
    /// Target URL, passed to the handler as the `url` query parameter
    pub url: String,

    /// Inbound method to simulate
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    #[command(flatten)]
    pub relay: RelayArgs,

    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: LogLevel,
}

#[derive(Args)]
#[command(next_help_heading = "Upstream")]
pub struct RelayArgs {
    /// Send browser-like request headers (User-Agent, Accept, ...) upstream
    #[arg(
        long,
        env = "BROWSER_HEADERS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub browser_headers: bool,

    /// Upstream timeout in milliseconds, body read included (none by default)
    #[arg(long, env = "UPSTREAM_TIMEOUT_MS")]
    pub timeout: Option<u64>,
}

impl RelayArgs {
    #[must_use]
    pub fn options(&self) -> RelayOptions {
        RelayOptions {
            browser_headers: self.browser_headers,
            timeout: self.timeout.map(Duration::from_millis),
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}
