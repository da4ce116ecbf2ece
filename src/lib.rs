//! fetch-relay fetches an arbitrary URL on behalf of a browser client.
//!
//! A caller that cannot reach a page directly (CORS, web views) sends
//! `GET <path>?url=<target>`; the relay fetches the target once and answers
//! with `{"contents": "<page text>"}` and `Access-Control-Allow-Origin: *`.
//! Upstream failures are relayed as `{"error": "..."}` with the upstream
//! status, or 500 when the fetch itself fails.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, invoke).
//! - [`error`] -- Unified error type using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`relay`] -- The handler: method and parameter checks, the outbound
//!   fetch, and the JSON response contract.
//! - [`server`] -- Axum server setup, shared state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `sentry-integration` | Sentry error tracking |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod error;
pub mod logging;
pub mod relay;
pub mod server;

#[cfg(feature = "sentry-integration")]
pub mod sentry_integration;
