//! `fetch-relay invoke` — run the relay handler once, in-process.
//!
//! Builds the same inbound request the server would see (method plus a
//! `url` query parameter), calls [`relay::handle`], and prints the
//! response the caller would receive. Exits non-zero when the handler
//! answers with anything but 2xx.

use std::collections::HashMap;

use axum::http::Method;

use crate::cli::InvokeArgs;
use crate::error::RelayError;
use crate::logging;
use crate::relay::{self, RelayResponse};
use crate::server::build_http_client;

pub async fn execute(args: InvokeArgs) -> Result<(), RelayError> {
    logging::init(&args.log_level, logging::LogFormat::Pretty);

    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .map_err(|_| RelayError::InvalidMethod(args.method.clone()))?;
    let params = HashMap::from([("url".to_string(), args.url.clone())]);

    let client = build_http_client();
    let response = relay::handle(&client, &args.relay.options(), &method, &params).await;

    print!("{}", render(&response));

    if response.status.is_success() {
        Ok(())
    } else {
        Err(RelayError::InvokeFailed(response.status))
    }
}

fn render(response: &RelayResponse) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    // write! to String is infallible
    let _ = writeln!(out, "{}", response.status);
    for (name, value) in &response.headers {
        let _ = writeln!(out, "{name}: {}", String::from_utf8_lossy(value.as_bytes()));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", response.body);
    out
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::relay::headers;

    #[test]
    fn render_lists_status_headers_and_body() {
        let response = RelayResponse {
            status: StatusCode::BAD_REQUEST,
            headers: headers::json_with_cors(),
            body: r#"{"error":"URL parameter is missing."}"#.into(),
        };
        let rendered = render(&response);

        assert!(rendered.starts_with("400 Bad Request\n"));
        assert!(rendered.contains("access-control-allow-origin: *\n"));
        assert!(rendered.contains("content-type: application/json\n"));
        assert!(rendered.ends_with("\n\n{\"error\":\"URL parameter is missing.\"}\n"));
    }
}
