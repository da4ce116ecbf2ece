//! `Content-Encoding` removal for buffered upstream bodies.
//!
//! The relay advertises [`ACCEPT_ENCODING_VALUE`] on every outbound GET and
//! undoes whatever the origin applied before the body is read as text.
//! Codings are undone last-applied first. Anything other than gzip,
//! deflate, or identity is an error.

use std::io::Write;

use axum::http::header::CONTENT_ENCODING;
use axum::http::HeaderMap;
use bytes::Bytes;
use flate2::write::{DeflateDecoder, GzDecoder, ZlibDecoder};

use crate::error::RelayError;

pub const ACCEPT_ENCODING_VALUE: &str = "gzip, deflate";

/// Codings listed in `Content-Encoding`, in the order they were applied.
fn applied_codings(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|coding| coding.trim().to_ascii_lowercase())
        .filter(|coding| !coding.is_empty() && coding != "identity")
        .collect()
}

pub fn decode_body(url: &str, headers: &HeaderMap, body: Bytes) -> Result<Bytes, RelayError> {
    let mut decoded = body;
    for coding in applied_codings(headers).iter().rev() {
        let result = match coding.as_str() {
            "gzip" | "x-gzip" => gunzip(&decoded),
            // Servers disagree on whether "deflate" means zlib-wrapped or raw.
            "deflate" => inflate_zlib(&decoded).or_else(|_| inflate_raw(&decoded)),
            other => {
                return Err(RelayError::UnsupportedEncoding {
                    url: url.to_string(),
                    encoding: other.to_string(),
                })
            }
        };
        decoded = Bytes::from(result.map_err(|e| RelayError::Decode {
            url: url.to_string(),
            encoding: coding.clone(),
            source: e,
        })?);
    }
    Ok(decoded)
}

fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(Vec::new());
    decoder.write_all(data)?;
    decoder.finish()
}

fn inflate_zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(Vec::new());
    decoder.write_all(data)?;
    decoder.finish()
}

fn inflate_raw(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(Vec::new());
    decoder.write_all(data)?;
    decoder.finish()
}
