//! Transport engines
//!
//! Both engines execute a [`ResolvedRequest`] and apply the same response
//! contract: the status must equal the expected one (otherwise
//! [`HttpError::UnexpectedStatus`] carries the body) and the body is checked
//! and decoded against the negotiated compression.
//!
//! | Engine                | Cancellation / deadline      | gzip                | Redirects over limit |
//! |-----------------------|------------------------------|---------------------|----------------------|
//! | [`StandardTransport`] | per-call token and deadline  | decoded in transport | last 3xx returned   |
//! | [`PooledTransport`]   | engine read/write timeouts   | decoded after read  | `TooManyRedirects`  |

mod pooled;
mod standard;

pub use pooled::PooledTransport;
pub use standard::StandardTransport;

use crate::compression::verify_and_decompress;
use crate::error::HttpError;
use crate::request::ResolvedRequest;
use crate::response::{BodyLimit, Response};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// Executes one resolved request against one transport engine.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short engine name used in logs (`"standard"`, `"pooled"`)
    fn name(&self) -> &'static str;

    /// Perform the exchange and validate the response.
    ///
    /// # Errors
    ///
    /// Transport failures, status mismatches, encoding mismatches and
    /// decompression failures, as [`HttpError`] values.
    async fn execute(&self, request: &ResolvedRequest) -> Result<Response, HttpError>;
}

/// Turn a fully read exchange into a [`Response`] or an error.
///
/// The status is checked first, so a mismatch is reported with whatever part
/// of the body fit under the size limit; an exceeded limit only fails an
/// otherwise successful exchange. `transparent_gzip` is set by engines whose
/// stack already decoded gzip.
fn finish(
    request: &ResolvedRequest,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    body_limit: BodyLimit,
    transparent_gzip: bool,
) -> Result<Response, HttpError> {
    if status != request.expected_status() {
        return Err(HttpError::UnexpectedStatus {
            expected: request.expected_status(),
            status,
            headers,
            body,
        });
    }
    body_limit.check()?;

    let body = verify_and_decompress(&headers, body, request.compression(), transparent_gzip)?;
    Ok(Response::new(status, headers, body))
}
