use crate::security::ERROR_BODY_PREVIEW_LIMIT;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Classification of URL validation failures.
///
/// Provides programmatic matching for different failure modes without
/// relying on unstable error message strings.
///
/// # Example
///
/// ```ignore
/// match &err {
///     HttpError::InvalidUri { kind, .. } => match kind {
///         InvalidUriKind::ParseError => println!("Malformed URL syntax"),
///         InvalidUriKind::MissingAuthority => println!("URL needs a host"),
///         InvalidUriKind::MissingScheme => println!("URL needs http:// or https://"),
///         _ => println!("Other URI error"),
///     },
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
    /// URL is missing required scheme (http/https)
    MissingScheme,
}

/// A response body could not be decoded with the negotiated algorithm.
#[derive(Error, Debug)]
#[error("failed to decode {algorithm} body: {source}")]
pub struct DecompressionError {
    /// Algorithm token (`gzip`, `br`, `deflate`)
    pub algorithm: &'static str,
    #[source]
    pub source: std::io::Error,
}

/// HTTP client error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Request attempt exceeded its deadline or an engine read/write timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's cancellation token fired before the exchange finished
    #[error("Request cancelled")]
    Cancelled,

    /// Transport error (DNS, connect, reset, ...)
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The response body stream failed mid-read
    #[error("Failed to read response body: {0}")]
    BodyRead(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response body exceeded size limit
    #[error("Response body too large: limit {limit} bytes, got {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Status code differs from the one the request expected.
    ///
    /// The full response body and headers are kept for diagnostics (API error
    /// payloads and the like); only the `Display` output is truncated.
    #[error("expected status {expected}, got {status}: {}", body_preview(.body))]
    UnexpectedStatus {
        expected: http::StatusCode,
        status: http::StatusCode,
        headers: http::HeaderMap,
        body: Bytes,
    },

    /// The server did not answer with the negotiated `Content-Encoding`
    #[error("requested {expected} encoding, response Content-Encoding is {}", .actual.as_deref().unwrap_or("<none>"))]
    ContentEncodingMismatch {
        expected: String,
        actual: Option<String>,
    },

    /// Body was present but not valid for the negotiated algorithm
    #[error(transparent)]
    Decompression(#[from] DecompressionError),

    /// The redirect chain was longer than allowed
    #[error("stopped after {max} redirects")]
    TooManyRedirects { max: usize },

    /// JSON (de)serialization error
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL (failed to parse)
    ///
    /// Use the `kind` field for programmatic matching. The `reason` field contains
    /// a diagnostic message intended for logging only; do not match on its contents
    /// as the format is unstable and may change between releases.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri {
        /// The URL that failed to parse
        url: String,
        /// Structured failure classification for programmatic matching
        kind: InvalidUriKind,
        /// Diagnostic message (unstable format, for logging only)
        reason: String,
    },

    /// Invalid URL scheme for transport security configuration
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme {
        /// The URL scheme that was rejected
        scheme: String,
        /// Reason the scheme was rejected
        reason: String,
    },
}

impl HttpError {
    /// Response body attached to an [`HttpError::UnexpectedStatus`].
    #[must_use]
    pub fn response_body(&self) -> Option<&Bytes> {
        match self {
            HttpError::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Status code received, for errors that got as far as a response.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            HttpError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

fn body_preview(body: &Bytes) -> String {
    let end = body.len().min(ERROR_BODY_PREVIEW_LIMIT);
    String::from_utf8_lossy(&body[..end]).into_owned()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::error::Error;
    use std::fmt;

    #[derive(Debug)]
    struct TestError(&'static str);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl Error for TestError {}

    #[test]
    fn test_transport_error_preserves_source() {
        let err = HttpError::Transport(Box::new(TestError("connection refused")));

        let source = err.source().expect("Transport error should have a source");
        let downcast = source.downcast_ref::<TestError>();
        assert_eq!(downcast.map(|e| e.0), Some("connection refused"));
    }

    #[test]
    fn test_decompression_error_chain() {
        let err: HttpError = DecompressionError {
            algorithm: "br",
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "bad stream"),
        }
        .into();

        assert!(err.to_string().contains("br"));
        // transparent: HttpError -> io::Error
        let mut count = 0;
        let mut current: Option<&(dyn Error + 'static)> = Some(&err);
        while let Some(e) = current {
            count += 1;
            current = e.source();
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_unexpected_status_keeps_full_body() {
        let body = Bytes::from(vec![b'e'; ERROR_BODY_PREVIEW_LIMIT * 2]);
        let err = HttpError::UnexpectedStatus {
            expected: http::StatusCode::OK,
            status: http::StatusCode::NOT_FOUND,
            headers: http::HeaderMap::new(),
            body: body.clone(),
        };

        assert_eq!(err.response_body(), Some(&body));
        assert_eq!(err.status(), Some(http::StatusCode::NOT_FOUND));
        // message is truncated, payload is not
        assert!(err.to_string().len() < body.len());
    }

    #[test]
    fn test_content_encoding_mismatch_message() {
        let err = HttpError::ContentEncodingMismatch {
            expected: "br".to_owned(),
            actual: None,
        };
        assert_eq!(
            err.to_string(),
            "requested br encoding, response Content-Encoding is <none>"
        );
        assert!(err.response_body().is_none());
    }
}
