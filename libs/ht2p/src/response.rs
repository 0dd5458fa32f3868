use crate::error::HttpError;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

/// Type alias for the boxed response body that supports decompression.
///
/// This type can hold either a raw body or a gzip-decoded body.
/// The body is type-erased so both standard-engine service stacks share it.
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// Result of one HTTP exchange.
///
/// The body is fully buffered and, when compression was negotiated and the
/// encoding matched, already decoded. Repeated headers keep every value in
/// arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Assemble a response; transports call this after validation
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Get the response status code
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the response headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Every value of header `name`, in order; non-UTF-8 values are skipped
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Body as text (UTF-8)
    ///
    /// Invalid UTF-8 sequences are replaced with the Unicode replacement character.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse body as JSON
    ///
    /// # Errors
    /// Returns `HttpError::Json` if parsing fails.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// How a limited body read ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[must_use]
pub enum BodyLimit {
    /// The whole body fit under the limit
    #[default]
    Within,
    /// Reading stopped after `actual` bytes arrived; only `limit` were kept
    Exceeded { limit: usize, actual: usize },
}

impl BodyLimit {
    /// Turn an exceeded limit into [`HttpError::BodyTooLarge`].
    ///
    /// # Errors
    /// Returns [`HttpError::BodyTooLarge`] for [`BodyLimit::Exceeded`].
    pub fn check(self) -> Result<(), HttpError> {
        match self {
            BodyLimit::Within => Ok(()),
            BodyLimit::Exceeded { limit, actual } => Err(HttpError::BodyTooLarge { limit, actual }),
        }
    }
}

/// Read a whole body, keeping at most `limit` bytes.
///
/// Going over the limit is not an error here: the capped prefix is returned
/// together with [`BodyLimit::Exceeded`], so callers can still report a
/// status mismatch with the bytes that fit. For a gzip-decoding stack the
/// limit applies to decoded bytes.
///
/// # Errors
///
/// [`HttpError::BodyRead`] if the body stream fails
pub async fn read_body_limited<B>(
    body: B,
    limit: Option<usize>,
) -> Result<(Bytes, BodyLimit), HttpError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let mut collected = Vec::new();
    let outcome = read_body_into(body, limit, &mut collected).await?;
    Ok((Bytes::from(collected), outcome))
}

/// Append a whole body to `collected`, keeping at most `limit` bytes of what
/// this call appends. Reading stops at the first chunk that crosses the limit.
///
/// # Errors
/// Same as [`read_body_limited`].
pub async fn read_body_into<B>(
    body: B,
    limit: Option<usize>,
    collected: &mut Vec<u8>,
) -> Result<BodyLimit, HttpError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let start = collected.len();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| HttpError::BodyRead(e.into()))?;
        if let Some(chunk) = frame.data_ref() {
            let kept = collected.len() - start;
            let read = kept + chunk.len();
            if let Some(limit) = limit
                && read > limit
            {
                collected.extend_from_slice(&chunk[..limit - kept]);
                return Ok(BodyLimit::Exceeded {
                    limit,
                    actual: read,
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(BodyLimit::Within)
}
