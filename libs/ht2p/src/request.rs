use crate::compression::Compression;
use crate::error::{HttpError, InvalidUriKind};
use crate::query::compose_url;
use bytes::Bytes;
use http::header::{ACCEPT_ENCODING, CONTENT_TYPE, HeaderName, HeaderValue, USER_AGENT};
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What the caller wants from one HTTP exchange.
///
/// Unset fields are filled in by [`normalize`]; the configuration itself is
/// never modified, so one value can be reused across calls and URLs.
///
/// # Example
///
/// ```ignore
/// use ht2p::{Compression, RequestConfig};
///
/// let config = RequestConfig::get("https://api.example.com/items")
///     .query("page", "2")
///     .header("x-request-id", "abc123")
///     .compression(Compression::Brotli);
///
/// let response = client.request(&config).await?;
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct RequestConfig {
    /// Target URL; may already carry a query string
    pub url: String,
    /// Query parameters merged into the URL, overriding embedded ones
    pub query: HashMap<String, String>,
    /// HTTP method (default: GET)
    pub method: Option<Method>,
    /// Header overrides; `None` starts from an empty map
    pub headers: Option<HashMap<String, String>>,
    /// Raw request body
    pub body: Bytes,
    /// Status code that counts as success (default: 200)
    pub expected_status: Option<StatusCode>,
    /// User-Agent that replaces any header-supplied value when non-empty
    pub user_agent: Option<String>,
    /// Response compression to negotiate
    pub compression: Compression,
    /// Redirect limit; meaning depends on the transport engine
    pub max_redirects: Option<usize>,
    /// Cancels the exchange (standard engine only)
    pub cancel: Option<CancellationToken>,
    /// Deadline for the exchange (standard engine only)
    pub deadline: Option<Duration>,
}

impl RequestConfig {
    /// Create a configuration targeting `url` with every other field unset
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// GET `url`
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::GET)
    }

    /// POST `url`
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::POST)
    }

    /// PUT `url`
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::PUT)
    }

    /// PATCH `url`
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::PATCH)
    }

    /// DELETE `url`
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::DELETE)
    }

    /// Same configuration aimed at another URL
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add one query parameter (replaces an earlier value for the same key)
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add one header (replaces an earlier value for the same name)
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Add several headers at once
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = self.headers.get_or_insert_with(HashMap::new);
        for (name, value) in headers {
            map.insert(name.into(), value.into());
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set request body as JSON
    ///
    /// Serializes the value using `serde_json` and sets Content-Type to
    /// `application/json` unless a Content-Type header was already provided.
    ///
    /// # Errors
    ///
    /// Returns `Err(HttpError::Json)` if serialization fails.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        self.body = Bytes::from(serde_json::to_vec(body)?);
        let has_content_type = self.headers.as_ref().is_some_and(|headers| {
            headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
        });
        if !has_content_type {
            self = self.header(CONTENT_TYPE.as_str(), "application/json");
        }
        Ok(self)
    }

    pub fn expect_status(mut self, status: StatusCode) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = Some(max);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Shorthand for [`normalize`]
    ///
    /// # Errors
    /// See [`normalize`].
    pub fn resolve(&self) -> Result<ResolvedRequest, HttpError> {
        normalize(self)
    }
}

/// A request with every default applied, ready for a transport.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    uri: Uri,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
    expected_status: StatusCode,
    compression: Compression,
    max_redirects: Option<usize>,
    cancel: Option<CancellationToken>,
    deadline: Option<Duration>,
}

impl ResolvedRequest {
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn expected_status(&self) -> StatusCode {
        self.expected_status
    }

    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    #[must_use]
    pub fn max_redirects(&self) -> Option<usize> {
        self.max_redirects
    }

    #[must_use]
    pub fn cancel_token(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

/// Apply defaults to `config` and compute the final URI and headers.
///
/// Steps run in this order, later ones overwriting earlier ones:
///
/// 1. compose the URL with the query parameters ([`compose_url`])
/// 2. default the method to GET
/// 3. copy the caller's headers (or start empty)
/// 4. set `Accept-Encoding` from the compression mode
/// 5. set `User-Agent` from a non-empty `user_agent`
/// 6. default the expected status to 200
///
/// # Errors
///
/// - [`HttpError::InvalidUri`] if the URL cannot be parsed
/// - [`HttpError::InvalidHeaderName`] / [`HttpError::InvalidHeaderValue`] for
///   malformed header overrides
pub fn normalize(config: &RequestConfig) -> Result<ResolvedRequest, HttpError> {
    let composed = compose_url(&config.url, &config.query)?;
    let uri: Uri = composed.parse().map_err(|e: http::uri::InvalidUri| HttpError::InvalidUri {
        url: composed.clone(),
        kind: InvalidUriKind::ParseError,
        reason: e.to_string(),
    })?;

    let method = config.method.clone().unwrap_or(Method::GET);

    let mut headers = HeaderMap::new();
    if let Some(overrides) = &config.headers {
        for (name, value) in overrides {
            headers.insert(
                HeaderName::try_from(name.as_str())?,
                HeaderValue::try_from(value.as_str())?,
            );
        }
    }

    if let Some(accept) = config.compression.accept_encoding() {
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(accept));
    }

    if let Some(user_agent) = config.user_agent.as_deref().filter(|ua| !ua.is_empty()) {
        headers.insert(USER_AGENT, HeaderValue::try_from(user_agent)?);
    }

    Ok(ResolvedRequest {
        uri,
        method,
        headers,
        body: config.body.clone(),
        expected_status: config.expected_status.unwrap_or(StatusCode::OK),
        compression: config.compression,
        max_redirects: config.max_redirects,
        cancel: config.cancel.clone(),
        deadline: config.deadline,
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let resolved = normalize(&RequestConfig::new("https://example.test/json")).unwrap();
        assert_eq!(resolved.method(), Method::GET);
        assert_eq!(resolved.expected_status(), StatusCode::OK);
        assert!(resolved.headers().is_empty());
        assert_eq!(resolved.uri().to_string(), "https://example.test/json");
        assert!(resolved.body().is_empty());
        assert!(resolved.max_redirects().is_none());
    }

    #[test]
    fn test_query_merged_into_uri() {
        let config = RequestConfig::get("https://example.test/search?b=1&a=old")
            .query("a", "new")
            .query("c", "x y");
        let resolved = normalize(&config).unwrap();
        assert_eq!(
            resolved.uri().to_string(),
            "https://example.test/search?a=new&b=1&c=x+y"
        );
    }

    #[test]
    fn test_gzip_sets_accept_encoding() {
        let config = RequestConfig::get("https://example.test/")
            .header("Accept-Encoding", "identity")
            .compression(Compression::Gzip);
        let resolved = normalize(&config).unwrap();
        assert_eq!(resolved.headers()[ACCEPT_ENCODING], "gzip");
        assert_eq!(resolved.headers().get_all(ACCEPT_ENCODING).iter().count(), 1);
    }

    #[test]
    fn test_all_compression_offers_every_algorithm() {
        let config = RequestConfig::get("https://example.test/").compression(Compression::All);
        let resolved = normalize(&config).unwrap();
        assert_eq!(resolved.headers()[ACCEPT_ENCODING], "gzip, deflate, br");
    }

    #[test]
    fn test_no_compression_leaves_accept_encoding_alone() {
        let config = RequestConfig::get("https://example.test/").header("accept-encoding", "zstd");
        let resolved = normalize(&config).unwrap();
        assert_eq!(resolved.headers()[ACCEPT_ENCODING], "zstd");
    }

    #[test]
    fn test_user_agent_field_overrides_header() {
        let config = RequestConfig::get("https://example.test/")
            .header("User-Agent", "from-header/1.0")
            .user_agent("from-field/2.0");
        let resolved = normalize(&config).unwrap();
        assert_eq!(resolved.headers()[USER_AGENT], "from-field/2.0");
    }

    #[test]
    fn test_empty_user_agent_keeps_header() {
        let config = RequestConfig::get("https://example.test/")
            .header("User-Agent", "from-header/1.0")
            .user_agent("");
        let resolved = normalize(&config).unwrap();
        assert_eq!(resolved.headers()[USER_AGENT], "from-header/1.0");
    }

    #[test]
    fn test_caller_config_untouched() {
        let config = RequestConfig::post("https://example.test/submit")
            .query("k", "v")
            .compression(Compression::Brotli)
            .user_agent("agent/1.0");
        let _ = normalize(&config).unwrap();

        assert_eq!(config.url, "https://example.test/submit");
        assert!(config.headers.is_none());
        assert!(config.expected_status.is_none());
        assert_eq!(config.query.len(), 1);
    }

    #[test]
    fn test_invalid_url_is_error() {
        let err = normalize(&RequestConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, HttpError::InvalidUri { .. }));
    }

    #[test]
    fn test_invalid_header_name_is_error() {
        let config = RequestConfig::get("https://example.test/").header("bad header", "v");
        assert!(matches!(
            normalize(&config),
            Err(HttpError::InvalidHeaderName(_))
        ));
    }

    #[test]
    fn test_invalid_header_value_is_error() {
        let config = RequestConfig::get("https://example.test/").header("x-bad", "line\nbreak");
        assert!(matches!(
            normalize(&config),
            Err(HttpError::InvalidHeaderValue(_))
        ));
    }

    #[test]
    fn test_explicit_status_and_method_kept() {
        let config = RequestConfig::new("https://example.test/")
            .method(Method::DELETE)
            .expect_status(StatusCode::NO_CONTENT)
            .max_redirects(3)
            .deadline(Duration::from_secs(2));
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.method(), Method::DELETE);
        assert_eq!(resolved.expected_status(), StatusCode::NO_CONTENT);
        assert_eq!(resolved.max_redirects(), Some(3));
        assert_eq!(resolved.deadline(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_json_sets_content_type_once() {
        let config = RequestConfig::post("https://example.test/")
            .json(&serde_json::json!({"name": "ht2p"}))
            .unwrap();
        let resolved = normalize(&config).unwrap();
        assert_eq!(resolved.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(resolved.body().as_ref(), br#"{"name":"ht2p"}"#);

        let custom = RequestConfig::post("https://example.test/")
            .header("content-type", "application/vnd.api+json")
            .json(&serde_json::json!({}))
            .unwrap();
        let resolved = normalize(&custom).unwrap();
        assert_eq!(resolved.headers()[CONTENT_TYPE], "application/vnd.api+json");
    }

    #[test]
    fn test_with_url_keeps_everything_else() {
        let token = CancellationToken::new();
        let config = RequestConfig::get("https://a.test/")
            .compression(Compression::Deflate)
            .cancel_token(token);
        let other = config.with_url("https://b.test/");
        assert_eq!(other.url, "https://b.test/");
        assert_eq!(other.compression, Compression::Deflate);
        assert!(other.cancel.is_some());
        assert_eq!(config.url, "https://a.test/");
    }
}
