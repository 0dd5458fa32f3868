use crate::builder::HttpClientBuilder;
use crate::error::HttpError;
use crate::failover;
use crate::request::{RequestConfig, normalize};
use crate::response::Response;
use crate::transport::Transport;
use std::sync::Arc;

/// HTTP client over one transport engine
///
/// Every call goes through the same pipeline: the [`RequestConfig`] is
/// normalized into a [`ResolvedRequest`](crate::ResolvedRequest), executed by
/// the engine picked at build time, and the response is validated against the
/// expected status and negotiated compression.
///
/// Use [`HttpClientBuilder`] to construct instances with custom configuration.
///
/// # Thread Safety
///
/// `HttpClient` is `Clone + Send + Sync`. Cloning is cheap (one `Arc` clone)
/// and clones share the engine, including its connection and object pools.
///
/// # Example
///
/// ```ignore
/// let client = HttpClient::new()?;
/// let response = client
///     .request(&RequestConfig::get("https://api.example.test/items").query("page", "2"))
///     .await?;
/// let items: Vec<Item> = response.json()?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, HttpError> {
        HttpClientBuilder::new().build()
    }

    /// Create a builder for configuring the HTTP client
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Wrap an existing engine, e.g. a custom [`Transport`] implementation
    #[must_use]
    pub fn from_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Name of the engine executing requests
    #[must_use]
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Execute one request against `config.url`
    ///
    /// A single URL is never retried.
    ///
    /// # Errors
    ///
    /// - [`HttpError::InvalidUri`] and header errors from normalization
    /// - [`HttpError::UnexpectedStatus`] when the status differs from the
    ///   expected one (200 unless set); the error carries the response body
    /// - [`HttpError::ContentEncodingMismatch`] / [`HttpError::Decompression`]
    ///   for compression failures
    /// - transport, TLS, timeout and cancellation errors
    pub async fn request(&self, config: &RequestConfig) -> Result<Response, HttpError> {
        let request = normalize(config)?;
        self.transport.execute(&request).await
    }

    /// Execute `config` against each of `urls` in order until one succeeds
    ///
    /// `config.url` is ignored. Returns the first successful response with the
    /// errors of earlier candidates, or `None` with one error per candidate.
    pub async fn multi_request<U: AsRef<str>>(
        &self,
        config: &RequestConfig,
        urls: &[U],
    ) -> (Option<Response>, Vec<HttpError>) {
        failover::execute_any(self.transport.as_ref(), config, urls).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::compression::{Compression, Compressor, GzipCompressor};
    use crate::config::TransportKind;
    use crate::request::ResolvedRequest;
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_client(kind: TransportKind) -> HttpClient {
        HttpClientBuilder::new()
            .allow_insecure_http()
            .transport_kind(kind)
            .build()
            .unwrap()
    }

    fn assert_send_sync<T: Send + Sync + Clone>() {}

    #[test]
    fn test_http_client_is_send_sync_clone() {
        assert_send_sync::<HttpClient>();
    }

    #[tokio::test]
    async fn test_transport_names() {
        assert_eq!(test_client(TransportKind::Standard).transport_name(), "standard");
        assert_eq!(test_client(TransportKind::Pooled).transport_name(), "pooled");
    }

    #[tokio::test]
    async fn test_both_engines_share_contract() {
        let server = MockServer::start();
        let packed = GzipCompressor::default().compress(br#"{"ok":true}"#).unwrap();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/items")
                .query_param("page", "2")
                .header("accept-encoding", "gzip");
            then.status(200)
                .header("content-encoding", "gzip")
                .body(&packed);
        });

        let config = RequestConfig::get(server.url("/items"))
            .query("page", "2")
            .compression(Compression::Gzip);
        for kind in [TransportKind::Standard, TransportKind::Pooled] {
            let response = test_client(kind).request(&config).await.unwrap();
            let value: serde_json::Value = response.json().unwrap();
            assert_eq!(value, json!({"ok": true}), "engine {kind:?}");
        }
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_request_invalid_url() {
        let client = test_client(TransportKind::Standard);
        let err = client
            .request(&RequestConfig::get("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidUri { .. }));
    }

    #[tokio::test]
    async fn test_multi_request_falls_over() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.path("/down");
            then.status(503).body("maintenance");
        });
        let up = server.mock(|when, then| {
            when.path("/up");
            then.status(200).body("hello");
        });

        let client = test_client(TransportKind::Standard);
        let (response, errors) = client
            .multi_request(
                &RequestConfig::new(""),
                &[server.url("/down"), server.url("/up")],
            )
            .await;

        assert_eq!(response.unwrap().text(), "hello");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        up.assert();
    }

    #[tokio::test]
    async fn test_from_transport() {
        struct Teapot;

        #[async_trait]
        impl Transport for Teapot {
            fn name(&self) -> &'static str {
                "teapot"
            }

            async fn execute(&self, _request: &ResolvedRequest) -> Result<Response, HttpError> {
                Ok(Response::new(StatusCode::IM_A_TEAPOT, HeaderMap::new(), Bytes::new()))
            }
        }

        let client = HttpClient::from_transport(Arc::new(Teapot));
        assert_eq!(client.transport_name(), "teapot");
        assert_eq!(format!("{client:?}"), r#"HttpClient { transport: "teapot" }"#);

        let response = client
            .request(&RequestConfig::get("https://example.test/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
