use crate::client::HttpClient;
use crate::config::{
    HttpClientConfig, RedirectConfig, TlsRootConfig, TransportKind, TransportSecurity,
};
use crate::error::HttpError;
use crate::transport::{PooledTransport, StandardTransport, Transport};
use std::sync::Arc;
use std::time::Duration;

/// Builder for constructing an [`HttpClient`] over one transport engine.
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    /// Create a builder with a specific configuration
    #[must_use]
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self { config }
    }

    /// Select the transport engine
    #[must_use]
    pub fn transport_kind(mut self, kind: TransportKind) -> Self {
        self.config.transport_kind = kind;
        self
    }

    /// Use the standard engine (per-call cancellation, transparent gzip)
    #[must_use]
    pub fn standard(self) -> Self {
        self.transport_kind(TransportKind::Standard)
    }

    /// Use the pooled engine (object pools, engine-level read/write timeouts)
    #[must_use]
    pub fn pooled(self) -> Self {
        self.transport_kind(TransportKind::Pooled)
    }

    /// Set the default per-request deadline of the standard engine
    ///
    /// A deadline set on the request itself takes precedence.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the pooled engine's body read timeout
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the pooled engine's send timeout (request out, response head in)
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Set the user agent added to requests that carry none
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the maximum response body size
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = Some(size);
        self
    }

    /// Set transport security mode
    ///
    /// Use `TransportSecurity::AllowInsecureHttp` only for testing with mock servers.
    #[must_use]
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    /// Allow insecure HTTP connections (for testing only)
    ///
    /// Equivalent to `.transport(TransportSecurity::AllowInsecureHttp)`.
    ///
    /// **WARNING**: This should only be used for local testing with mock servers.
    /// Never use in production as it exposes traffic to interception.
    ///
    /// # Compile-time Safety
    ///
    /// This method is only available in debug builds or when the `allow-insecure-http`
    /// feature is explicitly enabled.
    #[must_use]
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    pub fn allow_insecure_http(mut self) -> Self {
        tracing::warn!(
            target: "ht2p::security",
            "allow_insecure_http() called - HTTP traffic will NOT be encrypted"
        );
        self.config.transport = TransportSecurity::AllowInsecureHttp;
        self
    }

    /// Select the TLS root certificate source
    #[must_use]
    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.config.tls_roots = roots;
        self
    }

    /// Set the maximum number of redirects to follow
    ///
    /// Set to `0` to disable redirect following (3xx responses pass through as-is).
    /// Only the standard engine reads this default; the pooled engine follows
    /// redirects only when a request sets its own limit.
    #[must_use]
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.redirect.max_redirects = max_redirects;
        self
    }

    /// Disable redirect following
    #[must_use]
    pub fn no_redirects(mut self) -> Self {
        self.config.redirect = RedirectConfig::disabled();
        self
    }

    /// Set the redirect policy configuration
    #[must_use]
    pub fn redirect(mut self, config: RedirectConfig) -> Self {
        self.config.redirect = config;
        self
    }

    /// Set the idle connection timeout for the connection pool
    ///
    /// Set to `None` to use hyper-util's default.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set the maximum number of idle connections per host
    ///
    /// Setting to `0` disables connection reuse entirely.
    #[must_use]
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Set how many idle request/response objects the pooled engine keeps
    #[must_use]
    pub fn object_pool_capacity(mut self, capacity: usize) -> Self {
        self.config.object_pool_capacity = capacity;
        self
    }

    /// Build the HTTP client with the selected engine
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails or the user agent is not a
    /// valid header value
    pub fn build(self) -> Result<HttpClient, HttpError> {
        if self.config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!(
                "insecure HTTP enabled (TransportSecurity::AllowInsecureHttp); \
                 use only for testing with mock servers"
            );
        }

        let transport: Arc<dyn Transport> = match self.config.transport_kind {
            TransportKind::Standard => Arc::new(StandardTransport::new(&self.config)?),
            TransportKind::Pooled => Arc::new(PooledTransport::new(&self.config)?),
        };
        tracing::debug!(transport = transport.name(), "http client built");

        Ok(HttpClient::from_transport(transport))
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
