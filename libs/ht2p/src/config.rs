use std::time::Duration;

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("ht2p/", env!("CARGO_PKG_VERSION"));

/// Which transport engine executes requests.
///
/// Both engines implement [`Transport`](crate::Transport) and honor the same
/// request/response contract; they differ in how timeouts, gzip and request
/// objects are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportKind {
    /// Tower/hyper stack with per-call cancellation and transparent gzip decoding
    #[default]
    Standard,
    /// Pooled request/response objects, engine-level read/write timeouts
    Pooled,
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Use Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// Use OS native root certificate store
    Native,
}

/// Transport security configuration
///
/// Controls whether the client enforces TLS or allows insecure HTTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Require TLS for all connections (HTTPS only) - default and recommended
    #[default]
    TlsOnly,
    /// Allow insecure HTTP connections (for testing with mock servers only)
    ///
    /// **WARNING**: This should only be used for local testing with mock servers.
    /// Never use in production as it exposes traffic to interception.
    AllowInsecureHttp,
}

/// Redirect handling shared by both transport engines
///
/// - 301/302 turn POST into a body-less GET, 303 does so for every method but HEAD
/// - 307/308 replay the original method and body
/// - `Authorization`, `Cookie` and `Proxy-Authorization` are removed once the
///   chain leaves the original origin (when `strip_sensitive_headers` is set)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectConfig {
    /// Maximum number of redirects to follow (default: 10)
    ///
    /// Used by the standard engine when a request sets no limit of its own.
    /// Set to `0` to disable redirect following entirely.
    pub max_redirects: usize,

    /// Strip sensitive headers on cross-origin redirects (default: true)
    pub strip_sensitive_headers: bool,

    /// Allow HTTPS → HTTP downgrades (default: false)
    ///
    /// **Security**: Downgrades expose traffic to interception. Only enable
    /// for testing with local mock servers.
    pub allow_https_downgrade: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            strip_sensitive_headers: true,
            allow_https_downgrade: false,
        }
    }
}

impl RedirectConfig {
    /// Create a configuration that disables redirect following
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_redirects: 0,
            ..Default::default()
        }
    }

    /// Create a configuration for testing (allows HTTPS → HTTP hops)
    ///
    /// **WARNING**: Only use for local testing with mock servers.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_redirects: 10,
            strip_sensitive_headers: true, // Still strip headers even in tests
            allow_https_downgrade: true,   // Allow for HTTP mock servers
        }
    }
}

/// Overall HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Engine selected when the client is built (default: `Standard`)
    pub transport_kind: TransportKind,

    /// Default deadline for one request on the standard engine (default: 30 seconds)
    ///
    /// A request's own deadline takes precedence. The pooled engine ignores
    /// this and uses `read_timeout`/`write_timeout` instead.
    pub request_timeout: Duration,

    /// Pooled engine: time allowed to read the response body (default: 5 seconds)
    pub read_timeout: Duration,

    /// Pooled engine: time allowed to send the request and receive the
    /// response head (default: 5 seconds)
    pub write_timeout: Duration,

    /// Maximum response body size in bytes (default: unlimited)
    ///
    /// Applies to decoded bytes when the transport decodes gzip itself.
    pub max_body_size: Option<usize>,

    /// User-Agent added when a request carries none (default: "ht2p/<version>")
    pub user_agent: String,

    /// Transport security mode (default: `TlsOnly`)
    ///
    /// Use `AllowInsecureHttp` only for testing with local mock servers.
    pub transport: TransportSecurity,

    /// TLS root certificate strategy (default: `WebPki`)
    pub tls_roots: TlsRootConfig,

    /// Redirect policy (default: follow up to 10, strip credentials cross-origin)
    pub redirect: RedirectConfig,

    /// Timeout for idle connections in the pool (default: 90 seconds)
    ///
    /// Set to `None` to use hyper-util's default idle timeout.
    pub pool_idle_timeout: Option<Duration>,

    /// Maximum number of idle connections per host (default: 32)
    ///
    /// Setting this to `0` disables connection reuse entirely.
    pub pool_max_idle_per_host: usize,

    /// Pooled engine: how many idle request/response objects are kept for
    /// reuse (default: 64). Extra objects are dropped on release.
    pub object_pool_capacity: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            transport_kind: TransportKind::Standard,
            request_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            max_body_size: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            redirect: RedirectConfig::default(),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
            object_pool_capacity: 64,
        }
    }
}

impl HttpClientConfig {
    /// Create minimal configuration (small timeouts and pools, 1 MB body limit)
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            transport_kind: TransportKind::Standard,
            request_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            max_body_size: Some(1024 * 1024), // 1 MB
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            redirect: RedirectConfig::default(),
            pool_idle_timeout: Some(Duration::from_secs(30)),
            pool_max_idle_per_host: 8,
            object_pool_capacity: 8,
        }
    }

    /// Create configuration for the pooled engine tuned for many short calls
    ///
    /// Long-lived idle connections, a large object pool and no redirects.
    #[must_use]
    pub fn high_throughput() -> Self {
        Self {
            transport_kind: TransportKind::Pooled,
            request_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            max_body_size: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            redirect: RedirectConfig::disabled(),
            pool_idle_timeout: Some(Duration::from_secs(3600)),
            pool_max_idle_per_host: 256,
            object_pool_capacity: 1024,
        }
    }

    /// Create configuration for testing with mock servers (allows insecure HTTP)
    ///
    /// **WARNING**: This configuration allows plain HTTP connections.
    /// Use only for local testing with mock servers, never in production.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            transport_kind: TransportKind::Standard,
            request_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            max_body_size: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::AllowInsecureHttp,
            tls_roots: TlsRootConfig::default(),
            redirect: RedirectConfig::for_testing(),
            pool_idle_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 4,
            object_pool_capacity: 4,
        }
    }
}
