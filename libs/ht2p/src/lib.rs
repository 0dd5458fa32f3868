#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! One request/response contract over interchangeable HTTP transport engines
//!
//! A [`RequestConfig`] describes a call: URL plus query parameters, method,
//! headers, body, expected status, compression and per-call limits. The
//! pipeline:
//!
//! 1. **normalize** - merge the query into the URL, default the method to GET,
//!    apply the User-Agent precedence and advertise the negotiated
//!    `Accept-Encoding` ([`normalize`])
//! 2. **execute** - hand the [`ResolvedRequest`] to a [`Transport`]
//!    ([`StandardTransport`] or [`PooledTransport`])
//! 3. **validate** - the status must equal the expected one (200 unless set);
//!    a mismatch returns [`HttpError::UnexpectedStatus`] with the body
//! 4. **decode** - the `Content-Encoding` must match the negotiated
//!    compression; the body is decompressed with the matching [`Compressor`]
//!
//! [`execute_any`] (and [`HttpClient::multi_request`]) runs the same request
//! against several URLs in order and stops at the first success.
//!
//! # Example
//!
//! ```ignore
//! use ht2p::{Compression, HttpClient, RequestConfig};
//!
//! let client = HttpClient::builder().pooled().build()?;
//!
//! let config = RequestConfig::get("https://api.example.test/items")
//!     .query("page", "2")
//!     .compression(Compression::All);
//! let items: Vec<Item> = client.request(&config).await?.json()?;
//!
//! let (response, errors) = client
//!     .multi_request(&config, &["https://a.example.test/items", "https://b.example.test/items"])
//!     .await;
//! ```

mod builder;
mod client;
pub mod compression;
mod config;
mod connector;
mod error;
mod failover;
mod layers;
pub mod pool;
mod query;
mod request;
mod response;
pub mod security;
mod transport;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use compression::{Compression, CompressionLevel, Compressor};
pub use config::{
    DEFAULT_USER_AGENT, HttpClientConfig, RedirectConfig, TlsRootConfig, TransportKind,
    TransportSecurity,
};
pub use error::{DecompressionError, HttpError, InvalidUriKind};
pub use failover::execute_any;
pub use layers::{RedirectLimit, RedirectPolicy, UserAgentLayer, UserAgentService};
pub use pool::{ObjectPool, Pooled, Reset};
pub use query::compose_url;
pub use request::{RequestConfig, ResolvedRequest, normalize};
pub use response::{Response, ResponseBody};
pub use transport::{PooledTransport, StandardTransport, Transport};
