use super::{Transport, finish};
use crate::config::{HttpClientConfig, RedirectConfig, TransportSecurity};
use crate::connector::{self, HyperClient};
use crate::error::{HttpError, InvalidUriKind};
use crate::layers::{
    apply_default_user_agent, is_https_downgrade, is_redirect, is_same_origin, next_hop_method,
    strip_sensitive_headers,
};
use crate::pool::{ObjectPool, Reset};
use crate::request::ResolvedRequest;
use crate::response::{BodyLimit, Response, read_body_into};
use crate::security::check_scheme;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri};
use http_body_util::Full;
use std::time::Duration;

/// Reusable outgoing request state
#[derive(Debug, Default)]
struct RequestSlot {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestSlot {
    fn fill(&mut self, request: &ResolvedRequest, default_user_agent: &HeaderValue) {
        self.method = request.method().clone();
        self.uri = request.uri().clone();
        self.headers.extend(request.headers().clone());
        apply_default_user_agent(&mut self.headers, default_user_agent);
        self.body = request.body().clone();
    }

    fn to_request(&self) -> Request<Full<Bytes>> {
        let mut outgoing = Request::new(Full::new(self.body.clone()));
        *outgoing.method_mut() = self.method.clone();
        *outgoing.uri_mut() = self.uri.clone();
        *outgoing.headers_mut() = self.headers.clone();
        outgoing
    }
}

impl Reset for RequestSlot {
    fn reset(&mut self) {
        self.method = Method::GET;
        self.uri = Uri::default();
        self.headers.clear();
        self.body = Bytes::new();
    }
}

/// Reusable incoming response state; the body buffer keeps its capacity
#[derive(Debug, Default)]
struct ResponseSlot {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    body_limit: BodyLimit,
}

impl Reset for ResponseSlot {
    fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
        self.body_limit = BodyLimit::Within;
    }
}

/// Engine built for many short calls
///
/// Request and response scratch objects come from an [`ObjectPool`] and go
/// back to it on every exit path. Differences from the standard engine:
///
/// - timeouts are the engine's `write_timeout` (send + response head) and
///   `read_timeout` (body); the request's cancellation token and deadline are
///   not consulted
/// - no transparent gzip: every algorithm is decoded after the body is read
/// - redirects are only followed when the request sets a non-zero
///   `max_redirects`; a longer chain fails with [`HttpError::TooManyRedirects`]
#[derive(Debug)]
pub struct PooledTransport {
    client: HyperClient,
    requests: ObjectPool<RequestSlot>,
    responses: ObjectPool<ResponseSlot>,
    user_agent: HeaderValue,
    security: TransportSecurity,
    redirect: RedirectConfig,
    read_timeout: Duration,
    write_timeout: Duration,
    max_body_size: Option<usize>,
}

impl PooledTransport {
    /// Build the engine from client configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails or the user agent is not a
    /// valid header value
    pub fn new(config: &HttpClientConfig) -> Result<Self, HttpError> {
        Ok(Self {
            client: connector::hyper_client(config)?,
            requests: ObjectPool::new(config.object_pool_capacity),
            responses: ObjectPool::new(config.object_pool_capacity),
            user_agent: HeaderValue::from_str(&config.user_agent)?,
            security: config.transport,
            redirect: config.redirect.clone(),
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            max_body_size: config.max_body_size,
        })
    }

    /// Scratch objects currently idle in the pools
    #[must_use]
    pub fn idle_objects(&self) -> usize {
        self.requests.idle() + self.responses.idle()
    }

    /// Scratch objects allocated since the engine was built
    #[must_use]
    pub fn created_objects(&self) -> usize {
        self.requests.created() + self.responses.created()
    }

    /// One exchange without following redirects
    async fn do_once(
        &self,
        outgoing: &RequestSlot,
        incoming: &mut ResponseSlot,
    ) -> Result<(), HttpError> {
        let sent = self.client.request(outgoing.to_request());
        let response = tokio::time::timeout(self.write_timeout, sent)
            .await
            .map_err(|_| HttpError::Timeout(self.write_timeout))??;

        let (parts, body) = response.into_parts();
        incoming.status = parts.status;
        incoming.headers.extend(parts.headers);

        incoming.body_limit = tokio::time::timeout(
            self.read_timeout,
            read_body_into(body, self.max_body_size, &mut incoming.body),
        )
        .await
        .map_err(|_| HttpError::Timeout(self.read_timeout))??;
        Ok(())
    }

    /// Follow up to `max` redirects, leaving the final response in `incoming`.
    ///
    /// A redirect without a usable `Location`, or one refused as an HTTPS → HTTP
    /// downgrade, ends the chain with that 3xx response.
    ///
    /// # Errors
    ///
    /// [`HttpError::TooManyRedirects`] when the chain needs more than `max`
    /// hops, plus anything a single exchange can fail with.
    async fn do_redirects(
        &self,
        outgoing: &mut RequestSlot,
        incoming: &mut ResponseSlot,
        max: usize,
    ) -> Result<(), HttpError> {
        let mut hops = 0;
        loop {
            self.do_once(outgoing, incoming).await?;
            if !is_redirect(incoming.status) {
                return Ok(());
            }
            let Some(target) = resolve_location(&outgoing.uri, &incoming.headers)? else {
                return Ok(());
            };
            if hops == max {
                return Err(HttpError::TooManyRedirects { max });
            }
            if !self.redirect.allow_https_downgrade && is_https_downgrade(&outgoing.uri, &target) {
                tracing::warn!(
                    previous = %outgoing.uri,
                    target = %target,
                    "blocking HTTPS to HTTP downgrade redirect"
                );
                return Ok(());
            }
            check_scheme(&target, self.security)?;

            if self.redirect.strip_sensitive_headers && !is_same_origin(&outgoing.uri, &target) {
                strip_sensitive_headers(&mut outgoing.headers);
            }
            let (method, keep_body) = next_hop_method(incoming.status, &outgoing.method);
            if !keep_body {
                outgoing.body = Bytes::new();
                outgoing.headers.remove(CONTENT_TYPE);
                outgoing.headers.remove(CONTENT_LENGTH);
            }
            outgoing.method = method;
            hops += 1;

            tracing::debug!(
                status = incoming.status.as_u16(),
                hop = hops,
                target = %target,
                "following redirect"
            );
            outgoing.uri = target;
            incoming.reset();
        }
    }
}

/// Absolute target of a redirect response, `None` when `Location` is missing
/// or not valid UTF-8.
fn resolve_location(base: &Uri, headers: &HeaderMap) -> Result<Option<Uri>, HttpError> {
    let Some(location) = headers.get(LOCATION).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };

    let invalid = |reason: String| HttpError::InvalidUri {
        url: location.to_owned(),
        kind: InvalidUriKind::ParseError,
        reason,
    };
    let base = url::Url::parse(&base.to_string()).map_err(|e| invalid(e.to_string()))?;
    let joined = base.join(location).map_err(|e| invalid(e.to_string()))?;
    let target = joined
        .as_str()
        .parse::<Uri>()
        .map_err(|e| invalid(e.to_string()))?;
    Ok(Some(target))
}

#[async_trait]
impl Transport for PooledTransport {
    fn name(&self) -> &'static str {
        "pooled"
    }

    async fn execute(&self, request: &ResolvedRequest) -> Result<Response, HttpError> {
        check_scheme(request.uri(), self.security)?;
        tracing::debug!(
            transport = self.name(),
            method = %request.method(),
            uri = %request.uri(),
            "executing request"
        );

        let mut outgoing = self.requests.acquire();
        let mut incoming = self.responses.acquire();
        outgoing.fill(request, &self.user_agent);

        match request.max_redirects() {
            Some(max) if max > 0 => {
                self.do_redirects(&mut outgoing, &mut incoming, max)
                    .await?;
            }
            _ => self.do_once(&outgoing, &mut incoming).await?,
        }

        // The slot goes back to the pool; the caller gets owned copies.
        let body = Bytes::copy_from_slice(&incoming.body);
        finish(
            request,
            incoming.status,
            incoming.headers.clone(),
            body,
            incoming.body_limit,
            false,
        )
    }
}
