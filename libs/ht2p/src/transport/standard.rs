use super::{Transport, finish};
use crate::compression::{Compression, GZIP};
use crate::config::{HttpClientConfig, TransportSecurity};
use crate::connector;
use crate::error::{DecompressionError, HttpError};
use crate::layers::{RedirectLimit, RedirectPolicy, UserAgentLayer};
use crate::request::ResolvedRequest;
use crate::response::{BodyLimit, Response, ResponseBody, read_body_limited};
use crate::security::check_scheme;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use std::time::Duration;
use tower::util::BoxCloneSyncService;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;
use tower_http::follow_redirect::FollowRedirectLayer;

/// Fully read response of one exchange
struct Exchanged {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    body_limit: BodyLimit,
}

/// Type-erased service stack; both stacks share it so one can be picked per request.
type ClientService =
    BoxCloneSyncService<Request<Full<Bytes>>, http::Response<ResponseBody>, HttpError>;

/// Tower/hyper engine
///
/// Request flow (outer → inner):
///   `UserAgent` → [gzip `Decompression`] → `FollowRedirect` → `hyper_client`
///
/// - Each call is bound to the request's cancellation token and deadline
///   (falling back to [`HttpClientConfig::request_timeout`])
/// - gzip is decoded inside the stack, so [`Compression::Gzip`] responses
///   arrive already decoded; other algorithms are decoded after the read
/// - Redirects follow [`RedirectPolicy`]; past the limit the last 3xx is
///   returned and then validated like any other status
#[derive(Clone)]
pub struct StandardTransport {
    plain: ClientService,
    gzip: ClientService,
    security: TransportSecurity,
    request_timeout: Duration,
    max_body_size: Option<usize>,
}

impl std::fmt::Debug for StandardTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardTransport")
            .field("security", &self.security)
            .field("request_timeout", &self.request_timeout)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

impl StandardTransport {
    /// Build the engine from client configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails or the user agent is not a
    /// valid header value
    pub fn new(config: &HttpClientConfig) -> Result<Self, HttpError> {
        let client = connector::hyper_client(config)?;
        let ua_layer = UserAgentLayer::try_new(&config.user_agent)?;
        let policy = RedirectPolicy::new(config.redirect.clone());

        let plain = ServiceBuilder::new()
            .layer(ua_layer.clone())
            .layer(FollowRedirectLayer::with_policy(policy.clone()))
            .service(client.clone())
            .map_response(box_response_body)
            .map_err(HttpError::from);

        let gzip = ServiceBuilder::new()
            .layer(ua_layer)
            .layer(DecompressionLayer::new())
            .layer(FollowRedirectLayer::with_policy(policy))
            .service(client)
            .map_response(box_response_body)
            .map_err(HttpError::from);

        Ok(Self {
            plain: BoxCloneSyncService::new(plain),
            gzip: BoxCloneSyncService::new(gzip),
            security: config.transport,
            request_timeout: config.request_timeout,
            max_body_size: config.max_body_size,
        })
    }

    async fn exchange(
        &self,
        request: &ResolvedRequest,
    ) -> Result<Exchanged, HttpError> {
        let mut outgoing = Request::new(Full::new(request.body().clone()));
        *outgoing.method_mut() = request.method().clone();
        *outgoing.uri_mut() = request.uri().clone();
        *outgoing.headers_mut() = request.headers().clone();
        if let Some(max) = request.max_redirects() {
            outgoing.extensions_mut().insert(RedirectLimit(max));
        }

        let gzip = request.compression() == Compression::Gzip;
        let service = if gzip {
            self.gzip.clone()
        } else {
            self.plain.clone()
        };

        let (parts, body) = service.oneshot(outgoing).await?.into_parts();
        let (body, body_limit) = match read_body_limited(body, self.max_body_size).await {
            Ok(read) => read,
            Err(err) if gzip => return Err(gzip_stream_error(err)),
            Err(err) => return Err(err),
        };
        Ok(Exchanged {
            status: parts.status,
            headers: parts.headers,
            body,
            body_limit,
        })
    }
}

#[async_trait]
impl Transport for StandardTransport {
    fn name(&self) -> &'static str {
        "standard"
    }

    async fn execute(&self, request: &ResolvedRequest) -> Result<Response, HttpError> {
        check_scheme(request.uri(), self.security)?;

        let deadline = request.deadline().unwrap_or(self.request_timeout);
        tracing::debug!(
            transport = self.name(),
            method = %request.method(),
            uri = %request.uri(),
            "executing request"
        );

        let exchange = tokio::time::timeout(deadline, self.exchange(request));
        let outcome = match request.cancel_token() {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => return Err(HttpError::Cancelled),
                outcome = exchange => outcome,
            },
            None => exchange.await,
        };
        let exchanged = outcome.map_err(|_| HttpError::Timeout(deadline))??;

        finish(
            request,
            exchanged.status,
            exchanged.headers,
            exchanged.body,
            exchanged.body_limit,
            request.compression() == Compression::Gzip,
        )
    }
}

/// The gzip stack decodes while streaming; a corrupt stream surfaces as an
/// `InvalidData` body error and is reported like any other decode failure.
fn gzip_stream_error(err: HttpError) -> HttpError {
    let HttpError::BodyRead(source) = err else {
        return err;
    };
    match source.downcast::<std::io::Error>() {
        Ok(io) if io.kind() == std::io::ErrorKind::InvalidData => {
            HttpError::Decompression(DecompressionError {
                algorithm: GZIP,
                source: *io,
            })
        }
        Ok(io) => HttpError::BodyRead(io),
        Err(other) => HttpError::BodyRead(other),
    }
}

/// Map the (possibly decompressing) response body to our boxed body type.
fn box_response_body<B>(response: http::Response<B>) -> http::Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = response.into_parts();
    let boxed_body: ResponseBody = body.map_err(Into::into).boxed();
    http::Response::from_parts(parts, boxed_body)
}
