//! Redirect rules shared by both transport engines
//!
//! The standard engine plugs [`RedirectPolicy`] into tower-http's
//! `FollowRedirect`; the pooled engine runs its own loop over the helpers
//! below. Either way:
//! - `Authorization`, `Cookie` and `Proxy-Authorization` are stripped once the
//!   chain has left the original origin
//! - HTTPS → HTTP hops are refused unless explicitly allowed
//! - the number of hops is capped (client default or per-request override)

use crate::config::RedirectConfig;
use http::{HeaderMap, Method, Request, StatusCode, Uri, header};
use tower_http::follow_redirect::policy::{Action, Attempt, Policy};

/// Headers that are stripped on cross-origin redirects to prevent credential leakage
const SENSITIVE_HEADERS: &[header::HeaderName] = &[
    header::AUTHORIZATION,
    header::COOKIE,
    header::PROXY_AUTHORIZATION,
];

/// Per-request redirect limit, carried as a request extension.
///
/// Overrides [`RedirectConfig::max_redirects`] for the request it is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectLimit(pub usize);

/// Check if the redirect is to the same origin (scheme, host, port)
///
/// Missing schemes default to "https" (fail-closed).
pub fn is_same_origin(original: &Uri, target: &Uri) -> bool {
    let orig_scheme = original.scheme_str().unwrap_or("https");
    let target_scheme = target.scheme_str().unwrap_or("https");

    let orig_port = original
        .port_u16()
        .unwrap_or_else(|| default_port(orig_scheme));
    let target_port = target
        .port_u16()
        .unwrap_or_else(|| default_port(target_scheme));

    orig_scheme == target_scheme
        && original.host().unwrap_or("") == target.host().unwrap_or("")
        && orig_port == target_port
}

/// Check if the redirect is an HTTPS → HTTP downgrade
pub fn is_https_downgrade(original: &Uri, target: &Uri) -> bool {
    original.scheme_str().unwrap_or("https") == "https" && target.scheme_str() == Some("http")
}

/// Remove credentials before a request leaves its origin
pub fn strip_sensitive_headers(headers: &mut HeaderMap) {
    for header_name in SENSITIVE_HEADERS {
        if headers.remove(header_name).is_some() {
            tracing::debug!(header = %header_name, "stripped sensitive header on cross-origin redirect");
        }
    }
}

/// Status codes that carry a `Location` worth following
pub fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Method for the next hop and whether the body is replayed.
///
/// Same rewriting as tower-http's `FollowRedirect`: 301/302 turn POST into a
/// body-less GET, 303 turns anything but HEAD into GET and always drops the
/// body, 307/308 replay method and body unchanged.
pub fn next_hop_method(status: StatusCode, method: &Method) -> (Method, bool) {
    let to_get = match status {
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => *method == Method::POST,
        StatusCode::SEE_OTHER => *method != Method::HEAD,
        _ => false,
    };

    if to_get {
        (Method::GET, false)
    } else if status == StatusCode::SEE_OTHER {
        (Method::HEAD, false)
    } else {
        (method.clone(), true)
    }
}

/// Get the default port for a scheme
fn default_port(scheme: &str) -> u16 {
    match scheme {
        "http" => 80,
        "https" => 443,
        _ => 0,
    }
}

/// Redirect policy for the standard engine's `FollowRedirect` layer
///
/// Cloned for every request, so counters start fresh per call. When the hop
/// limit is reached (or a downgrade is refused) the 3xx response itself is
/// handed back to the caller.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    config: RedirectConfig,
    /// Track the number of redirects followed (resets per-request via Clone)
    redirect_count: usize,
    /// Track if we're in a cross-origin redirect chain (for header stripping)
    cross_origin_detected: bool,
}

impl RedirectPolicy {
    #[must_use]
    pub fn new(config: RedirectConfig) -> Self {
        Self {
            config,
            redirect_count: 0,
            cross_origin_detected: false,
        }
    }
}

impl<B: Clone, E> Policy<B, E> for RedirectPolicy {
    fn redirect(&mut self, attempt: &Attempt<'_>) -> Result<Action, E> {
        self.redirect_count += 1;
        if self.redirect_count > self.config.max_redirects {
            tracing::debug!(
                count = self.redirect_count,
                max = self.config.max_redirects,
                "redirect limit reached"
            );
            return Ok(Action::Stop);
        }

        let previous = attempt.previous();
        let target = attempt.location();

        if !self.config.allow_https_downgrade && is_https_downgrade(previous, target) {
            tracing::warn!(
                previous = %previous,
                target = %target,
                "blocking HTTPS to HTTP downgrade redirect"
            );
            return Ok(Action::Stop);
        }

        if !is_same_origin(previous, target) {
            self.cross_origin_detected = true;
        }

        tracing::debug!(
            status = attempt.status().as_u16(),
            hop = self.redirect_count,
            target = %target,
            "following redirect"
        );
        Ok(Action::Follow)
    }

    fn on_request(&mut self, request: &mut Request<B>) {
        // Only the caller's original request carries the extension.
        if let Some(RedirectLimit(max)) = request.extensions().get::<RedirectLimit>() {
            self.config.max_redirects = *max;
        }

        if self.cross_origin_detected && self.config.strip_sensitive_headers {
            strip_sensitive_headers(request.headers_mut());
        }
    }

    fn clone_body(&self, body: &B) -> Option<B> {
        // Clone body for 307/308 redirects that require preserving the request body
        Some(body.clone())
    }
}
