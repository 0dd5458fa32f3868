//! HTTP security utilities.

use crate::config::TransportSecurity;
use crate::error::{HttpError, InvalidUriKind};
use http::Uri;

/// Maximum body preview size for error messages (8KB).
///
/// [`HttpError::UnexpectedStatus`] keeps the whole response body, but its
/// `Display` output only shows this many bytes.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

/// Validate an absolute URI against the transport security mode.
///
/// `https` is always accepted, `http` only with
/// [`TransportSecurity::AllowInsecureHttp`], anything else is rejected.
///
/// # Errors
///
/// Returns [`HttpError::InvalidUri`] when the URI has no host or scheme and
/// [`HttpError::InvalidScheme`] when the scheme is not permitted.
pub fn check_scheme(uri: &Uri, security: TransportSecurity) -> Result<(), HttpError> {
    if uri.authority().is_none() {
        return Err(HttpError::InvalidUri {
            url: uri.to_string(),
            kind: InvalidUriKind::MissingAuthority,
            reason: "missing host/authority".to_owned(),
        });
    }

    match uri.scheme_str() {
        Some("https") => Ok(()),
        Some("http") => match security {
            TransportSecurity::AllowInsecureHttp => Ok(()),
            TransportSecurity::TlsOnly => Err(HttpError::InvalidScheme {
                scheme: "http".to_owned(),
                reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
            }),
        },
        Some(scheme) => Err(HttpError::InvalidScheme {
            scheme: scheme.to_owned(),
            reason: "only http:// and https:// schemes are supported".to_owned(),
        }),
        None => Err(HttpError::InvalidUri {
            url: uri.to_string(),
            kind: InvalidUriKind::MissingScheme,
            reason: "missing scheme".to_owned(),
        }),
    }
}
