//! URL composition: merges caller query parameters into a base URL.

use crate::error::{HttpError, InvalidUriKind};
use std::collections::{BTreeMap, HashMap};
use url::Url;
use url::form_urlencoded;

/// Merge `params` into the query string of `base` and return the final URL.
///
/// Caller parameters replace every embedded value with the same key. When
/// `params` is non-empty the whole query is re-encoded with keys in sorted
/// order; repeated embedded keys that are not overridden keep their relative
/// order. With no parameters the URL is only parsed and re-serialized.
///
/// # Errors
///
/// Returns [`HttpError::InvalidUri`] if `base` is not an absolute URL.
///
/// # Example
///
/// ```ignore
/// let params = HashMap::from([("page".to_owned(), "2".to_owned())]);
/// let url = compose_url("https://api.example.test/items?page=1&q=rust", &params)?;
/// assert_eq!(url, "https://api.example.test/items?page=2&q=rust");
/// ```
pub fn compose_url(base: &str, params: &HashMap<String, String>) -> Result<String, HttpError> {
    let mut parsed = Url::parse(base).map_err(|e| HttpError::InvalidUri {
        url: base.to_owned(),
        kind: classify(e),
        reason: e.to_string(),
    })?;

    if params.is_empty() {
        return Ok(parsed.into());
    }

    let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in parsed.query_pairs() {
        merged
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    for (key, value) in params {
        merged.insert(key.clone(), vec![value.clone()]);
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(
            merged
                .iter()
                .flat_map(|(key, values)| values.iter().map(move |value| (key, value))),
        )
        .finish();
    parsed.set_query(Some(&encoded));

    Ok(parsed.into())
}

fn classify(err: url::ParseError) -> InvalidUriKind {
    match err {
        url::ParseError::RelativeUrlWithoutBase => InvalidUriKind::MissingScheme,
        url::ParseError::EmptyHost => InvalidUriKind::MissingAuthority,
        _ => InvalidUriKind::ParseError,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_no_params_keeps_query() {
        let url = compose_url("https://example.test/get?b=2&a=1", &HashMap::new()).unwrap();
        assert_eq!(url, "https://example.test/get?b=2&a=1");
    }

    #[test]
    fn test_params_are_sorted() {
        let url = compose_url(
            "https://example.test/search",
            &params(&[("q", "rust"), ("page", "1"), ("limit", "10")]),
        )
        .unwrap();
        assert_eq!(url, "https://example.test/search?limit=10&page=1&q=rust");
    }

    #[test]
    fn test_caller_params_override_embedded() {
        let url = compose_url(
            "https://example.test/items?page=1&page=3&q=old&keep=yes",
            &params(&[("page", "2"), ("q", "new")]),
        )
        .unwrap();

        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("keep".to_owned(), "yes".to_owned()),
                ("page".to_owned(), "2".to_owned()),
                ("q".to_owned(), "new".to_owned()),
            ]
        );
    }

    #[test]
    fn test_repeated_embedded_key_keeps_order() {
        let url = compose_url(
            "https://example.test/?tag=b&tag=a",
            &params(&[("z", "1")]),
        )
        .unwrap();
        assert_eq!(url, "https://example.test/?tag=b&tag=a&z=1");
    }

    #[test]
    fn test_values_are_form_encoded() {
        let url = compose_url(
            "https://example.test/",
            &params(&[("q", "a b&c"), ("path", "/x/y")]),
        )
        .unwrap();
        assert_eq!(url, "https://example.test/?path=%2Fx%2Fy&q=a+b%26c");
    }

    #[test]
    fn test_relative_url_is_rejected() {
        let err = compose_url("example.test/path", &HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            HttpError::InvalidUri {
                kind: InvalidUriKind::MissingScheme,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_url_is_rejected() {
        let err = compose_url("http://[::1", &params(&[("a", "b")])).unwrap_err();
        match err {
            HttpError::InvalidUri { url, kind, .. } => {
                assert_eq!(url, "http://[::1");
                assert_eq!(kind, InvalidUriKind::ParseError);
            }
            other => panic!("expected InvalidUri, got {other:?}"),
        }
    }
}
