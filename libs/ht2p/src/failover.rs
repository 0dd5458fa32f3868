use crate::error::HttpError;
use crate::request::{RequestConfig, normalize};
use crate::response::Response;
use crate::transport::Transport;

/// Try each candidate URL in order until one succeeds.
///
/// Every attempt runs `config` with its URL replaced, through normalization
/// and `transport`. A candidate that fails normalization counts as a failed
/// attempt like any transport or status error.
///
/// Returns the first successful response together with the errors of the
/// candidates tried before it, or `None` and one error per candidate (in
/// candidate order) when all of them fail. An empty candidate list yields
/// `(None, vec![])`.
pub async fn execute_any<U: AsRef<str>>(
    transport: &dyn Transport,
    config: &RequestConfig,
    urls: &[U],
) -> (Option<Response>, Vec<HttpError>) {
    let mut errors = Vec::with_capacity(urls.len());

    for (candidate, url) in urls.iter().enumerate() {
        let url = url.as_ref();
        let attempt = match normalize(&config.with_url(url)) {
            Ok(request) => transport.execute(&request).await,
            Err(e) => Err(e),
        };

        match attempt {
            Ok(response) => {
                if candidate > 0 {
                    tracing::debug!(candidate, url, "failover candidate succeeded");
                }
                return (Some(response), errors);
            }
            Err(e) => {
                tracing::warn!(
                    candidate,
                    url,
                    transport = transport.name(),
                    error = %e,
                    "failover candidate failed"
                );
                errors.push(e);
            }
        }
    }

    (None, errors)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::request::ResolvedRequest;
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Answers 200 for hosts listed in `healthy`, times out for the rest
    struct FakeTransport {
        healthy: Vec<&'static str>,
        seen: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn new(healthy: Vec<&'static str>) -> Self {
            Self {
                healthy,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn execute(&self, request: &ResolvedRequest) -> Result<Response, HttpError> {
            let host = request.uri().host().unwrap_or_default().to_owned();
            self.seen.lock().push(host.clone());
            if self.healthy.contains(&host.as_str()) {
                Ok(Response::new(
                    StatusCode::OK,
                    HeaderMap::new(),
                    Bytes::from(host),
                ))
            } else {
                Err(HttpError::Timeout(Duration::from_secs(1)))
            }
        }
    }

    fn config() -> RequestConfig {
        RequestConfig::get("https://placeholder.test/").query("q", "1")
    }

    #[tokio::test]
    async fn test_first_candidate_succeeds() {
        let transport = FakeTransport::new(vec!["a.test", "b.test"]);
        let (response, errors) =
            execute_any(&transport, &config(), &["https://a.test/", "https://b.test/"]).await;

        assert_eq!(response.unwrap().text(), "a.test");
        assert!(errors.is_empty());
        assert_eq!(*transport.seen.lock(), vec!["a.test"]);
    }

    #[tokio::test]
    async fn test_later_candidate_succeeds_with_prior_errors() {
        let transport = FakeTransport::new(vec!["c.test"]);
        let urls = ["https://a.test/", "https://b.test/", "https://c.test/", "https://d.test/"];
        let (response, errors) = execute_any(&transport, &config(), &urls).await;

        assert_eq!(response.unwrap().text(), "c.test");
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, HttpError::Timeout(_))));
        // d.test is never tried
        assert_eq!(*transport.seen.lock(), vec!["a.test", "b.test", "c.test"]);
    }

    #[tokio::test]
    async fn test_all_candidates_fail_in_order() {
        let transport = FakeTransport::new(vec![]);
        let urls = vec![
            "https://a.test/".to_owned(),
            "::not a url::".to_owned(),
            "https://c.test/".to_owned(),
        ];
        let (response, errors) = execute_any(&transport, &config(), &urls).await;

        assert!(response.is_none());
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], HttpError::Timeout(_)));
        assert!(matches!(errors[1], HttpError::InvalidUri { .. }));
        assert!(matches!(errors[2], HttpError::Timeout(_)));
        assert_eq!(*transport.seen.lock(), vec!["a.test", "c.test"]);
    }

    #[tokio::test]
    async fn test_candidate_keeps_query_from_config() {
        struct QueryEcho;

        #[async_trait]
        impl Transport for QueryEcho {
            fn name(&self) -> &'static str {
                "echo"
            }

            async fn execute(&self, request: &ResolvedRequest) -> Result<Response, HttpError> {
                let query = request.uri().query().unwrap_or_default().to_owned();
                Ok(Response::new(StatusCode::OK, HeaderMap::new(), Bytes::from(query)))
            }
        }

        let (response, errors) = execute_any(&QueryEcho, &config(), &["https://a.test/x"]).await;
        assert!(errors.is_empty());
        assert_eq!(response.unwrap().text(), "q=1");
    }

    #[tokio::test]
    async fn test_warns_once_per_failed_candidate() {
        use std::sync::Arc;
        use tracing_subscriber::layer::SubscriberExt;

        #[derive(Clone, Default)]
        struct WarnCounter(Arc<Mutex<usize>>);

        impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
            fn on_event(
                &self,
                event: &tracing::Event<'_>,
                _ctx: tracing_subscriber::layer::Context<'_, S>,
            ) {
                if *event.metadata().level() == tracing::Level::WARN {
                    *self.0.lock() += 1;
                }
            }
        }

        let counter = WarnCounter::default();
        let warnings = counter.0.clone();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(counter));

        let transport = FakeTransport::new(vec!["c.test"]);
        let urls = ["https://a.test/", "https://b.test/", "https://c.test/"];
        let (response, _) = execute_any(&transport, &config(), &urls).await;

        assert!(response.is_some());
        assert_eq!(*warnings.lock(), 2);
    }

    #[tokio::test]
    async fn test_empty_candidate_list() {
        let transport = FakeTransport::new(vec!["a.test"]);
        let urls: [&str; 0] = [];
        let (response, errors) = execute_any(&transport, &config(), &urls).await;

        assert!(response.is_none());
        assert!(errors.is_empty());
    }
}
