//! Partial-content capability probing.
//!
//! A [`RangeProbe`] issues a `HEAD` request and reads `Accept-Ranges` and
//! `Content-Length`. Probing is advisory: a server that rejects `HEAD`
//! still gets a range request, and its answer to that request is what
//! the downloader acts on.

use crate::utils::content_length::content_length;

use reqwest::header::ACCEPT_RANGES;
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Longest wait for the answer to a `HEAD` request.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// What a server told us about a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeSupport {
    /// `Some(true)` for `Accept-Ranges: bytes`, `Some(false)` for
    /// `Accept-Ranges: none`, `None` when the server did not say.
    pub accepts_ranges: Option<bool>,
    /// Total size of the resource, if announced.
    pub total_size: Option<u64>,
}

impl RangeSupport {
    /// Nothing is known about the resource.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Whether a range request is worth sending.
    pub fn may_resume(&self) -> bool {
        self.accepts_ranges != Some(false)
    }
}

/// Determines whether a resource supports partial retrieval, and its size.
#[derive(Debug, Clone)]
pub struct RangeProbe {
    client: ClientWithMiddleware,
    timeout: Duration,
}

impl RangeProbe {
    pub fn new(client: ClientWithMiddleware) -> Self {
        Self {
            client,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Give up on servers that take longer than `timeout` to answer.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `url`. Never fails: errors, stalls and non-success statuses
    /// yield [`RangeSupport::unknown`].
    pub async fn probe(&self, url: &Url) -> RangeSupport {
        let res = match timeout(self.timeout, self.client.head(url.clone()).send()).await {
            Ok(Ok(res)) => res,
            Ok(Err(e)) => {
                debug!("HEAD {} failed: {}", url, e);
                return RangeSupport::unknown();
            }
            Err(_elapsed) => {
                debug!("HEAD {} got no answer within {:?}", url, self.timeout);
                return RangeSupport::unknown();
            }
        };

        if !res.status().is_success() {
            debug!("HEAD {} answered {}", url, res.status());
            return RangeSupport::unknown();
        }

        let headers = res.headers();
        let accepts_ranges = headers
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .map(|v| !v.trim().eq_ignore_ascii_case("none"));
        let support = RangeSupport {
            accepts_ranges,
            total_size: content_length(headers),
        };
        debug!(?support, "Probed {}", url);
        support
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{create_http_client, HttpClientConfig};
    use std::time::Instant;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn probe() -> RangeProbe {
        let client = create_http_client(HttpClientConfig {
            retries: 0,
            ..HttpClientConfig::default()
        })
        .unwrap();
        RangeProbe::new(client)
    }

    #[tokio::test]
    async fn test_reads_accept_ranges() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("Accept-Ranges", "none"))
            .mount(&server)
            .await;
        let url = Url::parse(&format!("{}/pkg.whl", server.uri())).unwrap();

        let support = probe().probe(&url).await;
        assert_eq!(support.accepts_ranges, Some(false));
        assert!(!support.may_resume());
    }

    #[tokio::test]
    async fn test_stalled_head_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Accept-Ranges", "none")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let url = Url::parse(&format!("{}/pkg.whl", server.uri())).unwrap();

        let started = Instant::now();
        let support = probe()
            .with_timeout(Duration::from_millis(200))
            .probe(&url)
            .await;

        assert_eq!(support, RangeSupport::unknown());
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_may_resume() {
        assert!(RangeSupport::unknown().may_resume());
        assert!(RangeSupport {
            accepts_ranges: Some(true),
            total_size: None
        }
        .may_resume());
        assert!(!RangeSupport {
            accepts_ranges: Some(false),
            total_size: Some(10)
        }
        .may_resume());
    }
}
