//! Client for the ingestion / summarization backend.
//!
//! The curation engine never talks HTTP directly: it consumes the [`Backend`]
//! trait, and [`HttpBackend`] is the JSON-over-HTTP implementation used by the
//! CLI. Host and port always come from configuration.

use std::future::Future;
use std::time::Duration;

use newsdesk_shared::{AppConfig, NewsdeskError, Result, RunRequest, RunResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

/// Path of the run-ingestion endpoint, relative to the base URL.
const RUN_PATH: &str = "agent/run";

/// Path of the deep-summary endpoint, relative to the base URL.
const DEEP_SUMMARY_PATH: &str = "agent/deep-summary-url";

/// User-Agent string for backend requests.
const USER_AGENT: &str = concat!("Newsdesk/", env!("CARGO_PKG_VERSION"));

/// How much of an error body we keep in error messages.
const ERROR_BODY_LIMIT: usize = 200;

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// The two calls the curation engine makes, plus a liveness probe.
pub trait Backend: Send + Sync {
    /// Fetch, deduplicate, rank and summarize articles for a date range and
    /// source set.
    fn run_ingestion(&self, request: &RunRequest)
    -> impl Future<Output = Result<RunResult>> + Send;

    /// Produce an expanded summary for one article.
    ///
    /// `Ok(None)` means the service answered but generated nothing, which is
    /// not the same as a transport failure.
    fn deep_summary(
        &self,
        title: &str,
        url: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Check that the backend is reachable.
    fn health(&self) -> impl Future<Output = Result<HealthStatus>> + Send;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Request body for the deep-summary call.
#[derive(Debug, Clone, Serialize)]
pub struct DeepSummaryRequest<'a> {
    pub title: &'a str,
    pub url: &'a str,
}

#[derive(Debug, Deserialize)]
struct DeepSummaryResponse {
    #[serde(default)]
    deep_summary: Option<String>,
}

/// Response of the health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub base_url: Url,
    pub run_timeout: Duration,
    pub summary_timeout: Duration,
}

impl BackendOptions {
    /// Options from the `[backend]` config section.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.backend_url()?,
            run_timeout: Duration::from_secs(config.backend.run_timeout_secs),
            summary_timeout: Duration::from_secs(config.backend.summary_timeout_secs),
        })
    }
}

/// [`Backend`] over JSON/HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    run_timeout: Duration,
    summary_timeout: Duration,
}

impl HttpBackend {
    pub fn new(opts: BackendOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NewsdeskError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base: with_trailing_slash(opts.base_url),
            run_timeout: opts.run_timeout,
            summary_timeout: opts.summary_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| NewsdeskError::config(format!("cannot build URL for '{path}': {e}")))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, timeout: Duration) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .post(url.clone())
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| NewsdeskError::Network(format!("{url}: {e}")))?;

        decode(&url, response).await
    }
}

impl Backend for HttpBackend {
    #[instrument(skip_all, fields(sources = request.sources.len()))]
    async fn run_ingestion(&self, request: &RunRequest) -> Result<RunResult> {
        let result: RunResult = self.post_json(RUN_PATH, request, self.run_timeout).await?;
        debug!(articles = result.articles.len(), "run response decoded");
        Ok(result)
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn deep_summary(&self, title: &str, url: &str) -> Result<Option<String>> {
        let body = DeepSummaryRequest { title, url };
        let response: DeepSummaryResponse = self
            .post_json(DEEP_SUMMARY_PATH, &body, self.summary_timeout)
            .await?;
        Ok(response.deep_summary.filter(|s| !s.trim().is_empty()))
    }

    async fn health(&self) -> Result<HealthStatus> {
        let url = self.base.clone();
        let response = self
            .client
            .get(url.clone())
            .timeout(self.summary_timeout)
            .send()
            .await
            .map_err(|e| NewsdeskError::Network(format!("{url}: {e}")))?;
        decode(&url, response).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Check the status and decode a JSON body.
async fn decode<T: DeserializeOwned>(url: &Url, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| NewsdeskError::Network(format!("{url}: failed to read body: {e}")))?;

    if !status.is_success() {
        return Err(NewsdeskError::backend(
            Some(status.as_u16()),
            format!("{url}: {}", truncate(&body, ERROR_BODY_LIMIT)),
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        NewsdeskError::backend(
            Some(status.as_u16()),
            format!("{url}: invalid response body: {e}"),
        )
    })
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use newsdesk_shared::DateRange;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> HttpBackend {
        HttpBackend::new(BackendOptions {
            base_url: Url::parse(&server.uri()).unwrap(),
            run_timeout: Duration::from_secs(5),
            summary_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn sample_request() -> RunRequest {
        let range = DateRange::days(
            NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
        )
        .unwrap();
        RunRequest::new(range, vec!["bbc".to_string(), "reuters".to_string()])
    }

    #[test]
    fn trailing_slash_is_added_once() {
        let url = with_trailing_slash(Url::parse("http://localhost:8000/api").unwrap());
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
        let url = with_trailing_slash(url);
        assert_eq!(url.join(RUN_PATH).unwrap().as_str(), "http://localhost:8000/api/agent/run");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 100), "short");
    }

    #[tokio::test]
    async fn run_posts_request_and_decodes_result() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/agent/run"))
            .and(body_json(serde_json::json!({
                "fromDate": "2026-02-13T00:00:00Z",
                "toDate": "2026-02-13T23:59:59Z",
                "sources": ["bbc", "reuters"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "executive_summary": "Markets rallied.",
                "articles": [
                    {"id": "a1", "title": "Markets rally", "source": "Reuters",
                     "publishedAt": "2026-02-13T09:10:00Z", "coverageCount": 3,
                     "isDuplicateGroup": true, "category": "Business"},
                    {"id": "a2", "title": "AI rules", "source": "BBC",
                     "publishedAt": "Fri, 13 Feb 2026 12:40:00 GMT"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = backend_for(&server)
            .run_ingestion(&sample_request())
            .await
            .unwrap();

        assert_eq!(result.executive_summary, "Markets rallied.");
        assert_eq!(result.articles.len(), 2);
        assert!(result.articles[0].is_duplicate_group);
        assert!(result.articles[1].published_at.is_some());
    }

    #[tokio::test]
    async fn run_with_empty_body_yields_empty_result() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/agent/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let result = backend_for(&server)
            .run_ingestion(&sample_request())
            .await
            .unwrap();
        assert!(result.executive_summary.is_empty());
        assert!(result.articles.is_empty());
    }

    #[tokio::test]
    async fn run_server_error_is_backend_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/agent/run"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .run_ingestion(&sample_request())
            .await
            .unwrap_err();
        match err {
            NewsdeskError::Backend { status, message } => {
                assert_eq!(status, Some(500));
                assert!(message.contains("Internal Server Error"));
            }
            other => panic!("expected Backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_backend_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/agent/run"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .run_ingestion(&sample_request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid response body"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let backend = HttpBackend::new(BackendOptions {
            base_url: Url::parse("http://127.0.0.1:9").unwrap(),
            run_timeout: Duration::from_secs(2),
            summary_timeout: Duration::from_secs(2),
        })
        .unwrap();

        let err = backend.deep_summary("t", "https://example.com").await.unwrap_err();
        assert!(matches!(err, NewsdeskError::Network(_)));
    }

    #[tokio::test]
    async fn deep_summary_returns_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/agent/deep-summary-url"))
            .and(body_json(serde_json::json!({
                "title": "AI rules",
                "url": "https://example.com/2",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "deep_summary": "Governments align on AI rules."
            })))
            .mount(&server)
            .await;

        let summary = backend_for(&server)
            .deep_summary("AI rules", "https://example.com/2")
            .await
            .unwrap();
        assert_eq!(summary.as_deref(), Some("Governments align on AI rules."));
    }

    #[tokio::test]
    async fn deep_summary_absent_or_empty_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/agent/deep-summary-url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "deep_summary": ""
            })))
            .mount(&server)
            .await;

        let summary = backend_for(&server)
            .deep_summary("t", "https://example.com")
            .await
            .unwrap();
        assert!(summary.is_none());
    }

    #[tokio::test]
    async fn health_reports_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "message": "Backend is running"
            })))
            .mount(&server)
            .await;

        let health = backend_for(&server).health().await.unwrap();
        assert!(health.is_ok());
        assert_eq!(health.message, "Backend is running");
    }
}
