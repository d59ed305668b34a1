//! Single-flight ingestion runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use uuid::Uuid;

use newsdesk_backend::Backend;
use newsdesk_shared::{NewsdeskError, Result, RunRequest, RunResult};

/// Which screen the desk should show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Sources,
    Stories,
}

/// Identifies a run in logs and in its [`RunOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReceipt {
    pub run_id: Uuid,
    pub elapsed: Duration,
}

/// Summary of a committed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub article_count: usize,
    pub duplicate_groups: usize,
    pub executive_summary: String,
    pub next_view: View,
    pub elapsed: Duration,
}

/// Releases the in-flight flag when dropped, whatever path the run took.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RunController<B> {
    backend: Arc<B>,
    in_flight: AtomicBool,
}

impl<B: Backend> RunController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one ingestion. On success `commit` receives the result while the
    /// in-flight flag is still held, so no second run can interleave with
    /// the state swap. On failure `commit` is never called.
    #[instrument(skip_all, fields(sources = request.sources.len()))]
    pub async fn run<T, F>(&self, request: &RunRequest, commit: F) -> Result<T>
    where
        F: FnOnce(RunReceipt, RunResult) -> T + Send,
    {
        validate(request)?;
        let _guard = InFlight::acquire(&self.in_flight).ok_or(NewsdeskError::RunInFlight)?;

        let run_id = Uuid::now_v7();
        let started = Instant::now();
        info!(
            %run_id,
            from = %request.from_date,
            to = %request.to_date,
            sources = ?request.sources,
            "run started"
        );

        match self.backend.run_ingestion(request).await {
            Ok(result) => {
                let elapsed = started.elapsed();
                info!(
                    %run_id,
                    articles = result.articles.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "run complete"
                );
                Ok(commit(RunReceipt { run_id, elapsed }, result))
            }
            Err(e) => {
                warn!(%run_id, error = %e, "run failed, previous results kept");
                Err(e)
            }
        }
    }
}

fn validate(request: &RunRequest) -> Result<()> {
    if request.sources.is_empty() {
        return Err(NewsdeskError::validation("select at least one source"));
    }
    if request.from_date > request.to_date {
        return Err(NewsdeskError::validation(format!(
            "range start {} is after range end {}",
            request.from_date, request.to_date
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBackend, range};
    use newsdesk_shared::Article;

    fn request(sources: &[&str]) -> RunRequest {
        RunRequest::new(range(), sources.iter().map(|s| s.to_string()))
    }

    fn result_with(ids: &[&str]) -> RunResult {
        RunResult {
            executive_summary: "Summary".into(),
            articles: ids.iter().map(|id| Article::new(*id, "t", "BBC")).collect(),
        }
    }

    #[tokio::test]
    async fn commit_receives_result() {
        let backend = Arc::new(FakeBackend::new().with_run(result_with(&["a1", "a2"])));
        let runs = RunController::new(Arc::clone(&backend));

        let count = runs
            .run(&request(&["bbc"]), |_, result| result.articles.len())
            .await
            .expect("run");

        assert_eq!(count, 2);
        assert!(!runs.is_running());
        assert_eq!(backend.run_calls(), 1);
    }

    #[tokio::test]
    async fn empty_sources_rejected_without_backend_call() {
        let backend = Arc::new(FakeBackend::new());
        let runs = RunController::new(Arc::clone(&backend));

        let err = runs.run(&request(&[]), |_, _| ()).await.unwrap_err();
        assert!(matches!(err, NewsdeskError::Validation { .. }));
        assert_eq!(backend.run_calls(), 0);
    }

    #[tokio::test]
    async fn inverted_range_rejected() {
        let backend = Arc::new(FakeBackend::new());
        let runs = RunController::new(Arc::clone(&backend));
        let mut req = request(&["bbc"]);
        std::mem::swap(&mut req.from_date, &mut req.to_date);

        let err = runs.run(&req, |_, _| ()).await.unwrap_err();
        assert!(matches!(err, NewsdeskError::Validation { .. }));
        assert_eq!(backend.run_calls(), 0);
    }

    #[tokio::test]
    async fn failure_skips_commit_and_clears_flag() {
        let backend = Arc::new(FakeBackend::new().with_failed_run());
        let runs = RunController::new(backend);
        let mut committed = false;

        let err = runs
            .run(&request(&["bbc"]), |_, _| committed = true)
            .await
            .unwrap_err();

        assert!(matches!(err, NewsdeskError::Network(_)));
        assert!(!committed);
        assert!(!runs.is_running());
    }

    #[tokio::test]
    async fn second_run_while_in_flight_is_rejected() {
        let backend = FakeBackend::new().with_run(result_with(&["a1"]));
        let gate = backend.gate_runs();
        let backend = Arc::new(backend);
        let runs = Arc::new(RunController::new(Arc::clone(&backend)));

        let first = tokio::spawn({
            let runs = Arc::clone(&runs);
            async move { runs.run(&request(&["bbc"]), |_, r| r.articles.len()).await }
        });
        while !runs.is_running() {
            tokio::task::yield_now().await;
        }

        let err = runs.run(&request(&["bbc"]), |_, _| 0).await.unwrap_err();
        assert!(matches!(err, NewsdeskError::RunInFlight));

        gate.notify_one();
        assert_eq!(first.await.expect("task panicked").expect("run"), 1);
        assert!(!runs.is_running());
        assert_eq!(backend.run_calls(), 1);
    }
}
