//! Scripted in-memory backend and fixtures for orchestration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use tokio::sync::Notify;

use newsdesk_backend::{Backend, HealthStatus};
use newsdesk_shared::{Article, DateRange, NewsdeskError, Result, RunRequest, RunResult};

enum SummaryReply {
    Text(String),
    Empty,
    Fail,
}

/// Replies are queued per call. Gated calls park on a [`Notify`] until the
/// test releases them with `notify_one`.
#[derive(Default)]
pub(crate) struct FakeBackend {
    runs: Mutex<VecDeque<Option<RunResult>>>,
    run_gate: Mutex<Option<Arc<Notify>>>,
    run_calls: AtomicUsize,
    summaries: Mutex<HashMap<String, VecDeque<SummaryReply>>>,
    summary_gates: Mutex<HashMap<String, Arc<Notify>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_run(self, result: RunResult) -> Self {
        lock(&self.runs).push_back(Some(result));
        self
    }

    pub(crate) fn with_failed_run(self) -> Self {
        lock(&self.runs).push_back(None);
        self
    }

    fn push_summary(self, url: &str, reply: SummaryReply) -> Self {
        lock(&self.summaries)
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn with_summary(self, url: &str, text: &str) -> Self {
        self.push_summary(url, SummaryReply::Text(text.to_string()))
    }

    pub(crate) fn with_empty_summary(self, url: &str) -> Self {
        self.push_summary(url, SummaryReply::Empty)
    }

    pub(crate) fn with_failed_summary(self, url: &str) -> Self {
        self.push_summary(url, SummaryReply::Fail)
    }

    /// Hold every run until the returned gate is notified.
    pub(crate) fn gate_runs(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.run_gate) = Some(Arc::clone(&gate));
        gate
    }

    /// Hold deep summaries for `url` until the returned gate is notified.
    pub(crate) fn gate_summary(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        lock(&self.summary_gates).insert(url.to_string(), Arc::clone(&gate));
        gate
    }

    pub(crate) fn run_calls(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }
}

impl Backend for FakeBackend {
    async fn run_ingestion(&self, _request: &RunRequest) -> Result<RunResult> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        let gate = lock(&self.run_gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let next = lock(&self.runs).pop_front();
        match next {
            Some(Some(result)) => Ok(result),
            _ => Err(NewsdeskError::Network("connection refused".into())),
        }
    }

    async fn deep_summary(&self, _title: &str, url: &str) -> Result<Option<String>> {
        let gate = lock(&self.summary_gates).get(url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let next = lock(&self.summaries).get_mut(url).and_then(VecDeque::pop_front);
        match next {
            Some(SummaryReply::Text(text)) => Ok(Some(text)),
            Some(SummaryReply::Empty) => Ok(None),
            Some(SummaryReply::Fail) | None => Err(NewsdeskError::backend(Some(500), "boom")),
        }
    }

    async fn health(&self) -> Result<HealthStatus> {
        Ok(HealthStatus {
            status: "ok".into(),
            message: "fake backend".into(),
        })
    }
}

/// 13 Feb 2026 00:00 to 14 Feb 2026 23:59:59 UTC.
pub(crate) fn range() -> DateRange {
    let from = NaiveDate::from_ymd_opt(2026, 2, 13).expect("valid date");
    let to = NaiveDate::from_ymd_opt(2026, 2, 14).expect("valid date");
    DateRange::days(from, to).expect("ordered range")
}

/// Article published `minutes` after the start of [`range`].
pub(crate) fn article_at(id: &str, minutes: i64) -> Article {
    let base = Utc.with_ymd_and_hms(2026, 2, 13, 0, 0, 0).unwrap();
    Article::new(id, format!("Story {id}"), "BBC").with_published_at(base + Duration::minutes(minutes))
}

pub(crate) fn ids(list: &[&Article]) -> Vec<String> {
    list.iter().map(|a| a.id.to_string()).collect()
}
