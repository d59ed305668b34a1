//! Deep-summary orchestrator.
//!
//! Tracks one [`EnrichmentEntry`] per article. Requests for different
//! articles run independently; each completion writes only its own entry.
//! A [`reset`](EnrichmentOrchestrator::reset) (issued when a run replaces
//! the collection) bumps a generation counter so that completions started
//! against the old collection are dropped instead of resurrecting entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument, warn};

use newsdesk_backend::Backend;
use newsdesk_shared::{Article, ArticleId};

/// Stored when the backend answers with an empty summary.
pub const NO_SUMMARY_MESSAGE: &str = "No summary generated.";

/// Stored when the deep-summary call fails.
pub const BACKEND_ERROR_MESSAGE: &str = "Backend error while generating summary.";

/// The backend reports unreadable pages inside an otherwise normal summary.
const EXTRACTION_WARNING_MARKER: &str = "could not extract";

// ---------------------------------------------------------------------------
// Entry types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EnrichmentState {
    #[default]
    Idle,
    Pending,
    Done,
    Error,
}

/// Per-article enrichment record.
///
/// A `Pending` entry keeps the text of a previous completion until the new
/// one lands; completion overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentEntry {
    pub state: EnrichmentState,
    pub result: Option<String>,
}

impl EnrichmentEntry {
    fn done(text: impl Into<String>) -> Self {
        Self {
            state: EnrichmentState::Done,
            result: Some(text.into()),
        }
    }

    fn failed() -> Self {
        Self {
            state: EnrichmentState::Error,
            result: Some(BACKEND_ERROR_MESSAGE.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == EnrichmentState::Pending
    }

    /// True when the summary text says the article body could not be read.
    pub fn is_extraction_warning(&self) -> bool {
        self.result
            .as_deref()
            .is_some_and(|r| r.to_lowercase().contains(EXTRACTION_WARNING_MARKER))
    }
}

/// Handle for a started request. Carries the generation it was started in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentTicket {
    id: ArticleId,
    generation: u64,
}

impl EnrichmentTicket {
    pub fn id(&self) -> &ArticleId {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Ledger {
    generation: u64,
    entries: HashMap<ArticleId, EnrichmentEntry>,
}

pub struct EnrichmentOrchestrator<B> {
    backend: Arc<B>,
    ledger: Mutex<Ledger>,
}

impl<B: Backend> EnrichmentOrchestrator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `id` pending and return a ticket for the matching [`complete`](Self::complete).
    pub fn begin(&self, id: &ArticleId) -> EnrichmentTicket {
        let mut ledger = self.ledger();
        ledger.entries.entry(id.clone()).or_default().state = EnrichmentState::Pending;
        EnrichmentTicket {
            id: id.clone(),
            generation: ledger.generation,
        }
    }

    /// Call the backend and record the outcome under the ticket's article.
    ///
    /// Returns `None` when the collection was replaced while the call was in
    /// flight; the outcome is discarded in that case.
    #[instrument(skip_all, fields(article = %ticket.id))]
    pub async fn complete(
        &self,
        ticket: EnrichmentTicket,
        article: &Article,
    ) -> Option<EnrichmentEntry> {
        let entry = match self.backend.deep_summary(&article.title, &article.url).await {
            Ok(Some(text)) => EnrichmentEntry::done(text),
            Ok(None) => EnrichmentEntry::done(NO_SUMMARY_MESSAGE),
            Err(e) => {
                warn!(error = %e, "deep summary failed");
                EnrichmentEntry::failed()
            }
        };

        let mut ledger = self.ledger();
        if ledger.generation != ticket.generation {
            debug!(
                started = ticket.generation,
                current = ledger.generation,
                "discarding deep summary for a replaced collection"
            );
            return None;
        }
        info!(state = ?entry.state, "deep summary recorded");
        ledger.entries.insert(ticket.id, entry.clone());
        Some(entry)
    }

    /// [`begin`](Self::begin) followed by [`complete`](Self::complete).
    pub async fn request(&self, article: &Article) -> Option<EnrichmentEntry> {
        let ticket = self.begin(&article.id);
        self.complete(ticket, article).await
    }

    /// Current entry for `id`; `Idle` when never requested.
    pub fn entry(&self, id: &ArticleId) -> EnrichmentEntry {
        self.ledger().entries.get(id).cloned().unwrap_or_default()
    }

    pub fn is_loading(&self, id: &ArticleId) -> bool {
        self.entry(id).is_loading()
    }

    pub fn pending_count(&self) -> usize {
        self.ledger()
            .entries
            .values()
            .filter(|e| e.is_loading())
            .count()
    }

    pub fn snapshot(&self) -> HashMap<ArticleId, EnrichmentEntry> {
        self.ledger().entries.clone()
    }

    /// Drop every entry and invalidate outstanding requests.
    pub fn reset(&self) {
        let mut ledger = self.ledger();
        ledger.entries.clear();
        ledger.generation += 1;
        debug!(generation = ledger.generation, "enrichment state reset");
    }
}
