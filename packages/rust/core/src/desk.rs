//! Session aggregate: the article collection plus everything the user does to it.
//!
//! State lives behind short `std::sync` locks that are never held across an
//! await, so a `Desk` can be shared as `Arc<Desk<B>>` between tasks.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use newsdesk_backend::Backend;
use newsdesk_shared::{
    AppConfig, Article, ArticleId, CatalogSource, DateRange, FilterState, NewsdeskError, Result,
    RunRequest, RunResult,
};

use crate::digest::Digest;
use crate::enrichment::{EnrichmentEntry, EnrichmentOrchestrator, EnrichmentTicket};
use crate::pipeline;
use crate::run::{RunController, RunOutcome, RunReceipt, View};
use crate::selection::{SelectionSet, SelectionToggle};

/// Counters for the dashboard header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeskStats {
    pub articles: usize,
    pub duplicate_groups: usize,
    pub visible: usize,
    pub selected: usize,
    pub run_sources: usize,
}

/// Options offered by the filter controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    /// Publisher names of the sources picked for the run.
    pub sources: Vec<String>,
}

#[derive(Debug, Default)]
struct DeskState {
    articles: Arc<[Article]>,
    executive_summary: String,
    filter: FilterState,
    selection: SelectionSet,
    run_sources: BTreeSet<String>,
}

pub struct Desk<B> {
    state: RwLock<DeskState>,
    runs: RunController<B>,
    enrichment: EnrichmentOrchestrator<B>,
    catalog: Vec<CatalogSource>,
    categories: Vec<String>,
    tags: Vec<String>,
}

impl<B: Backend> Desk<B> {
    pub fn new(backend: B, config: &AppConfig) -> Self {
        Self::with_backend(Arc::new(backend), config)
    }

    /// Build a desk seeded from `config`: default run sources, initial sort
    /// order and filter options.
    pub fn with_backend(backend: Arc<B>, config: &AppConfig) -> Self {
        let state = DeskState {
            filter: FilterState::new().with_sort_order(config.defaults.sort_order),
            run_sources: config.defaults.sources.iter().cloned().collect(),
            ..DeskState::default()
        };
        Self {
            state: RwLock::new(state),
            runs: RunController::new(Arc::clone(&backend)),
            enrichment: EnrichmentOrchestrator::new(backend),
            catalog: config.sources.clone(),
            categories: config.filters.categories.clone(),
            tags: config.filters.tags.clone(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DeskState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DeskState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Collection
    // -----------------------------------------------------------------------

    pub fn articles(&self) -> Arc<[Article]> {
        Arc::clone(&self.read().articles)
    }

    pub fn executive_summary(&self) -> String {
        self.read().executive_summary.clone()
    }

    pub fn article(&self, id: &ArticleId) -> Option<Article> {
        self.read().articles.iter().find(|a| &a.id == id).cloned()
    }

    /// Look up `id` and mark it pending under one read guard, so a run
    /// cannot commit between the lookup and the ticket's generation.
    fn begin_deep_summary(&self, id: &ArticleId) -> Result<(Article, EnrichmentTicket)> {
        let state = self.read();
        let article = state
            .articles
            .iter()
            .find(|a| &a.id == id)
            .cloned()
            .ok_or_else(|| NewsdeskError::validation(format!("unknown article id '{id}'")))?;
        let ticket = self.enrichment.begin(&article.id);
        Ok((article, ticket))
    }

    // -----------------------------------------------------------------------
    // Filters
    // -----------------------------------------------------------------------

    pub fn filter(&self) -> FilterState {
        self.read().filter.clone()
    }

    pub fn set_filter(&self, next: FilterState) {
        self.write().filter = next;
    }

    /// Replace the filter with `f(current)` and return the new value.
    pub fn update_filter(&self, f: impl FnOnce(&FilterState) -> FilterState) -> FilterState {
        let mut state = self.write();
        state.filter = f(&state.filter);
        state.filter.clone()
    }

    /// Reset every filter except the search text.
    pub fn clear_filters(&self) {
        self.update_filter(FilterState::cleared);
    }

    /// The display list for the current collection and filter.
    pub fn visible(&self) -> Vec<Article> {
        let state = self.read();
        pipeline::render(&state.articles, &state.filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn facets(&self) -> Facets {
        let state = self.read();
        Facets {
            categories: self.categories.clone(),
            tags: self.tags.clone(),
            sources: self
                .catalog
                .iter()
                .filter(|s| state.run_sources.contains(&s.id))
                .map(|s| s.name.clone())
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn toggle_selection(&self, id: &ArticleId) -> Result<SelectionToggle> {
        let mut state = self.write();
        if !state.articles.iter().any(|a| &a.id == id) {
            return Err(NewsdeskError::validation(format!("unknown article id '{id}'")));
        }
        let outcome = state.selection.toggle(id);
        debug!(article = %id, ?outcome, selected = state.selection.size(), "selection toggled");
        Ok(outcome)
    }

    pub fn clear_selection(&self) {
        self.write().selection.clear();
    }

    pub fn selection(&self) -> SelectionSet {
        self.read().selection.clone()
    }

    /// The digest view needs at least one selected story.
    pub fn can_open_digest(&self) -> bool {
        !self.read().selection.is_empty()
    }

    pub fn digest(&self, range: &DateRange, recipient: &str) -> Digest {
        let state = self.read();
        Digest::build(&state.articles, &state.selection, range, recipient)
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    pub fn catalog(&self) -> &[CatalogSource] {
        &self.catalog
    }

    /// Flip a catalog source in or out of the next run. Returns whether it is now included.
    pub fn toggle_run_source(&self, id: &str) -> Result<bool> {
        if !self.catalog.iter().any(|s| s.id == id) {
            return Err(NewsdeskError::validation(format!("unknown source '{id}'")));
        }
        let mut state = self.write();
        if state.run_sources.remove(id) {
            Ok(false)
        } else {
            state.run_sources.insert(id.to_string());
            Ok(true)
        }
    }

    /// Catalog ids picked for the next run.
    pub fn run_sources(&self) -> Vec<String> {
        self.read().run_sources.iter().cloned().collect()
    }

    pub fn is_running(&self) -> bool {
        self.runs.is_running()
    }

    /// Run ingestion with the current run sources and swap in the result.
    ///
    /// The swap replaces the collection and executive summary, empties the
    /// selection and search text, and resets enrichment. Filters other than
    /// search survive. On failure nothing changes.
    pub async fn run(&self, range: DateRange) -> Result<RunOutcome> {
        let request = RunRequest::new(range, self.run_sources());
        self.runs
            .run(&request, |receipt, result| self.commit_run(receipt, result))
            .await
    }

    fn commit_run(&self, receipt: RunReceipt, result: RunResult) -> RunOutcome {
        let duplicate_groups = result
            .articles
            .iter()
            .filter(|a| a.is_duplicate_group)
            .count();
        let outcome = RunOutcome {
            run_id: receipt.run_id,
            article_count: result.articles.len(),
            duplicate_groups,
            executive_summary: result.executive_summary.clone(),
            next_view: View::Stories,
            elapsed: receipt.elapsed,
        };

        let mut state = self.write();
        state.articles = result.articles.into();
        state.executive_summary = result.executive_summary;
        state.selection.clear();
        state.filter = state.filter.with_search("");
        // Still under the desk lock, so no reader sees new articles with old summaries.
        self.enrichment.reset();
        info!(
            run_id = %outcome.run_id,
            articles = outcome.article_count,
            duplicate_groups,
            "collection replaced"
        );
        outcome
    }

    // -----------------------------------------------------------------------
    // Enrichment
    // -----------------------------------------------------------------------

    pub fn enrichment(&self, id: &ArticleId) -> EnrichmentEntry {
        self.enrichment.entry(id)
    }

    /// Fetch a deep summary for `id` and wait for it. `Ok(None)` means a run
    /// replaced the collection before the summary arrived.
    pub async fn request_deep_summary(&self, id: &ArticleId) -> Result<Option<EnrichmentEntry>> {
        let (article, ticket) = self.begin_deep_summary(id)?;
        Ok(self.enrichment.complete(ticket, &article).await)
    }

    /// Like [`request_deep_summary`](Self::request_deep_summary) but on a
    /// background task. The entry is `Pending` before this returns.
    pub fn spawn_deep_summary(
        self: &Arc<Self>,
        id: &ArticleId,
    ) -> Result<JoinHandle<Option<EnrichmentEntry>>>
    where
        B: 'static,
    {
        let (article, ticket) = self.begin_deep_summary(id)?;
        let desk = Arc::clone(self);
        Ok(tokio::spawn(async move {
            desk.enrichment.complete(ticket, &article).await
        }))
    }

    pub fn stats(&self) -> DeskStats {
        let state = self.read();
        DeskStats {
            articles: state.articles.len(),
            duplicate_groups: state.articles.iter().filter(|a| a.is_duplicate_group).count(),
            visible: pipeline::render(&state.articles, &state.filter).len(),
            selected: state.selection.size(),
            run_sources: state.run_sources.len(),
        }
    }
}
