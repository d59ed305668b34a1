//! Session logic for Newsdesk.
//!
//! Ties the backend client to the user's working state: the filter/sort
//! [`pipeline`], the top-stories [`selection`], single-flight [`run`]s,
//! per-article deep-summary [`enrichment`], and the [`digest`]. [`Desk`]
//! aggregates all of it for a frontend.

pub mod desk;
pub mod digest;
pub mod enrichment;
pub mod pipeline;
pub mod run;
pub mod selection;

#[cfg(test)]
mod test_support;

pub use desk::{Desk, DeskStats, Facets};
pub use digest::Digest;
pub use enrichment::{
    BACKEND_ERROR_MESSAGE, EnrichmentEntry, EnrichmentOrchestrator, EnrichmentState,
    EnrichmentTicket, NO_SUMMARY_MESSAGE,
};
pub use pipeline::{STAGES, Stage, TOP_RANKED_LIMIT, render};
pub use run::{RunController, RunOutcome, RunReceipt, View};
pub use selection::{SelectionSet, SelectionToggle, TOP_STORIES_LIMIT};
