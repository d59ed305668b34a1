//! Shared types, error model, and configuration for Newsdesk.
//!
//! This crate is the foundation depended on by all other Newsdesk crates.
//! It provides:
//! - [`NewsdeskError`], the unified error type
//! - Domain types ([`Article`], [`RunRequest`], [`RunResult`], [`CatalogSource`])
//! - The immutable [`FilterState`] value
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod filter;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BackendConfig, DefaultsConfig, DigestConfig, FiltersConfig, config_dir,
    config_file_path, default_catalog, init_config, load_config, load_config_from,
};
pub use error::{NewsdeskError, Result};
pub use filter::{FilterState, LabelSet, SortOrder};
pub use types::{
    Article, ArticleId, CatalogSource, DateRange, RunRequest, RunResult, SourceKind, SourceStatus,
    parse_timestamp,
};
