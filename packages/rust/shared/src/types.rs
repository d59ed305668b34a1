//! Core domain types: articles, run requests/results, and the source catalog.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{NewsdeskError, Result};

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// Stable identifier of an article within one run's collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub String);

impl ArticleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ArticleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// One ingested news item, as produced by a run.
///
/// Field names follow the backend's camelCase wire format. Fields the backend
/// omits (or sends as `null`) fall back to empty values rather than failing
/// the whole run. A missing id is filled from the url when the article
/// arrives inside a [`RunResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: ArticleId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Publisher name (e.g. "BBC"), not the catalog source id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    /// `None` when the feed gave no date or one we could not parse.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// Number of sources reporting the same story; never below 1.
    #[serde(default = "single_coverage", deserialize_with = "coverage_count")]
    pub coverage_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_duplicate_group: bool,
}

impl Article {
    /// Minimal article with a single source and no metadata.
    pub fn new(id: impl Into<ArticleId>, title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source: source.into(),
            published_at: None,
            category: None,
            tags: Vec::new(),
            summary: String::new(),
            url: String::new(),
            coverage_count: 1,
            is_duplicate_group: false,
        }
    }

    pub fn with_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Mark this article as the head of a duplicate group of `coverage` sources.
    pub fn with_duplicate_group(mut self, coverage: u32) -> Self {
        self.coverage_count = coverage.max(1);
        self.is_duplicate_group = true;
        self
    }

    /// Whether the article carries the given tag (exact match).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

fn single_coverage() -> u32 {
    1
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn coverage_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?.unwrap_or(1);
    Ok(raw.clamp(1, i64::from(u32::MAX)) as u32)
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Parse a feed timestamp: RFC 3339 (NewsAPI) or RFC 2822 (RSS).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Inclusive publication window for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// Build a range, rejecting one that ends before it starts.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(NewsdeskError::validation(format!(
                "date range starts after it ends ({from} > {to})"
            )));
        }
        Ok(Self { from, to })
    }

    /// From midnight UTC of `from` to the last second of `to`.
    pub fn days(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        let start = from.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
        let end = to.and_hms_opt(23, 59, 59).map(|d| d.and_utc());
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(NewsdeskError::validation("invalid calendar date")),
        }
    }

    /// Midnight UTC today until now.
    pub fn today() -> Self {
        let now = Utc::now();
        let from = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc())
            .unwrap_or(now);
        Self { from, to: now }
    }
}

/// Request body for the run-ingestion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    /// Catalog source ids (e.g. "bbc"), not publisher names.
    pub sources: Vec<String>,
}

impl RunRequest {
    pub fn new(range: DateRange, sources: impl IntoIterator<Item = String>) -> Self {
        Self {
            from_date: range.from,
            to_date: range.to,
            sources: sources.into_iter().collect(),
        }
    }
}

/// Output of one completed run. Absent fields decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub executive_summary: String,
    #[serde(default, deserialize_with = "keyed_articles")]
    pub articles: Vec<Article>,
}

/// Articles without an id take their url as id; articles with neither are dropped.
fn keyed_articles<'de, D>(deserializer: D) -> std::result::Result<Vec<Article>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Article> = null_as_default(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|mut article| {
            if article.id.is_empty() {
                if article.url.is_empty() {
                    tracing::warn!(title = %article.title, "dropping article without id or url");
                    return None;
                }
                article.id = ArticleId(article.url.clone());
            }
            Some(article)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Source catalog
// ---------------------------------------------------------------------------

/// How the backend ingests a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "rss")]
    Rss,
    #[serde(rename = "newsapi")]
    NewsApi,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rss => f.write_str("RSS"),
            Self::NewsApi => f.write_str("NewsAPI"),
        }
    }
}

/// Last known health of a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    #[default]
    Working,
    Slow,
    Failed,
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Working => f.write_str("working"),
            Self::Slow => f.write_str("slow"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// `[[sources]]` entry: a source the user can include in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSource {
    /// Identifier sent to the backend.
    pub id: String,
    /// Publisher name as it appears on articles.
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub status: SourceStatus,
}

impl CatalogSource {
    pub fn new(id: &str, name: &str, kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            status: SourceStatus::Working,
        }
    }
}
