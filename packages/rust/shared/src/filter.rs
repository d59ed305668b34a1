//! User-selected filter criteria as an immutable value.
//!
//! Every change goes through a `with_*` / `toggle_*` method that returns a new
//! [`FilterState`]; the old value is left intact, so callers can compare the
//! two for change detection or keep it around for undo.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{NewsdeskError, Result};

// ---------------------------------------------------------------------------
// LabelSet
// ---------------------------------------------------------------------------

/// Persistent set of string labels (categories, source names, tags).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeSet<String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this set that also contains `value`.
    pub fn with(&self, value: impl Into<String>) -> Self {
        let mut next = self.0.clone();
        next.insert(value.into());
        Self(next)
    }

    /// A copy of this set without `value`.
    pub fn without(&self, value: &str) -> Self {
        let mut next = self.0.clone();
        next.remove(value);
        Self(next)
    }

    /// `without` if present, `with` otherwise.
    pub fn toggled(&self, value: &str) -> Self {
        if self.contains(value) {
            self.without(value)
        } else {
            self.with(value)
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// SortOrder
// ---------------------------------------------------------------------------

/// Ordering of the displayed list by publication time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Newest => f.write_str("newest"),
            Self::Oldest => f.write_str("oldest"),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = NewsdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            other => Err(NewsdeskError::validation(format!(
                "unknown sort order '{other}': expected 'newest' or 'oldest'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// FilterState
// ---------------------------------------------------------------------------

/// Everything the user has chosen to narrow or reorder the story list.
///
/// `only_duplicates` and `only_unique` are independent switches. Turning both
/// on is allowed and simply leaves nothing to show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub search_text: String,
    pub categories: LabelSet,
    /// Publisher names, matched against `Article::source`.
    pub sources: LabelSet,
    pub tags: LabelSet,
    pub only_duplicates: bool,
    pub only_unique: bool,
    pub only_top_ranked: bool,
    pub sort_order: SortOrder,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(&self, text: impl Into<String>) -> Self {
        Self {
            search_text: text.into(),
            ..self.clone()
        }
    }

    pub fn toggle_category(&self, category: &str) -> Self {
        Self {
            categories: self.categories.toggled(category),
            ..self.clone()
        }
    }

    pub fn toggle_source(&self, source: &str) -> Self {
        Self {
            sources: self.sources.toggled(source),
            ..self.clone()
        }
    }

    pub fn toggle_tag(&self, tag: &str) -> Self {
        Self {
            tags: self.tags.toggled(tag),
            ..self.clone()
        }
    }

    pub fn with_only_duplicates(&self, on: bool) -> Self {
        Self {
            only_duplicates: on,
            ..self.clone()
        }
    }

    pub fn with_only_unique(&self, on: bool) -> Self {
        Self {
            only_unique: on,
            ..self.clone()
        }
    }

    pub fn with_only_top_ranked(&self, on: bool) -> Self {
        Self {
            only_top_ranked: on,
            ..self.clone()
        }
    }

    pub fn with_sort_order(&self, sort_order: SortOrder) -> Self {
        Self {
            sort_order,
            ..self.clone()
        }
    }

    /// Drop every criterion except the search text, which has its own
    /// clear control.
    pub fn cleared(&self) -> Self {
        Self {
            search_text: self.search_text.clone(),
            ..Self::default()
        }
    }

    /// The search needle as the pipeline uses it: trimmed and lowercased.
    pub fn search_needle(&self) -> Option<String> {
        let needle = self.search_text.trim().to_lowercase();
        (!needle.is_empty()).then_some(needle)
    }
}
