//! Top-stories selection for the digest.

use std::collections::BTreeSet;

use newsdesk_shared::{Article, ArticleId};

/// Maximum number of stories a digest can carry.
pub const TOP_STORIES_LIMIT: usize = 5;

/// What a [`SelectionSet::toggle`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionToggle {
    Added,
    Removed,
    /// The set was full; the request was dropped.
    Ignored,
}

/// Bounded set of selected article ids. Never holds more than
/// [`TOP_STORIES_LIMIT`] members: the cap is checked on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<ArticleId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `id` if selected, otherwise add it if there is room.
    pub fn toggle(&mut self, id: &ArticleId) -> SelectionToggle {
        if self.ids.remove(id) {
            SelectionToggle::Removed
        } else if self.ids.len() < TOP_STORIES_LIMIT {
            self.ids.insert(id.clone());
            SelectionToggle::Added
        } else {
            SelectionToggle::Ignored
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &ArticleId) -> bool {
        self.ids.contains(id)
    }

    pub fn size(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ids.len() >= TOP_STORIES_LIMIT
    }

    pub fn ids(&self) -> impl Iterator<Item = &ArticleId> {
        self.ids.iter()
    }

    /// Selected articles still present in `articles`, in collection order.
    pub fn pick<'a>(&self, articles: &'a [Article]) -> Vec<&'a Article> {
        articles.iter().filter(|a| self.contains(&a.id)).collect()
    }
}
