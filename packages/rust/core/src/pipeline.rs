//! Filter/sort pipeline: article collection + [`FilterState`] → display list.
//!
//! The pipeline is an ordered list of named [`Stage`]s. The order is part of
//! the contract: the rank cap only ever sees what survived filtering and
//! sorting, and the duplicate/unique switches are two separate stages.

use std::cmp::Ordering;

use newsdesk_shared::{Article, FilterState, SortOrder};
use tracing::trace;

/// How many stories "top ranked only" keeps.
pub const TOP_RANKED_LIMIT: usize = 10;

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Search,
    Category,
    Source,
    Tags,
    Duplicates,
    Unique,
    Sort,
    RankCap,
}

/// Stages in the order [`render`] applies them.
pub const STAGES: [Stage; 8] = [
    Stage::Search,
    Stage::Category,
    Stage::Source,
    Stage::Tags,
    Stage::Duplicates,
    Stage::Unique,
    Stage::Sort,
    Stage::RankCap,
];

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Category => "category",
            Self::Source => "source",
            Self::Tags => "tags",
            Self::Duplicates => "only_duplicates",
            Self::Unique => "only_unique",
            Self::Sort => "sort",
            Self::RankCap => "rank_cap",
        }
    }

    /// Run this stage over the working list, producing the next one.
    fn apply<'a>(self, list: Vec<&'a Article>, state: &FilterState) -> Vec<&'a Article> {
        match self {
            Self::Search => match state.search_needle() {
                Some(needle) => keep(list, |a| matches_search(a, &needle)),
                None => list,
            },
            Self::Category if !state.categories.is_empty() => keep(list, |a| {
                a.category
                    .as_deref()
                    .is_some_and(|c| state.categories.contains(c))
            }),
            Self::Source if !state.sources.is_empty() => {
                keep(list, |a| state.sources.contains(&a.source))
            }
            // AND semantics: every selected tag must be on the article.
            Self::Tags if !state.tags.is_empty() => {
                keep(list, |a| state.tags.iter().all(|t| a.has_tag(t)))
            }
            Self::Duplicates if state.only_duplicates => keep(list, |a| a.is_duplicate_group),
            Self::Unique if state.only_unique => keep(list, |a| !a.is_duplicate_group),
            Self::Sort => {
                let mut sorted = list;
                // `sort_by` is stable, so equal timestamps keep input order.
                sorted.sort_by(|a, b| by_published(a, b, state.sort_order));
                sorted
            }
            Self::RankCap if state.only_top_ranked => {
                list.into_iter().take(TOP_RANKED_LIMIT).collect()
            }
            _ => list,
        }
    }
}

/// Derive the displayed list. Pure: borrows the collection, never mutates it.
pub fn render<'a>(articles: &'a [Article], state: &FilterState) -> Vec<&'a Article> {
    STAGES
        .iter()
        .fold(articles.iter().collect(), |list, stage| {
            let next = stage.apply(list, state);
            trace!(stage = stage.name(), remaining = next.len(), "pipeline stage");
            next
        })
}

fn keep<'a>(list: Vec<&'a Article>, pred: impl Fn(&Article) -> bool) -> Vec<&'a Article> {
    list.into_iter().filter(|a| pred(a)).collect()
}

/// Case-folded substring match on title, source, category, or joined tags.
fn matches_search(article: &Article, needle: &str) -> bool {
    article.title.to_lowercase().contains(needle)
        || article.source.to_lowercase().contains(needle)
        || article
            .category
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(needle))
        || article.tags.join(" ").to_lowercase().contains(needle)
}

/// Undated articles trail dated ones in either direction.
fn by_published(a: &Article, b: &Article, order: SortOrder) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => match order {
            SortOrder::Newest => y.cmp(&x),
            SortOrder::Oldest => x.cmp(&y),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{article_at, ids};

    fn sample() -> Vec<Article> {
        vec![
            article_at("a1", 10)
                .with_category("Business")
                .with_tags(["Business", "Markets"])
                .with_duplicate_group(4),
            article_at("a2", 30)
                .with_category("Tech")
                .with_tags(["Tech", "AI", "Policy"])
                .with_duplicate_group(6),
            article_at("a3", 20).with_category("Security").with_tags(["Security"]),
            article_at("a4", 40).with_tags(["Startups", "AI"]),
        ]
    }

    #[test]
    fn stage_order_is_fixed() {
        let names: Vec<_> = STAGES.iter().map(Stage::name).collect();
        assert_eq!(
            names,
            [
                "search",
                "category",
                "source",
                "tags",
                "only_duplicates",
                "only_unique",
                "sort",
                "rank_cap"
            ]
        );
    }

    #[test]
    fn default_state_only_sorts_newest_first() {
        let articles = sample();
        let out = render(&articles, &FilterState::new());
        assert_eq!(ids(&out), ["a4", "a2", "a3", "a1"]);
    }

    #[test]
    fn render_is_pure() {
        let articles = sample();
        let before = articles.clone();
        let state = FilterState::new().toggle_tag("AI").with_sort_order(SortOrder::Oldest);

        let first: Vec<Article> = render(&articles, &state).into_iter().cloned().collect();
        let second: Vec<Article> = render(&articles, &state).into_iter().cloned().collect();

        assert_eq!(first, second);
        assert_eq!(articles, before);
    }

    #[test]
    fn search_covers_title_source_category_and_tags() {
        let articles = vec![
            Article::new("t", "Chip shortage eases", "Wired"),
            Article::new("s", "Something else", "TechCrunch"),
            Article::new("c", "Plain", "BBC").with_category("Sports"),
            Article::new("g", "Plain", "BBC").with_tags(["Big Tech"]),
            Article::new("n", "Nothing here", "BBC"),
        ];

        let hits = |q: &str| ids(&render(&articles, &FilterState::new().with_search(q)));
        assert_eq!(hits("  CHIP "), ["t"]);
        assert_eq!(hits("techcrunch"), ["s"]);
        assert_eq!(hits("sports"), ["c"]);
        assert_eq!(hits("big tech"), ["g"]);
        assert_eq!(hits("   ").len(), 5);
    }

    #[test]
    fn search_matches_across_joined_tags() {
        let articles = vec![Article::new("a", "x", "y").with_tags(["AI", "Policy"])];
        let out = render(&articles, &FilterState::new().with_search("ai pol"));
        assert_eq!(ids(&out), ["a"]);
    }

    #[test]
    fn category_filter_drops_uncategorized() {
        let articles = sample();
        let state = FilterState::new().toggle_category("Tech").toggle_category("Business");
        assert_eq!(ids(&render(&articles, &state)), ["a2", "a1"]);
    }

    #[test]
    fn source_filter_matches_publisher_name() {
        let articles = vec![
            Article::new("r", "one", "Reuters"),
            Article::new("b", "two", "BBC"),
        ];
        let state = FilterState::new().toggle_source("BBC");
        assert_eq!(ids(&render(&articles, &state)), ["b"]);
    }

    #[test]
    fn tags_use_and_semantics() {
        let articles = vec![Article::new("x", "AI rules", "BBC").with_tags(["AI", "Policy"])];

        let both = FilterState::new().toggle_tag("AI").toggle_tag("Policy");
        assert_eq!(ids(&render(&articles, &both)), ["x"]);

        let mismatch = FilterState::new().toggle_tag("AI").toggle_tag("Economy");
        assert!(render(&articles, &mismatch).is_empty());
    }

    #[test]
    fn duplicate_and_unique_switches() {
        let articles = sample();

        let dups = FilterState::new().with_only_duplicates(true);
        assert_eq!(ids(&render(&articles, &dups)), ["a2", "a1"]);

        let unique = FilterState::new().with_only_unique(true);
        assert_eq!(ids(&render(&articles, &unique)), ["a4", "a3"]);

        let both = dups.with_only_unique(true);
        assert!(render(&articles, &both).is_empty());
    }

    #[test]
    fn sort_orders_by_timestamp() {
        let articles = vec![article_at("t2", 2), article_at("t1", 1), article_at("t3", 3)];

        let newest = render(&articles, &FilterState::new());
        assert_eq!(ids(&newest), ["t3", "t2", "t1"]);

        let oldest = render(&articles, &FilterState::new().with_sort_order(SortOrder::Oldest));
        assert_eq!(ids(&oldest), ["t1", "t2", "t3"]);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let articles = vec![article_at("b", 5), article_at("a", 5), article_at("c", 5)];
        for order in [SortOrder::Newest, SortOrder::Oldest] {
            let out = render(&articles, &FilterState::new().with_sort_order(order));
            assert_eq!(ids(&out), ["b", "a", "c"]);
        }
    }

    #[test]
    fn undated_articles_trail() {
        let articles = vec![
            Article::new("u1", "undated", "BBC"),
            article_at("d1", 1),
            Article::new("u2", "undated", "BBC"),
            article_at("d2", 2),
        ];

        let newest = render(&articles, &FilterState::new());
        assert_eq!(ids(&newest), ["d2", "d1", "u1", "u2"]);

        let oldest = render(&articles, &FilterState::new().with_sort_order(SortOrder::Oldest));
        assert_eq!(ids(&oldest), ["d1", "d2", "u1", "u2"]);
    }

    #[test]
    fn rank_cap_keeps_first_ten_after_sort() {
        // Input order is oldest-first, so a cap before sorting would pick the wrong ten.
        let articles: Vec<Article> = (0..15).map(|i| article_at(&format!("n{i}"), i)).collect();
        let state = FilterState::new().with_only_top_ranked(true);

        let sorted = render(&articles, &FilterState::new());
        let capped = render(&articles, &state);

        assert_eq!(capped.len(), TOP_RANKED_LIMIT);
        assert_eq!(ids(&capped), ids(&sorted[..TOP_RANKED_LIMIT]));
        assert_eq!(capped[0].id.as_str(), "n14");
    }

    #[test]
    fn rank_cap_applies_after_filters() {
        let mut articles: Vec<Article> = (0..12)
            .map(|i| article_at(&format!("k{i}"), i).with_tags(["AI"]))
            .collect();
        articles.extend((12..20).map(|i| article_at(&format!("x{i}"), i)));

        let state = FilterState::new().toggle_tag("AI").with_only_top_ranked(true);
        let out = render(&articles, &state);

        assert_eq!(out.len(), TOP_RANKED_LIMIT);
        assert!(out.iter().all(|a| a.has_tag("AI")));
    }
}
