//! Email-style digest of the selected top stories.

use std::fmt;

use newsdesk_shared::{Article, DateRange};

use crate::selection::SelectionSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub recipient: String,
    /// Selected stories in collection order.
    pub stories: Vec<Article>,
}

impl Digest {
    /// Assemble the digest for `selection`. Ids no longer in `articles` are skipped.
    pub fn build(
        articles: &[Article],
        selection: &SelectionSet,
        range: &DateRange,
        recipient: &str,
    ) -> Self {
        Self {
            subject: subject_for(range),
            recipient: recipient.to_string(),
            stories: selection.pick(articles).into_iter().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

/// `News Digest • 13 Feb – 14 Feb 2026`
pub fn subject_for(range: &DateRange) -> String {
    format!(
        "News Digest • {} – {}",
        range.from.format("%d %b"),
        range.to.format("%d %b %Y")
    )
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Subject: {}", self.subject)?;
        writeln!(f, "To: {}", self.recipient)?;
        for (n, story) in self.stories.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "Story #{} • {}", n + 1, story.source)?;
            writeln!(f, "{}", story.title)?;
            if !story.summary.is_empty() {
                writeln!(f, "{}", story.summary)?;
            }
            if !story.url.is_empty() {
                writeln!(f, "Read full story: {}", story.url)?;
            }
        }
        Ok(())
    }
}
