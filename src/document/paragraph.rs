use core::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{
    run::Run,
    tracked::{Content, MarkChange, ParagraphMark, TrackedWrapper},
};
use crate::text_view::logical_text;

/// Position of a paragraph inside a table.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPosition {
    pub table: usize,
    pub row: usize,
    pub column: usize,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    content: Vec<Content>,
    style: Option<String>,
    cell: Option<CellPosition>,
    mark: Option<ParagraphMark>,
}

impl Paragraph {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// A paragraph holding `text` in a single unformatted run, or no run at
    /// all when `text` is empty.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let paragraph = Self::new();
        if text.is_empty() {
            paragraph
        } else {
            paragraph.with_run(Run::new(text))
        }
    }

    #[must_use]
    pub fn with_run(mut self, run: Run) -> Self {
        self.content.push(Content::Run(run));
        self
    }

    #[must_use]
    pub fn with_tracked(mut self, wrapper: TrackedWrapper) -> Self {
        self.content.push(Content::Tracked(wrapper));
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    #[must_use]
    pub fn in_cell(mut self, cell: CellPosition) -> Self {
        self.cell = Some(cell);
        self
    }

    #[must_use]
    pub fn with_mark(mut self, mark: ParagraphMark) -> Self {
        self.mark = Some(mark);
        self
    }

    #[must_use]
    pub fn content(&self) -> &[Content] { &self.content }

    pub(crate) fn content_mut(&mut self) -> &mut Vec<Content> { &mut self.content }

    pub(crate) fn take_content(&mut self) -> Vec<Content> { core::mem::take(&mut self.content) }

    #[must_use]
    pub fn style(&self) -> Option<&str> { self.style.as_deref() }

    #[must_use]
    pub fn cell(&self) -> Option<CellPosition> { self.cell }

    #[must_use]
    pub fn mark(&self) -> Option<&ParagraphMark> { self.mark.as_ref() }

    pub(crate) fn set_mark(&mut self, mark: Option<ParagraphMark>) { self.mark = mark; }

    pub(crate) fn mark_mut(&mut self) -> Option<&mut ParagraphMark> { self.mark.as_mut() }

    /// Whether the paragraph itself is pending deletion.
    #[must_use]
    pub fn is_mark_deleted(&self) -> bool {
        self.mark.as_ref().is_some_and(ParagraphMark::is_deleted)
    }

    /// Heading level derived from styles such as `Heading1` or `heading 2`.
    #[must_use]
    pub fn heading_level(&self) -> Option<u8> {
        let style = self.style.as_deref()?.to_lowercase();
        let level = style.strip_prefix("heading")?.trim();
        level.parse().ok().filter(|level| (1..=9).contains(level))
    }

    /// The text a reader sees: deleted and moved-away text is excluded.
    #[must_use]
    pub fn text(&self) -> String { logical_text(&self.content, false) }

    /// The text including pending deletions.
    #[must_use]
    pub fn text_with_deleted(&self) -> String { logical_text(&self.content, true) }

    /// Merges adjacent runs that share every attribute, at every nesting
    /// level. The logical text does not change.
    pub(crate) fn coalesce_runs(&mut self) { coalesce(&mut self.content); }
}

fn coalesce(content: &mut Vec<Content>) {
    let mut merged: Vec<Content> = Vec::with_capacity(content.len());

    for node in content.drain(..) {
        let node = match node {
            Content::Tracked(mut wrapper) => {
                coalesce(&mut wrapper.content);
                Content::Tracked(wrapper)
            }
            node @ Content::Run(_) => node,
        };

        let mergeable = matches!(
            (merged.last(), &node),
            (Some(Content::Run(previous)), Content::Run(run)) if previous.can_merge(run)
        );

        if !mergeable {
            merged.push(node);
        } else if let (Some(Content::Run(previous)), Content::Run(run)) = (merged.last_mut(), node)
        {
            previous.merge(run);
        }
    }

    *content = merged;
}

impl Display for Paragraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.content {
            write!(f, "{node}")?;
        }

        match self.mark.as_ref() {
            Some(mark) => match (mark.change, &mark.deletion) {
                (MarkChange::Inserted, None) => write!(f, "[+¶+]"),
                (MarkChange::Inserted, Some(_)) => write!(f, "[+[-¶-]+]"),
                (MarkChange::Deleted, _) => write!(f, "[-¶-]"),
            },
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::document::formatting::Formatting;

    #[test_case("Heading1", Some(1))]
    #[test_case("Heading 2", Some(2))]
    #[test_case("heading 3", Some(3))]
    #[test_case("Normal", None)]
    #[test_case("Heading", None)]
    fn test_heading_level(style: &str, expected: Option<u8>) {
        assert_eq!(Paragraph::new().with_style(style).heading_level(), expected);
    }

    #[test]
    fn test_coalesce_merges_identical_runs_only() {
        let bold = Formatting::default().with_bold();
        let mut paragraph = Paragraph::new()
            .with_run(Run::new("a"))
            .with_run(Run::new("b"))
            .with_run(Run::formatted("c", bold.clone()))
            .with_run(Run::formatted("d", bold))
            .with_run(Run::line_break())
            .with_run(Run::new("e"));

        paragraph.coalesce_runs();

        assert_eq!(paragraph.content().len(), 4);
        assert_eq!(paragraph.text(), "abcd\ne");
    }
}
