//! Logical text views over the run structure of a paragraph.
//!
//! A paragraph's text is physically fragmented into runs, some of which live
//! inside (possibly nested) tracked change wrappers. The functions here
//! flatten that tree into the text a reader sees and map logical byte offsets
//! back onto the runs holding them.
//!
//! Nothing in this module is cached: every mutation of a paragraph
//! invalidates the paths and offsets computed from it.

use std::ops::Range;

use crate::{
    Document, EditError,
    document::{
        ParagraphAddress,
        formatting::Formatting,
        paragraph::Paragraph,
        run::Run,
        tracked::{Content, TrackedWrapper},
    },
};

/// Indices leading from a paragraph's content list down to one node: the
/// first index selects a top-level node, every following index selects a
/// child of the wrapper selected so far.
pub type NodePath = Vec<usize>;

/// A run of a paragraph as seen through a text view.
#[derive(Debug, Clone)]
pub struct Leaf<'a> {
    pub path: NodePath,
    pub run: &'a Run,

    /// Logical offset of the run's first byte in the view
    pub start: usize,

    /// Length contributed to the view, zero for hidden runs when deleted text
    /// is excluded
    pub len: usize,

    /// Whether a deletion or move-from wrapper encloses the run
    pub hidden: bool,

    /// Enclosing wrappers, outermost first
    pub ancestors: Vec<&'a TrackedWrapper>,
}

impl Leaf<'_> {
    #[must_use]
    pub fn end(&self) -> usize { self.start + self.len }
}

/// Flattens `content` into its runs in document order.
#[must_use]
pub fn leaves(content: &[Content], include_deleted: bool) -> Vec<Leaf<'_>> {
    fn walk<'a>(
        content: &'a [Content],
        include_deleted: bool,
        path: &mut NodePath,
        ancestors: &mut Vec<&'a TrackedWrapper>,
        offset: &mut usize,
        result: &mut Vec<Leaf<'a>>,
    ) {
        for (index, node) in content.iter().enumerate() {
            path.push(index);
            match node {
                Content::Run(run) => {
                    let hidden = ancestors.iter().any(|wrapper| wrapper.kind.hides_text());
                    let len = if hidden && !include_deleted { 0 } else { run.len() };

                    result.push(Leaf {
                        path: path.clone(),
                        run,
                        start: *offset,
                        len,
                        hidden,
                        ancestors: ancestors.clone(),
                    });
                    *offset += len;
                }
                Content::Tracked(wrapper) => {
                    ancestors.push(wrapper);
                    walk(
                        &wrapper.content,
                        include_deleted,
                        path,
                        ancestors,
                        offset,
                        result,
                    );
                    ancestors.pop();
                }
            }
            path.pop();
        }
    }

    let mut result = Vec::new();
    walk(
        content,
        include_deleted,
        &mut Vec::new(),
        &mut Vec::new(),
        &mut 0,
        &mut result,
    );
    result
}

/// Concatenates the text of every run in document order. Text under
/// deletion and move-from wrappers is only included when `include_deleted`
/// is set.
#[must_use]
pub fn logical_text(content: &[Content], include_deleted: bool) -> String {
    leaves(content, include_deleted)
        .iter()
        .filter(|leaf| leaf.len > 0)
        .map(|leaf| leaf.run.text())
        .collect()
}

/// Length in bytes of the logical text of a node.
pub(crate) fn node_len(node: &Content, include_deleted: bool, hidden: bool) -> usize {
    match node {
        Content::Run(_) if hidden && !include_deleted => 0,
        Content::Run(run) => run.len(),
        Content::Tracked(wrapper) => {
            let hidden = hidden || wrapper.kind.hides_text();
            wrapper
                .content
                .iter()
                .map(|child| node_len(child, include_deleted, hidden))
                .sum()
        }
    }
}

/// Looks up the run at `path`.
#[must_use]
pub fn run_at<'a>(content: &'a [Content], path: &[usize]) -> Option<&'a Run> {
    let (first, rest) = path.split_first()?;
    match (content.get(*first)?, rest.is_empty()) {
        (Content::Run(run), true) => Some(run),
        (Content::Tracked(wrapper), false) => run_at(&wrapper.content, rest),
        _ => None,
    }
}

/// A byte range of one run taking part in a [`TextSpan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanPiece {
    pub path: NodePath,
    pub start: usize,
    pub end: usize,
}

/// A logical text range of a paragraph expressed over concrete runs.
///
/// Concatenating the referenced run substrings yields exactly
/// [`TextSpan::text`]. A span may cross run boundaries and wrapper
/// boundaries. It describes the paragraph as it was when the span was
/// computed and is invalidated by any later mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub address: ParagraphAddress,
    pub range: Range<usize>,
    pub include_deleted: bool,
    pub pieces: Vec<SpanPiece>,
    text: String,
}

impl TextSpan {
    #[must_use]
    pub fn text(&self) -> &str { &self.text }

    #[must_use]
    pub fn start(&self) -> usize { self.range.start }

    #[must_use]
    pub fn end(&self) -> usize { self.range.end }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.range.is_empty() }

    /// Re-reads the referenced substrings from `content`. Returns `None`
    /// when a piece no longer points at a run.
    #[must_use]
    pub fn resolve(&self, content: &[Content]) -> Option<String> {
        self.pieces
            .iter()
            .map(|piece| {
                run_at(content, &piece.path)
                    .and_then(|run| run.text().get(piece.start..piece.end))
            })
            .collect()
    }
}

/// Maps the logical byte range `range` of `paragraph` back to the runs
/// holding it.
///
/// # Errors
///
/// Returns [`EditError::InvalidOperation`] when the range is reversed, runs
/// past the end of the logical text or does not fall on character
/// boundaries.
pub fn offset_to_span(
    paragraph: &Paragraph,
    address: ParagraphAddress,
    range: Range<usize>,
    include_deleted: bool,
) -> Result<TextSpan, EditError> {
    let text = logical_text(paragraph.content(), include_deleted);
    let Some(matched) = text.get(range.clone()) else {
        return Err(EditError::invalid_operation(format!(
            "range {range:?} is not within the {} bytes of the paragraph text",
            text.len()
        )));
    };

    let pieces = leaves(paragraph.content(), include_deleted)
        .into_iter()
        .filter(|leaf| leaf.len > 0 && leaf.start < range.end && leaf.end() > range.start)
        .map(|leaf| SpanPiece {
            start: range.start.max(leaf.start) - leaf.start,
            end: range.end.min(leaf.end()) - leaf.start,
            path: leaf.path,
        })
        .collect();

    Ok(TextSpan {
        address,
        range,
        include_deleted,
        pieces,
        text: matched.to_owned(),
    })
}

/// Copies of the run pieces a span covers, in order.
pub(crate) fn span_runs(content: &[Content], span: &TextSpan) -> Option<Vec<Run>> {
    span.pieces
        .iter()
        .map(|piece| run_at(content, &piece.path)?.slice(piece.start, piece.end))
        .collect()
}

/// Copies of every run a reader sees, skipping deleted and moved-away text.
pub(crate) fn visible_runs(content: &[Content]) -> Vec<Run> {
    leaves(content, false)
        .into_iter()
        .filter(|leaf| !leaf.hidden)
        .map(|leaf| leaf.run.clone())
        .collect()
}

/// Formatting that text inserted at logical `offset` inherits: the run
/// ending at or containing the offset, otherwise the run starting there,
/// otherwise the last run of the view.
pub(crate) fn formatting_at(content: &[Content], offset: usize, include_deleted: bool) -> Formatting {
    let visible = leaves(content, include_deleted)
        .into_iter()
        .filter(|leaf| leaf.len > 0 && !leaf.run.is_break())
        .collect::<Vec<_>>();

    visible
        .iter()
        .find(|leaf| leaf.start < offset && offset <= leaf.end())
        .or_else(|| visible.iter().find(|leaf| leaf.start == offset))
        .or_else(|| visible.last())
        .map(|leaf| leaf.run.format().clone())
        .unwrap_or_default()
}

impl Document {
    /// Logical text of one paragraph, see [`logical_text`].
    #[must_use]
    pub fn logical_text(&self, address: ParagraphAddress, include_deleted: bool) -> Option<String> {
        self.paragraph(address)
            .map(|paragraph| logical_text(paragraph.content(), include_deleted))
    }

    /// See [`offset_to_span`].
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidOperation`] when the paragraph does not
    /// exist or the range is invalid.
    pub fn offset_to_span(
        &self,
        address: ParagraphAddress,
        range: Range<usize>,
        include_deleted: bool,
    ) -> Result<TextSpan, EditError> {
        let paragraph = self.paragraph(address).ok_or_else(|| {
            EditError::invalid_operation(format!("paragraph {address:?} does not exist"))
        })?;
        offset_to_span(paragraph, address, range, include_deleted)
    }
}
