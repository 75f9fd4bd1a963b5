#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::formatting::Formatting;

/// What a run holds: either a piece of text or an explicit line break.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunContent {
    Text(String),
    Break,
}

/// The minimal unit of text sharing one formatting state.
///
/// A break run reads as `"\n"` in the logical text of its paragraph but never
/// stores a newline character, serialisers are expected to emit a dedicated
/// break element for it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    content: RunContent,
    format: Formatting,

    /// Edit session that produced the run, if known
    revision: Option<String>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self { Self::formatted(text, Formatting::default()) }

    pub fn formatted(text: impl Into<String>, format: Formatting) -> Self {
        Run {
            content: RunContent::Text(text.into()),
            format,
            revision: None,
        }
    }

    #[must_use]
    pub fn line_break() -> Self {
        Run {
            content: RunContent::Break,
            format: Formatting::default(),
            revision: None,
        }
    }

    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    #[must_use]
    pub fn content(&self) -> &RunContent { &self.content }

    /// The text this run contributes to the logical text of its paragraph.
    #[must_use]
    pub fn text(&self) -> &str {
        match &self.content {
            RunContent::Text(text) => text,
            RunContent::Break => "\n",
        }
    }

    /// Length of [`Run::text`] in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.text().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    #[must_use]
    pub fn is_break(&self) -> bool { matches!(self.content, RunContent::Break) }

    #[must_use]
    pub fn format(&self) -> &Formatting { &self.format }

    pub fn set_format(&mut self, format: Formatting) { self.format = format; }

    #[must_use]
    pub fn revision(&self) -> Option<&str> { self.revision.as_deref() }

    /// Whether a serialiser has to mark the text as whitespace-preserving.
    #[must_use]
    pub fn preserves_space(&self) -> bool {
        match &self.content {
            RunContent::Text(text) => {
                text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
            }
            RunContent::Break => false,
        }
    }

    /// Splits the run in two at byte index `at`, keeping the first half in
    /// `self` and returning the second. Both halves keep all attributes.
    ///
    /// Returns `None` when `at` is not strictly inside the text or is not on
    /// a character boundary, break runs can never be split.
    pub(crate) fn split_off(&mut self, at: usize) -> Option<Run> {
        let RunContent::Text(text) = &mut self.content else {
            return None;
        };

        if at == 0 || at >= text.len() || !text.is_char_boundary(at) {
            return None;
        }

        let tail = text.split_off(at);
        Some(Run {
            content: RunContent::Text(tail),
            format: self.format.clone(),
            revision: self.revision.clone(),
        })
    }

    /// A copy of the byte range `start..end` of the run with all attributes,
    /// break runs are copied whole.
    pub(crate) fn slice(&self, start: usize, end: usize) -> Option<Run> {
        let content = match &self.content {
            RunContent::Text(text) => RunContent::Text(text.get(start..end)?.to_owned()),
            RunContent::Break => RunContent::Break,
        };

        Some(Run {
            content,
            format: self.format.clone(),
            revision: self.revision.clone(),
        })
    }

    /// Whether `other` can be appended to this run without changing anything
    /// but the run count.
    pub(crate) fn can_merge(&self, other: &Run) -> bool {
        matches!(
            (&self.content, &other.content),
            (RunContent::Text(_), RunContent::Text(_))
        ) && self.format == other.format
            && self.revision == other.revision
    }

    pub(crate) fn merge(&mut self, other: Run) {
        debug_assert!(self.can_merge(&other), "Only compatible runs can be merged");

        if let (RunContent::Text(text), RunContent::Text(other_text)) =
            (&mut self.content, other.content)
        {
            text.push_str(&other_text);
        }
    }
}
