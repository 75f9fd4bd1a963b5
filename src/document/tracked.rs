use core::fmt::{self, Display};

use chrono::{DateTime, SecondsFormat, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{formatting::Formatting, run::Run};

/// The kind of a tracked change wrapper.
///
/// Every accept/reject transition and every nesting rule matches on this
/// enum exhaustively.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Insertion,
    Deletion,
    MoveFrom,
    MoveTo,

    /// The wrapped runs carry their new formatting, `previous` is what
    /// rejecting the change restores.
    FormatChange {
        previous: Formatting,
    },
}

impl ChangeKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ChangeKind::Insertion => "insertion",
            ChangeKind::Deletion => "deletion",
            ChangeKind::MoveFrom => "move-from",
            ChangeKind::MoveTo => "move-to",
            ChangeKind::FormatChange { .. } => "format-change",
        }
    }

    /// Whether the wrapped text is gone from the reader's perspective.
    #[must_use]
    pub fn hides_text(&self) -> bool {
        match self {
            ChangeKind::Deletion | ChangeKind::MoveFrom => true,
            ChangeKind::Insertion | ChangeKind::MoveTo | ChangeKind::FormatChange { .. } => false,
        }
    }

    #[must_use]
    pub fn is_move(&self) -> bool { matches!(self, ChangeKind::MoveFrom | ChangeKind::MoveTo) }

    #[must_use]
    pub fn same_kind(&self, other: &ChangeKind) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// The nesting table: whether a wrapper of kind `self` may directly
    /// contain a wrapper of kind `child`.
    #[must_use]
    pub fn can_contain(&self, child: &ChangeKind) -> bool {
        match self {
            ChangeKind::Insertion | ChangeKind::MoveTo => {
                matches!(child, ChangeKind::Deletion | ChangeKind::FormatChange { .. })
            }
            ChangeKind::Deletion | ChangeKind::MoveFrom => {
                matches!(child, ChangeKind::FormatChange { .. })
            }
            ChangeKind::FormatChange { .. } => {
                matches!(child, ChangeKind::Insertion | ChangeKind::Deletion)
            }
        }
    }
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.name()) }
}

/// Attribution shared by wrappers and paragraph marks.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeInfo {
    pub id: u32,
    pub author: String,
    pub date: DateTime<Utc>,

    /// Links a move-from wrapper to its move-to counterpart
    pub move_name: Option<String>,
}

impl ChangeInfo {
    pub fn new(id: u32, author: impl Into<String>, date: DateTime<Utc>) -> Self {
        ChangeInfo {
            id,
            author: author.into(),
            date,
            move_name: None,
        }
    }

    #[must_use]
    pub fn with_move_name(mut self, move_name: impl Into<String>) -> Self {
        self.move_name = Some(move_name.into());
        self
    }

    /// ISO-8601 timestamp with second precision, e.g. `2024-05-01T10:00:00Z`.
    #[must_use]
    pub fn timestamp(&self) -> String { self.date.to_rfc3339_opts(SecondsFormat::Secs, true) }
}

/// A marker node recording a pending change over its content.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedWrapper {
    pub info: ChangeInfo,
    pub kind: ChangeKind,
    pub content: Vec<Content>,
}

impl TrackedWrapper {
    pub fn new(kind: ChangeKind, info: ChangeInfo, content: Vec<Content>) -> Self {
        TrackedWrapper {
            info,
            kind,
            content,
        }
    }

    /// Convenience constructor for a wrapper around plain runs.
    pub fn with_runs(kind: ChangeKind, info: ChangeInfo, runs: Vec<Run>) -> Self {
        Self::new(kind, info, runs.into_iter().map(Content::Run).collect())
    }

    /// Text of every run below this wrapper, hidden or not.
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.content {
            node.collect_text(&mut text);
        }
        text
    }
}

/// A node in a paragraph: a plain run or a tracked change wrapper.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Run(Run),
    Tracked(TrackedWrapper),
}

impl Content {
    fn collect_text(&self, text: &mut String) {
        match self {
            Content::Run(run) => text.push_str(run.text()),
            Content::Tracked(wrapper) => {
                for node in &wrapper.content {
                    node.collect_text(text);
                }
            }
        }
    }

    /// Visits every run below (and including) this node.
    pub(crate) fn for_each_run_mut(&mut self, f: &mut dyn FnMut(&mut Run)) {
        match self {
            Content::Run(run) => f(run),
            Content::Tracked(wrapper) => {
                for node in &mut wrapper.content {
                    node.for_each_run_mut(f);
                }
            }
        }
    }
}

impl From<Run> for Content {
    fn from(run: Run) -> Self { Content::Run(run) }
}

impl From<TrackedWrapper> for Content {
    fn from(wrapper: TrackedWrapper) -> Self { Content::Tracked(wrapper) }
}

/// Renders the redline markup of a node: `[+inserted+]`, `[-deleted-]`,
/// `[<name:moved away<]`, `[>name:moved here>]`, `[~reformatted~]` and `[br]`
/// for line breaks.
impl Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Run(run) if run.is_break() => write!(f, "[br]"),
            Content::Run(run) => write!(f, "{}", run.text()),
            Content::Tracked(wrapper) => {
                let name = wrapper.info.move_name.as_deref().unwrap_or_default();
                let (open, close) = match wrapper.kind {
                    ChangeKind::Insertion => ("[+".to_owned(), "+]"),
                    ChangeKind::Deletion => ("[-".to_owned(), "-]"),
                    ChangeKind::MoveFrom => (format!("[<{name}:"), "<]"),
                    ChangeKind::MoveTo => (format!("[>{name}:"), ">]"),
                    ChangeKind::FormatChange { .. } => ("[~".to_owned(), "~]"),
                };

                write!(f, "{open}")?;
                for node in &wrapper.content {
                    write!(f, "{node}")?;
                }
                write!(f, "{close}")
            }
        }
    }
}

/// Whether a paragraph mark was inserted or deleted as a tracked change.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkChange {
    Inserted,
    Deleted,
}

/// Tracked change on the paragraph mark itself, used when whole paragraphs
/// are inserted or deleted.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphMark {
    pub info: ChangeInfo,
    pub change: MarkChange,
    /// Deletion of a mark that is itself a pending insertion.
    #[cfg_attr(feature = "serde", serde(default))]
    pub deletion: Option<ChangeInfo>,
}

impl ParagraphMark {
    #[must_use]
    pub fn inserted(info: ChangeInfo) -> Self {
        Self {
            info,
            change: MarkChange::Inserted,
            deletion: None,
        }
    }

    #[must_use]
    pub fn deleted(info: ChangeInfo) -> Self {
        Self {
            info,
            change: MarkChange::Deleted,
            deletion: None,
        }
    }

    /// True when the mark is gone once every pending change is accepted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.change == MarkChange::Deleted || self.deletion.is_some()
    }

    /// Change ids carried by the mark, outermost first.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        std::iter::once(self.info.id).chain(self.deletion.as_ref().map(|info| info.id))
    }

    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self.change {
            MarkChange::Inserted => ChangeKind::Insertion,
            MarkChange::Deleted => ChangeKind::Deletion,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case(ChangeKind::Insertion, ChangeKind::Deletion, true)]
    #[test_case(ChangeKind::Insertion, ChangeKind::Insertion, false)]
    #[test_case(ChangeKind::Deletion, ChangeKind::Deletion, false)]
    #[test_case(ChangeKind::Deletion, ChangeKind::Insertion, false)]
    #[test_case(ChangeKind::MoveFrom, ChangeKind::Deletion, false)]
    #[test_case(ChangeKind::MoveTo, ChangeKind::Deletion, true)]
    #[test_case(ChangeKind::Insertion, ChangeKind::MoveFrom, false)]
    #[test_case(ChangeKind::FormatChange { previous: Formatting::default() }, ChangeKind::Insertion, true)]
    #[test_case(ChangeKind::FormatChange { previous: Formatting::default() }, ChangeKind::FormatChange { previous: Formatting::default() }, false)]
    fn test_nesting_table(parent: ChangeKind, child: ChangeKind, allowed: bool) {
        assert_eq!(parent.can_contain(&child), allowed);
    }

    #[test]
    fn test_timestamp_is_iso_8601() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(ChangeInfo::new(1, "Reviewer", date).timestamp(), "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_render_markup() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let wrapper = TrackedWrapper::new(
            ChangeKind::Insertion,
            ChangeInfo::new(1, "Reviewer", date),
            vec![
                Run::new("new").into(),
                TrackedWrapper::with_runs(
                    ChangeKind::Deletion,
                    ChangeInfo::new(2, "Reviewer", date),
                    vec![Run::new(" text")],
                )
                .into(),
                Run::line_break().into(),
            ],
        );

        assert_eq!(Content::from(wrapper.clone()).to_string(), "[+new[- text-][br]+]");
        assert_eq!(wrapper.text(), "new text\n");
    }
}
