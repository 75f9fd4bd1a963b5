//! Tracked-change editing for run-structured word-processing documents.
//!
//! A [`Document`] is a list of parts (body, headers, footnotes, ...) made of
//! paragraphs whose text is fragmented into formatted runs, some of them
//! inside tracked change wrappers. Edits address text by content through a
//! [`TextQuery`] and are recorded as tracked insertions, deletions, moves and
//! format changes attributed to the configured author:
//!
//! ```
//! use redline_text::{Anchor, Document};
//!
//! let mut document = Document::from_texts(["The quick fox"]);
//! document.insert(Anchor::after("quick"), " brown").unwrap();
//! document.delete("quick").unwrap();
//!
//! assert_eq!(document.to_string(), "The [-quick-][+ brown+] fox");
//! ```
//!
//! Every mutating call is atomic: on error the document is left exactly as
//! it was.

mod compare;
mod config;
mod document;
mod editor;
mod errors;
mod matching;
mod mutation;
mod review;
mod segments;
mod text_view;
mod transaction;

pub use compare::{Comparison, compare};
pub use config::{DEFAULT_AUTHOR, EditorConfig};
pub use document::{
    Document, ParagraphAddress,
    formatting::{ColorChange, FormatPatch, Formatting},
    paragraph::{CellPosition, Paragraph},
    part::{Part, PartKind},
    run::{Run, RunContent},
    tracked::{ChangeInfo, ChangeKind, Content, MarkChange, ParagraphMark, TrackedWrapper},
};
pub use editor::{Anchor, Edit, EditResult};
pub use errors::EditError;
pub use matching::{
    Candidate, ExactMatcher, FuzzyAlgorithm, FuzzyMatcher, FuzzyOptions, MatchLocation,
    Occurrence, RegexMatcher, Scope, ScopeContext, TextMatch, TextMatcher, TextQuery,
};
pub use review::{ChangeTarget, TrackedChange};
pub use segments::{InlineMarkdown, PlainText, Segment, SegmentParser};
pub use text_view::{Leaf, NodePath, SpanPiece, TextSpan, leaves, logical_text, run_at};
