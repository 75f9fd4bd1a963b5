use core::fmt::{self, Display};
use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound, Utc};

use crate::{EditError, EditorConfig};

pub mod formatting;
pub mod paragraph;
pub mod part;
pub mod run;
pub mod tracked;

use paragraph::Paragraph;
use part::Part;
use run::Run;
use tracked::{ChangeInfo, Content, ParagraphMark};

/// Addresses a paragraph by part index and paragraph index within the part.
///
/// Addresses, like [`crate::TextSpan`]s, are only valid until the next
/// successful mutation of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParagraphAddress {
    pub part: usize,
    pub paragraph: usize,
}

impl ParagraphAddress {
    #[must_use]
    pub fn new(part: usize, paragraph: usize) -> Self { Self { part, paragraph } }
}

/// A word-processing document: an ordered list of text-bearing parts plus
/// the bookkeeping needed to record tracked changes.
///
/// The document exclusively owns its tree. Every mutating method either
/// commits completely or leaves the document untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    parts: Vec<Part>,
    config: EditorConfig,
    next_change_id: u32,
    session_revision: String,
    modified_parts: BTreeSet<String>,
}

/// Hands out change attribution while a paragraph of the document is
/// borrowed mutably.
#[derive(Debug)]
pub(crate) struct ChangeStamp<'a> {
    next_id: &'a mut u32,
    author: &'a str,
    date: DateTime<Utc>,
    revision: &'a str,
}

impl ChangeStamp<'_> {
    pub(crate) fn next(&mut self) -> ChangeInfo {
        let info = ChangeInfo::new(*self.next_id, self.author, self.date);
        *self.next_id += 1;
        info
    }

    pub(crate) fn author(&self) -> &str { self.author }

    /// Stamps a freshly inserted run with the session's revision id.
    pub(crate) fn stamp_run(&self, run: Run) -> Run { run.with_revision(self.revision) }
}

impl Document {
    /// Creates a document with a single body part.
    #[must_use]
    pub fn new(paragraphs: Vec<Paragraph>) -> Self { Self::from_parts(vec![Part::body(paragraphs)]) }

    /// Creates a body-only document with one unformatted paragraph per item.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|text| Paragraph::from_text(text.as_ref()))
                .collect(),
        )
    }

    #[must_use]
    pub fn from_parts(parts: Vec<Part>) -> Self {
        let highest_id = parts
            .iter()
            .flat_map(Part::paragraphs)
            .flat_map(paragraph_change_ids)
            .max()
            .unwrap_or(0);

        Document {
            parts,
            config: EditorConfig::default(),
            next_change_id: highest_id + 1,
            session_revision: format!("{:08X}", rand::random::<u32>()),
            modified_parts: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig { &self.config }

    pub fn set_author(&mut self, author: impl Into<String>) { self.config.author = author.into(); }

    #[must_use]
    pub fn author(&self) -> &str { &self.config.author }

    #[must_use]
    pub fn parts(&self) -> &[Part] { &self.parts }

    #[must_use]
    pub fn body(&self) -> Option<&Part> {
        self.parts
            .iter()
            .find(|part| part.kind() == part::PartKind::Body)
    }

    #[must_use]
    pub fn paragraph(&self, address: ParagraphAddress) -> Option<&Paragraph> {
        self.parts
            .get(address.part)?
            .paragraphs
            .get(address.paragraph)
    }

    /// The id the next tracked change will receive.
    #[must_use]
    pub fn next_change_id(&self) -> u32 { self.next_change_id }

    /// Identifier of this editing session, stamped on inserted runs.
    #[must_use]
    pub fn session_revision(&self) -> &str { &self.session_revision }

    /// Names of the parts changed since the document was created, for the
    /// serialiser to write back.
    pub fn modified_parts(&self) -> impl Iterator<Item = &str> {
        self.modified_parts.iter().map(String::as_str)
    }

    /// Visible text of the body, one paragraph per line.
    #[must_use]
    pub fn text(&self) -> String { self.body().map(Part::text).unwrap_or_default() }

    pub(crate) fn parts_mut(&mut self) -> &mut Vec<Part> { &mut self.parts }

    pub(crate) fn mark_part_modified(&mut self, part: usize) {
        if let Some(part) = self.parts.get(part) {
            self.modified_parts.insert(part.name().to_owned());
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.config
            .date
            .unwrap_or_else(|| Utc::now().trunc_subsecs(0))
    }

    /// Borrows a paragraph mutably together with the means to attribute new
    /// tracked changes.
    pub(crate) fn edit_paragraph(
        &mut self,
        address: ParagraphAddress,
    ) -> Result<(&mut Paragraph, ChangeStamp<'_>), EditError> {
        let (part, stamp) = self.edit_part(address.part)?;
        let paragraph = part.paragraphs.get_mut(address.paragraph).ok_or_else(|| {
            EditError::invalid_operation(format!("paragraph {} does not exist", address.paragraph))
        })?;

        Ok((paragraph, stamp))
    }

    pub(crate) fn edit_part(
        &mut self,
        part: usize,
    ) -> Result<(&mut Part, ChangeStamp<'_>), EditError> {
        let date = self.now();
        let Document {
            parts,
            config,
            next_change_id,
            session_revision,
            ..
        } = self;

        let part = parts
            .get_mut(part)
            .ok_or_else(|| EditError::invalid_operation(format!("part {part} does not exist")))?;

        Ok((
            part,
            ChangeStamp {
                next_id: next_change_id,
                author: &config.author,
                date,
                revision: session_revision,
            },
        ))
    }
}

fn paragraph_change_ids(paragraph: &Paragraph) -> Vec<u32> {
    fn collect(content: &[Content], ids: &mut Vec<u32>) {
        for node in content {
            if let Content::Tracked(wrapper) = node {
                ids.push(wrapper.info.id);
                collect(&wrapper.content, ids);
            }
        }
    }

    let mut ids = Vec::new();
    collect(paragraph.content(), &mut ids);
    ids.extend(paragraph.mark().into_iter().flat_map(ParagraphMark::ids));
    ids
}

/// Renders the redline markup of every part, one paragraph per line.
impl Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::document::tracked::{ChangeKind, TrackedWrapper};

    #[test]
    fn test_change_ids_continue_after_existing_ones() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let document = Document::new(vec![
            Paragraph::from_text("plain"),
            Paragraph::new().with_tracked(TrackedWrapper::with_runs(
                ChangeKind::Insertion,
                ChangeInfo::new(41, "Reviewer", date),
                vec![Run::new("added")],
            )),
        ]);

        assert_eq!(document.next_change_id(), 42);
        assert_eq!(Document::from_texts(["a"]).next_change_id(), 1);
    }

    #[test]
    fn test_session_revision_is_hex() {
        let document = Document::from_texts(["a"]);
        assert_eq!(document.session_revision().len(), 8);
        assert!(
            document
                .session_revision()
                .chars()
                .all(|c| c.is_ascii_hexdigit())
        );
    }

    #[test]
    fn test_stamp_advances_counter() {
        let mut document = Document::from_texts(["a"]).with_config(
            EditorConfig::default()
                .with_author("Reviewer")
                .with_date(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
        );

        let (_, mut stamp) = document.edit_paragraph(ParagraphAddress::new(0, 0)).unwrap();
        let first = stamp.next();
        let second = stamp.next();

        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(first.author, "Reviewer");
        assert_eq!(document.next_change_id(), 3);
    }
}
