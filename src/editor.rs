//! The public editing operations of a [`Document`].
//!
//! Every operation runs inside its own transaction: it either applies
//! completely or leaves the document untouched.

use std::ops::Range;

use log::info;

use crate::{
    Document, EditError,
    document::{
        ParagraphAddress,
        formatting::FormatPatch,
        paragraph::Paragraph,
        tracked::ChangeKind,
    },
    matching::{TextMatch, TextQuery, select},
    mutation::{
        Target, check_target, delete_range, delete_whole_paragraph, format_range, hide_range,
        insert_runs, insert_segments, inserted_paragraph, segment_runs,
    },
    segments::{InlineMarkdown, PlainText, Segment, SegmentParser},
    text_view::{TextSpan, formatting_at, span_runs},
};

/// A position relative to matched text.
#[derive(Debug, Clone)]
pub enum Anchor {
    Before(TextQuery),
    After(TextQuery),
}

impl Anchor {
    pub fn before(query: impl Into<TextQuery>) -> Self { Anchor::Before(query.into()) }

    pub fn after(query: impl Into<TextQuery>) -> Self { Anchor::After(query.into()) }

    #[must_use]
    pub fn query(&self) -> &TextQuery {
        match self {
            Anchor::Before(query) | Anchor::After(query) => query,
        }
    }

    fn offset(&self, span: &TextSpan) -> usize {
        match self {
            Anchor::Before(_) => span.start(),
            Anchor::After(_) => span.end(),
        }
    }
}

/// One edit of a batch, see [`Document::apply_edits`].
#[derive(Debug, Clone)]
pub enum Edit {
    Insert { anchor: Anchor, text: String },
    Delete { target: TextQuery },
    Replace { target: TextQuery, text: String },
    Move { source: TextQuery, destination: Anchor },
    Format { target: TextQuery, patch: FormatPatch },
    InsertParagraph { anchor: Anchor, text: String },
    DeleteParagraph { target: TextQuery },
}

impl Edit {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Edit::Insert { .. } => "insert",
            Edit::Delete { .. } => "delete",
            Edit::Replace { .. } => "replace",
            Edit::Move { .. } => "move",
            Edit::Format { .. } => "format",
            Edit::InsertParagraph { .. } => "insert paragraph",
            Edit::DeleteParagraph { .. } => "delete paragraph",
        }
    }
}

/// Outcome of one edit.
///
/// A successful result carries the matched text, the matched spans (as they
/// were before the edit) and the ids of the tracked changes created. A
/// failed one carries only the error.
#[derive(Debug, Clone, PartialEq)]
pub struct EditResult {
    pub success: bool,
    pub matched_text: Option<String>,
    pub applied_spans: Vec<TextSpan>,
    pub change_ids: Vec<u32>,
    pub error: Option<EditError>,
}

impl EditResult {
    fn applied(spans: Vec<TextSpan>, change_ids: Range<u32>) -> Self {
        EditResult {
            success: true,
            matched_text: spans.first().map(|span| span.text().to_owned()),
            applied_spans: spans,
            change_ids: change_ids.collect(),
            error: None,
        }
    }

    fn failed(error: EditError) -> Self {
        EditResult {
            success: false,
            matched_text: None,
            applied_spans: Vec::new(),
            change_ids: Vec::new(),
            error: Some(error),
        }
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<&'static str> { self.error.as_ref().map(EditError::kind) }
}

impl Document {
    /// Inserts `text` before or after the anchor text.
    ///
    /// # Errors
    ///
    /// Fails when the anchor cannot be resolved, the text is empty, or the
    /// insertion point lies inside deleted text or another author's
    /// insertion.
    pub fn insert(&mut self, anchor: Anchor, text: &str) -> Result<EditResult, EditError> {
        let segments = self.parse_segments(text);
        self.edit_matches("insert", anchor.query(), None, |document, found| {
            let (paragraph, mut stamp) = document.edit_paragraph(found.address())?;
            insert_segments(
                paragraph,
                anchor.offset(&found.span),
                found.span.include_deleted,
                &segments,
                None,
                &mut stamp,
            )
        })
    }

    /// Marks the target text as deleted.
    ///
    /// # Errors
    ///
    /// Fails when the target cannot be resolved or is already deleted.
    pub fn delete(&mut self, target: impl Into<TextQuery>) -> Result<EditResult, EditError> {
        let target = target.into();
        self.edit_matches("delete", &target, Some(Target::Delete), |document, found| {
            let (paragraph, mut stamp) = document.edit_paragraph(found.address())?;
            delete_range(
                paragraph,
                &found.span.range,
                found.span.include_deleted,
                &mut stamp,
            )
        })
    }

    /// Marks the target text as deleted and inserts `text` right after it.
    /// The new text takes the formatting of the first replaced character. An
    /// empty replacement only deletes.
    ///
    /// # Errors
    ///
    /// Fails when the target cannot be resolved or is already deleted.
    pub fn replace(
        &mut self,
        target: impl Into<TextQuery>,
        text: &str,
    ) -> Result<EditResult, EditError> {
        let target = target.into();
        let segments = self.parse_segments(text);

        self.edit_matches("replace", &target, Some(Target::Delete), |document, found| {
            let span = &found.span;
            let (paragraph, mut stamp) = document.edit_paragraph(found.address())?;

            let first_char = span.text().chars().next().map_or(0, char::len_utf8);
            let inherit = formatting_at(
                paragraph.content(),
                span.start() + first_char,
                span.include_deleted,
            );

            let mut created = delete_range(paragraph, &span.range, span.include_deleted, &mut stamp)?;
            if !segments.is_empty() {
                let offset = if span.include_deleted {
                    span.end()
                } else {
                    span.start()
                };
                created += insert_segments(
                    paragraph,
                    offset,
                    span.include_deleted,
                    &segments,
                    Some(inherit),
                    &mut stamp,
                )?;
            }
            Ok(created)
        })
    }

    /// Applies `patch` to the target text as a tracked format change.
    ///
    /// # Errors
    ///
    /// Fails when the patch is empty, or the target cannot be resolved or is
    /// deleted.
    pub fn format(
        &mut self,
        target: impl Into<TextQuery>,
        patch: &FormatPatch,
    ) -> Result<EditResult, EditError> {
        if patch.is_empty() {
            return Err(EditError::invalid_operation("the format change is empty"));
        }

        let target = target.into();
        self.edit_matches("format", &target, Some(Target::Format), |document, found| {
            let (paragraph, mut stamp) = document.edit_paragraph(found.address())?;
            format_range(
                paragraph,
                &found.span.range,
                found.span.include_deleted,
                patch,
                &mut stamp,
            )
        })
    }

    /// Moves the source text to the destination as a linked pair of tracked
    /// changes: the source reads as moved away, the destination as moved
    /// here. Both sides share a move name and have consecutive ids.
    ///
    /// Moves work on visible text only. The source has to be free of
    /// tracked changes and the destination must not be inside a tracked
    /// change.
    ///
    /// # Errors
    ///
    /// - [`EditError::InvalidOperation`] when the destination lies within
    ///   the source or either query selects several matches
    /// - [`EditError::AlreadyTracked`] when source or destination is tracked
    /// - the usual search errors
    pub fn move_text(
        &mut self,
        source: impl Into<TextQuery>,
        destination: Anchor,
    ) -> Result<EditResult, EditError> {
        let source = source.into().include_deleted(false);
        let destination_query = destination.query().clone().include_deleted(false);

        self.transaction("move", |document| {
            let first_id = document.next_change_id();
            let source = single_match(document.find_targets(&source, Target::MoveSource)?)?;
            let destination_match = single_match(document.find_text(&destination_query)?)?;

            let from = source.address();
            let to = destination_match.address();
            let mut range = source.span.range.clone();
            let offset = destination.offset(&destination_match.span);

            if from == to && range.start <= offset && offset <= range.end {
                return Err(EditError::invalid_operation(format!(
                    "cannot move `{}` into itself",
                    source.text()
                )));
            }

            let paragraph = document
                .paragraph(from)
                .ok_or_else(|| missing_paragraph(from))?;
            check_target(paragraph, &range, false, Target::MoveSource)?;
            let runs = span_runs(paragraph.content(), &source.span)
                .ok_or_else(|| EditError::invalid_operation("the move source is out of date"))?;

            let (from_info, to_info) = {
                let (_, mut stamp) = document.edit_paragraph(from)?;
                let from_info = stamp.next();
                let name = format!("move{}", from_info.id);
                (
                    from_info.with_move_name(name.clone()),
                    stamp.next().with_move_name(name),
                )
            };

            {
                let (paragraph, stamp) = document.edit_paragraph(to)?;
                let author = stamp.author().to_owned();
                let runs = runs.into_iter().map(|run| stamp.stamp_run(run)).collect();
                let created = insert_runs(
                    paragraph,
                    offset,
                    false,
                    ChangeKind::MoveTo,
                    runs,
                    &author,
                    &mut || to_info.clone(),
                )?;
                expect_single_wrapper(created)?;
            }

            if from == to && offset <= range.start {
                let moved = source.text().len();
                range = range.start + moved..range.end + moved;
            }

            {
                let (paragraph, _) = document.edit_paragraph(from)?;
                let created = hide_range(
                    paragraph,
                    &range,
                    false,
                    &ChangeKind::MoveFrom,
                    &mut || from_info.clone(),
                )?;
                expect_single_wrapper(created)?;
            }

            document.mark_part_modified(from.part);
            document.mark_part_modified(to.part);

            Ok(EditResult::applied(
                vec![source.span, destination_match.span],
                first_id..document.next_change_id(),
            ))
        })
    }

    /// Inserts a new paragraph holding `text` before or after the paragraph
    /// containing the anchor text. The paragraph mark and the content share
    /// one tracked insertion.
    ///
    /// # Errors
    ///
    /// Fails when the anchor cannot be resolved.
    pub fn insert_paragraph(&mut self, anchor: Anchor, text: &str) -> Result<EditResult, EditError> {
        let segments = self.parse_segments(text);

        self.edit_paragraphs("insert paragraph", anchor.query(), |document, found| {
            let address = found.address();
            let index = match anchor {
                Anchor::Before(_) => address.paragraph,
                Anchor::After(_) => address.paragraph + 1,
            };

            let (part, mut stamp) = document.edit_part(address.part)?;
            let neighbour = part
                .paragraphs
                .get(address.paragraph)
                .ok_or_else(|| missing_paragraph(address))?;

            let mut paragraph = Paragraph::new();
            if let (Some(style), None) = (neighbour.style(), neighbour.heading_level()) {
                paragraph = paragraph.with_style(style);
            }
            if let Some(cell) = neighbour.cell() {
                paragraph = paragraph.in_cell(cell);
            }

            let base = formatting_at(neighbour.content(), 0, false);
            let runs = segment_runs(&segments, &base, &stamp);
            part.paragraphs
                .insert(index, inserted_paragraph(paragraph, runs, &mut stamp));
            Ok(1)
        })
    }

    /// Marks the whole paragraph containing the target text as deleted,
    /// including its paragraph mark. A paragraph that is still a pending
    /// insertion keeps it, with the deletion recorded on top.
    ///
    /// # Errors
    ///
    /// Fails when the target cannot be resolved or the paragraph is already
    /// deleted.
    pub fn delete_paragraph(&mut self, target: impl Into<TextQuery>) -> Result<EditResult, EditError> {
        let target = target.into();

        self.edit_paragraphs("delete paragraph", &target, |document, found| {
            let (paragraph, mut stamp) = document.edit_paragraph(found.address())?;
            delete_whole_paragraph(paragraph, &mut stamp)
        })
    }

    /// Applies a single edit, reporting failures in the result.
    pub fn apply(&mut self, edit: &Edit) -> EditResult {
        let result = match edit {
            Edit::Insert { anchor, text } => self.insert(anchor.clone(), text),
            Edit::Delete { target } => self.delete(target.clone()),
            Edit::Replace { target, text } => self.replace(target.clone(), text),
            Edit::Move {
                source,
                destination,
            } => self.move_text(source.clone(), destination.clone()),
            Edit::Format { target, patch } => self.format(target.clone(), patch),
            Edit::InsertParagraph { anchor, text } => self.insert_paragraph(anchor.clone(), text),
            Edit::DeleteParagraph { target } => self.delete_paragraph(target.clone()),
        };

        result.unwrap_or_else(EditResult::failed)
    }

    /// Applies `edits` in order, each in its own transaction. Unless the
    /// configuration enables `continue_on_error`, the batch stops at the
    /// first failure with the successful prefix committed.
    pub fn apply_edits(&mut self, edits: &[Edit]) -> Vec<EditResult> {
        let continue_on_error = self.config().continue_on_error;
        self.apply_edits_with(edits, continue_on_error)
    }

    pub fn apply_edits_with(&mut self, edits: &[Edit], continue_on_error: bool) -> Vec<EditResult> {
        let mut results = Vec::with_capacity(edits.len());

        for edit in edits {
            let result = self.apply(edit);
            let failed = !result.success;
            results.push(result);

            if failed && !continue_on_error {
                break;
            }
        }

        let succeeded = results.iter().filter(|result| result.success).count();
        info!(
            "Applied {succeeded} of {} edit(s), {} attempted",
            edits.len(),
            results.len()
        );
        results
    }

    fn parse_segments(&self, text: &str) -> Vec<Segment> {
        if self.config().markdown {
            InlineMarkdown.parse(text)
        } else {
            PlainText.parse(text)
        }
    }

    /// Resolves `query` and runs `edit` on every selected match, last match
    /// first, inside one transaction.
    fn edit_matches(
        &mut self,
        label: &str,
        query: &TextQuery,
        target: Option<Target>,
        edit: impl FnMut(&mut Document, &TextMatch) -> Result<usize, EditError>,
    ) -> Result<EditResult, EditError> {
        self.edit_found(
            label,
            |document| match target {
                Some(target) => document.find_targets(query, target),
                None => document.find_text(query),
            },
            edit,
        )
    }

    /// Like [`Document::edit_matches`], but `edit` runs once per paragraph
    /// holding a match.
    fn edit_paragraphs(
        &mut self,
        label: &str,
        query: &TextQuery,
        edit: impl FnMut(&mut Document, &TextMatch) -> Result<usize, EditError>,
    ) -> Result<EditResult, EditError> {
        self.edit_found(
            label,
            |document| Ok(last_per_paragraph(document.find_text(query)?)),
            edit,
        )
    }

    fn edit_found(
        &mut self,
        label: &str,
        find: impl FnOnce(&Document) -> Result<Vec<TextMatch>, EditError>,
        mut edit: impl FnMut(&mut Document, &TextMatch) -> Result<usize, EditError>,
    ) -> Result<EditResult, EditError> {
        self.transaction(label, |document| {
            let first_id = document.next_change_id();
            let matches = find(document)?;

            for found in matches.iter().rev() {
                edit(document, found)?;
                document.mark_part_modified(found.address().part);
            }

            Ok(EditResult::applied(
                matches.into_iter().map(|found| found.span).collect(),
                first_id..document.next_change_id(),
            ))
        })
    }

    /// Like [`Document::find_text`], but when visible text does not match,
    /// a match that only exists with deleted text included is reported as
    /// [`EditError::AlreadyTracked`].
    fn find_targets(&self, query: &TextQuery, target: Target) -> Result<Vec<TextMatch>, EditError> {
        let include_deleted = query.includes_deleted(self);
        let error = match select(query, self.find_all_with(query, include_deleted)?) {
            Ok(matches) => return Ok(matches),
            Err(error) => error,
        };

        if include_deleted || !matches!(error, EditError::TextNotFound { .. }) {
            return Err(error);
        }

        for found in self.find_all_with(query, true)? {
            if let Some(paragraph) = self.paragraph(found.address()) {
                check_target(paragraph, &found.span.range, true, target)?;
            }
        }
        Err(error)
    }
}

fn single_match(mut matches: Vec<TextMatch>) -> Result<TextMatch, EditError> {
    match (matches.pop(), matches.is_empty()) {
        (Some(found), true) => Ok(found),
        _ => Err(EditError::invalid_operation(
            "a move needs exactly one source and one destination",
        )),
    }
}

/// Keeps the last of the matches sharing a paragraph. `matches` are in
/// document order.
fn last_per_paragraph(mut matches: Vec<TextMatch>) -> Vec<TextMatch> {
    matches.reverse();
    matches.dedup_by_key(|found| found.address());
    matches.reverse();
    matches
}

fn expect_single_wrapper(created: usize) -> Result<(), EditError> {
    if created == 1 {
        Ok(())
    } else {
        Err(EditError::invalid_operation(format!(
            "a move side must be a single wrapper, got {created}"
        )))
    }
}

fn missing_paragraph(address: ParagraphAddress) -> EditError {
    EditError::invalid_operation(format!("paragraph {address:?} does not exist"))
}
