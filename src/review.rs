//! Accepting and rejecting tracked changes.
//!
//! | kind          | accept                       | reject                          |
//! |---------------|------------------------------|---------------------------------|
//! | insertion     | unwrap                       | remove with content             |
//! | deletion      | remove with content          | unwrap                          |
//! | move-from     | remove with content          | unwrap                          |
//! | move-to       | unwrap                       | remove with content             |
//! | format change | unwrap, keep new formatting  | unwrap, restore old formatting  |
//!
//! A paragraph mark that ends up removed (an accepted deletion or a rejected
//! insertion) removes its paragraph. Whatever content the paragraph still has
//! is joined onto the next paragraph, or onto the previous one for the last
//! paragraph of a part.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::{
    Document, EditError,
    document::{
        paragraph::Paragraph,
        tracked::{ChangeKind, Content, MarkChange, ParagraphMark, TrackedWrapper},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Accept,
    Reject,
}

impl Decision {
    fn verb(self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Reject => "reject",
        }
    }
}

/// What a tracked change is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTarget {
    Content,
    ParagraphMark,
}

/// A pending tracked change as listed by [`Document::tracked_changes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedChange {
    pub id: u32,
    pub kind: ChangeKind,
    pub author: String,
    pub date: DateTime<Utc>,
    pub move_name: Option<String>,

    /// Every character below the wrapper, empty for paragraph marks
    pub text: String,
    pub part: String,
    pub paragraph: usize,
    pub target: ChangeTarget,
}

impl Document {
    /// Every pending tracked change in document order. Wrappers are listed
    /// before the wrappers nested in them, paragraph marks after the content
    /// of their paragraph.
    #[must_use]
    pub fn tracked_changes(&self) -> Vec<TrackedChange> {
        fn collect(
            content: &[Content],
            part: &str,
            paragraph: usize,
            changes: &mut Vec<TrackedChange>,
        ) {
            for node in content {
                if let Content::Tracked(wrapper) = node {
                    changes.push(TrackedChange {
                        id: wrapper.info.id,
                        kind: wrapper.kind.clone(),
                        author: wrapper.info.author.clone(),
                        date: wrapper.info.date,
                        move_name: wrapper.info.move_name.clone(),
                        text: wrapper.text(),
                        part: part.to_owned(),
                        paragraph,
                        target: ChangeTarget::Content,
                    });
                    collect(&wrapper.content, part, paragraph, changes);
                }
            }
        }

        let mut changes = Vec::new();
        for part in self.parts() {
            for (index, paragraph) in part.paragraphs().iter().enumerate() {
                collect(paragraph.content(), part.name(), index, &mut changes);

                let Some(mark) = paragraph.mark() else {
                    continue;
                };
                let deletion = mark
                    .deletion
                    .as_ref()
                    .map(|info| (info, ChangeKind::Deletion));
                for (info, kind) in std::iter::once((&mark.info, mark.kind())).chain(deletion) {
                    changes.push(TrackedChange {
                        id: info.id,
                        kind,
                        author: info.author.clone(),
                        date: info.date,
                        move_name: None,
                        text: String::new(),
                        part: part.name().to_owned(),
                        paragraph: index,
                        target: ChangeTarget::ParagraphMark,
                    });
                }
            }
        }
        changes
    }

    /// Accepts the change with `id`, including a paragraph mark sharing it.
    ///
    /// # Errors
    ///
    /// - [`EditError::ChangeNotFound`] when no pending change has the id
    /// - [`EditError::InvalidOperation`] for one half of a move, see
    ///   [`Document::accept_move`]
    pub fn accept_change(&mut self, id: u32) -> Result<(), EditError> {
        self.resolve_change(id, Decision::Accept)
    }

    /// Rejects the change with `id`, see [`Document::accept_change`].
    ///
    /// # Errors
    ///
    /// Same as [`Document::accept_change`].
    pub fn reject_change(&mut self, id: u32) -> Result<(), EditError> {
        self.resolve_change(id, Decision::Reject)
    }

    /// Accepts every listed change that is still pending, returning how many
    /// were resolved.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidOperation`] when only one half of a move
    /// is listed.
    pub fn accept_changes(&mut self, ids: &[u32]) -> Result<usize, EditError> {
        self.resolve_selected("accept changes", Decision::Accept, |change| {
            ids.contains(&change.id)
        })
    }

    /// Rejects every listed change that is still pending.
    ///
    /// # Errors
    ///
    /// Same as [`Document::accept_changes`].
    pub fn reject_changes(&mut self, ids: &[u32]) -> Result<usize, EditError> {
        self.resolve_selected("reject changes", Decision::Reject, |change| {
            ids.contains(&change.id)
        })
    }

    /// Accepts both halves of the move called `name`: the text stays only at
    /// the destination.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidOperation`] when no move has the name.
    pub fn accept_move(&mut self, name: &str) -> Result<usize, EditError> {
        self.resolve_move(name, Decision::Accept)
    }

    /// Rejects both halves of the move called `name`: the text stays only at
    /// the source.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidOperation`] when no move has the name.
    pub fn reject_move(&mut self, name: &str) -> Result<usize, EditError> {
        self.resolve_move(name, Decision::Reject)
    }

    /// # Errors
    ///
    /// Only fails when the result would break a structural invariant.
    pub fn accept_all(&mut self) -> Result<usize, EditError> {
        self.resolve_selected("accept all", Decision::Accept, |_| true)
    }

    /// # Errors
    ///
    /// Only fails when the result would break a structural invariant.
    pub fn reject_all(&mut self) -> Result<usize, EditError> {
        self.resolve_selected("reject all", Decision::Reject, |_| true)
    }

    /// Accepts every change made by `author`.
    ///
    /// # Errors
    ///
    /// Same as [`Document::accept_changes`].
    pub fn accept_by_author(&mut self, author: &str) -> Result<usize, EditError> {
        self.resolve_selected("accept by author", Decision::Accept, |change| {
            change.author == author
        })
    }

    /// Rejects every change made by `author`.
    ///
    /// # Errors
    ///
    /// Same as [`Document::accept_changes`].
    pub fn reject_by_author(&mut self, author: &str) -> Result<usize, EditError> {
        self.resolve_selected("reject by author", Decision::Reject, |change| {
            change.author == author
        })
    }

    fn resolve_change(&mut self, id: u32, decision: Decision) -> Result<(), EditError> {
        let changes = self.tracked_changes();
        if !changes.iter().any(|change| change.id == id) {
            return Err(EditError::ChangeNotFound(id));
        }

        let selected = BTreeSet::from([id]);
        check_move_pairs(&changes, &selected)?;

        let label = format!("{} change {id}", decision.verb());
        self.transaction(&label, |document| {
            document.resolve_id(id, decision);
            Ok(())
        })
    }

    fn resolve_move(&mut self, name: &str, decision: Decision) -> Result<usize, EditError> {
        let found = self
            .tracked_changes()
            .iter()
            .any(|change| change.move_name.as_deref() == Some(name));
        if !found {
            return Err(EditError::invalid_operation(format!(
                "no pending move is named `{name}`"
            )));
        }

        let label = format!("{} move {name}", decision.verb());
        self.resolve_selected(&label, decision, |change| {
            change.move_name.as_deref() == Some(name)
        })
    }

    /// Resolves the selected changes one id at a time, in reverse document
    /// order. Ids that disappear along the way are skipped.
    fn resolve_selected(
        &mut self,
        label: &str,
        decision: Decision,
        select: impl Fn(&TrackedChange) -> bool,
    ) -> Result<usize, EditError> {
        let changes = self.tracked_changes();

        let mut seen = BTreeSet::new();
        let ids = changes
            .iter()
            .filter(|change| select(change))
            .map(|change| change.id)
            .filter(|id| seen.insert(*id))
            .collect::<Vec<_>>();

        check_move_pairs(&changes, &seen)?;

        let resolved = self.transaction(label, |document| {
            Ok(ids
                .iter()
                .rev()
                .filter(|id| document.resolve_id(**id, decision))
                .count())
        })?;

        info!("Resolved {resolved} tracked change(s) ({label})");
        Ok(resolved)
    }

    /// Resolves every wrapper and paragraph mark with `id`. Returns whether
    /// anything carried the id.
    fn resolve_id(&mut self, id: u32, decision: Decision) -> bool {
        let mut touched_parts = Vec::new();

        for (index, part) in self.parts_mut().iter_mut().enumerate() {
            let mut touched = false;
            for paragraph in &mut part.paragraphs {
                touched |= resolve_content(paragraph.content_mut(), id, decision);
            }
            touched |= resolve_marks(&mut part.paragraphs, id, decision);

            if touched {
                for paragraph in &mut part.paragraphs {
                    paragraph.coalesce_runs();
                }
                touched_parts.push(index);
            }
        }

        for index in &touched_parts {
            self.mark_part_modified(*index);
        }

        debug!("Resolved change {id} ({}) in {} part(s)", decision.verb(), touched_parts.len());
        !touched_parts.is_empty()
    }
}

/// A move half may only be resolved together with its counterpart.
fn check_move_pairs(changes: &[TrackedChange], selected: &BTreeSet<u32>) -> Result<(), EditError> {
    for change in changes.iter().filter(|change| selected.contains(&change.id)) {
        let Some(name) = change.move_name.as_deref() else {
            continue;
        };

        let unresolved_partner = changes.iter().find(|other| {
            other.move_name.as_deref() == Some(name)
                && !other.kind.same_kind(&change.kind)
                && !selected.contains(&other.id)
        });

        if let Some(partner) = unresolved_partner {
            return Err(EditError::invalid_operation(format!(
                "change {} is one half of move `{name}`, resolve it together with change {}",
                change.id, partner.id
            )));
        }
    }
    Ok(())
}

fn resolve_content(content: &mut Vec<Content>, id: u32, decision: Decision) -> bool {
    let mut touched = false;
    let mut result = Vec::with_capacity(content.len());

    for node in content.drain(..) {
        let mut wrapper = match node {
            Content::Tracked(wrapper) => wrapper,
            node @ Content::Run(_) => {
                result.push(node);
                continue;
            }
        };

        touched |= resolve_content(&mut wrapper.content, id, decision);
        if wrapper.info.id != id {
            result.push(Content::Tracked(wrapper));
            continue;
        }

        touched = true;
        if let Some(content) = resolve_wrapper(wrapper, decision) {
            result.extend(content);
        }
    }

    *content = result;
    touched
}

/// The content replacing a resolved wrapper, `None` when it is removed.
fn resolve_wrapper(wrapper: TrackedWrapper, decision: Decision) -> Option<Vec<Content>> {
    let TrackedWrapper {
        kind, mut content, ..
    } = wrapper;

    match (kind, decision) {
        (ChangeKind::Insertion | ChangeKind::MoveTo, Decision::Accept)
        | (ChangeKind::Deletion | ChangeKind::MoveFrom, Decision::Reject)
        | (ChangeKind::FormatChange { .. }, Decision::Accept) => Some(content),
        (ChangeKind::Insertion | ChangeKind::MoveTo, Decision::Reject)
        | (ChangeKind::Deletion | ChangeKind::MoveFrom, Decision::Accept) => None,
        (ChangeKind::FormatChange { previous }, Decision::Reject) => {
            for node in &mut content {
                node.for_each_run_mut(&mut |run| run.set_format(previous.clone()));
            }
            Some(content)
        }
    }
}

/// What resolving a paragraph mark leaves behind.
enum MarkOutcome {
    Keep(Option<ParagraphMark>),
    Remove,
}

fn resolve_mark(mark: &ParagraphMark, id: u32, decision: Decision) -> Option<MarkOutcome> {
    if mark.deletion.as_ref().is_some_and(|deletion| deletion.id == id) {
        return Some(match decision {
            Decision::Accept => MarkOutcome::Remove,
            Decision::Reject => MarkOutcome::Keep(Some(ParagraphMark::inserted(mark.info.clone()))),
        });
    }
    if mark.info.id != id {
        return None;
    }

    Some(match (mark.change, decision) {
        (MarkChange::Inserted, Decision::Accept) => {
            MarkOutcome::Keep(mark.deletion.clone().map(ParagraphMark::deleted))
        }
        (MarkChange::Deleted, Decision::Reject) => MarkOutcome::Keep(None),
        (MarkChange::Inserted, Decision::Reject) | (MarkChange::Deleted, Decision::Accept) => {
            MarkOutcome::Remove
        }
    })
}

fn resolve_marks(paragraphs: &mut Vec<Paragraph>, id: u32, decision: Decision) -> bool {
    let mut touched = false;

    for index in (0..paragraphs.len()).rev() {
        let Some(outcome) = paragraphs[index]
            .mark()
            .and_then(|mark| resolve_mark(mark, id, decision))
        else {
            continue;
        };
        touched = true;

        match outcome {
            MarkOutcome::Keep(mark) => {
                paragraphs[index].set_mark(mark);
                continue;
            }
            MarkOutcome::Remove if paragraphs.len() == 1 => {
                paragraphs[index].set_mark(None);
                continue;
            }
            MarkOutcome::Remove => {}
        }

        let mut removed = paragraphs.remove(index);
        let remaining = removed.take_content();
        if remaining.is_empty() {
            continue;
        }

        if let Some(next) = paragraphs.get_mut(index) {
            let content = next.content_mut();
            content.splice(0..0, remaining);
        } else if let Some(previous) = index.checked_sub(1).and_then(|index| paragraphs.get_mut(index)) {
            previous.content_mut().extend(remaining);
        }
    }

    touched
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        EditorConfig,
        document::{
            formatting::{FormatPatch, Formatting},
            run::Run,
            tracked::ChangeInfo,
        },
        editor::Anchor,
    };

    fn config() -> EditorConfig {
        EditorConfig::default()
            .with_author("Editor")
            .with_date(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    }

    fn document(texts: &[&str]) -> Document { Document::from_texts(texts).with_config(config()) }

    #[test]
    fn test_insert_then_accept_is_plain_text() {
        let mut document = document(&["Hello world"]);
        document.insert(Anchor::after("Hello"), " brave").unwrap();

        assert_snapshot!(document.to_string(), @"Hello[+ brave+] world");
        document.accept_change(1).unwrap();
        assert_snapshot!(document.to_string(), @"Hello brave world");
        assert!(document.tracked_changes().is_empty());
    }

    #[test]
    fn test_delete_then_reject_restores_original() {
        let mut document = document(&["Hello brave world"]);
        let original = document.parts()[0].clone();

        document.delete("brave ").unwrap();
        document.reject_all().unwrap();

        assert_eq!(document.parts()[0], original);
    }

    #[test]
    fn test_rejecting_format_change_restores_formatting() {
        let mut document = Document::new(vec![
            Paragraph::new()
                .with_run(Run::new("plain "))
                .with_run(Run::formatted("bold", Formatting::default().with_bold())),
        ])
        .with_config(config());
        let original = document.parts()[0].clone();

        document
            .format("plain bold", &FormatPatch::default().italic(true))
            .unwrap();
        assert_eq!(document.tracked_changes().len(), 2);

        document.reject_all().unwrap();
        assert_eq!(document.parts()[0], original);
    }

    #[test]
    fn test_accepting_format_change_keeps_formatting() {
        let mut document = document(&["some text"]);
        document
            .format("text", &FormatPatch::default().underline(true))
            .unwrap();
        document.accept_all().unwrap();

        let paragraph = &document.parts()[0].paragraphs()[0];
        assert_eq!(paragraph.content().len(), 2);
        assert_eq!(
            paragraph.content()[1],
            Content::Run(Run::formatted("text", Formatting::default().with_underline()))
        );
    }

    #[test]
    fn test_paragraph_marks() {
        let mut document = document(&["First", "Second", "Third"]);
        document.delete_paragraph("Second").unwrap();
        document
            .insert_paragraph(Anchor::after("Third"), "Fourth")
            .unwrap();

        assert_snapshot!(document.to_string(), @r"
        First
        [-Second-][-¶-]
        Third
        [+Fourth+][+¶+]
        ");

        let marks = document
            .tracked_changes()
            .into_iter()
            .filter(|change| change.target == ChangeTarget::ParagraphMark)
            .map(|change| change.id)
            .collect::<Vec<_>>();
        assert_eq!(marks, vec![1, 2]);

        let mut accepted = document.clone();
        accepted.accept_all().unwrap();
        assert_eq!(accepted.text(), "First\nThird\nFourth");

        document.reject_all().unwrap();
        assert_eq!(document.text(), "First\nSecond\nThird");
    }

    #[test]
    fn test_removed_mark_joins_remaining_content_onto_next_paragraph() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut document = Document::new(vec![
            Paragraph::from_text("keep ").with_mark(ParagraphMark::deleted(ChangeInfo::new(
                3, "Reviewer", date,
            ))),
            Paragraph::from_text("next"),
        ]);

        document.accept_change(3).unwrap();
        assert_eq!(document.text(), "keep next");
        assert_eq!(document.parts()[0].paragraphs().len(), 1);
    }

    #[test]
    fn test_deleted_insertion_mark() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mark = ParagraphMark {
            deletion: Some(ChangeInfo::new(4, "Bob", date)),
            ..ParagraphMark::inserted(ChangeInfo::new(3, "Alice", date))
        };
        let document = Document::new(vec![
            Paragraph::from_text("first"),
            Paragraph::new()
                .with_tracked(TrackedWrapper::new(
                    ChangeKind::Insertion,
                    ChangeInfo::new(3, "Alice", date),
                    vec![Content::Tracked(TrackedWrapper::with_runs(
                        ChangeKind::Deletion,
                        ChangeInfo::new(4, "Bob", date),
                        vec![Run::new("added")],
                    ))],
                ))
                .with_mark(mark),
            Paragraph::from_text("last"),
        ]);
        assert_snapshot!(document.to_string(), @r"
        first
        [+[-added-]+][+[-¶-]+]
        last
        ");

        let marks = document
            .tracked_changes()
            .into_iter()
            .filter(|change| change.target == ChangeTarget::ParagraphMark)
            .map(|change| (change.id, change.kind))
            .collect::<Vec<_>>();
        assert_eq!(marks, vec![(3, ChangeKind::Insertion), (4, ChangeKind::Deletion)]);

        let mut rejected = document.clone();
        rejected.reject_change(4).unwrap();
        assert_snapshot!(rejected.to_string(), @r"
        first
        [+added+][+¶+]
        last
        ");

        let mut accepted = document.clone();
        accepted.accept_change(3).unwrap();
        assert_snapshot!(accepted.to_string(), @r"
        first
        [-added-][-¶-]
        last
        ");
        accepted.accept_change(4).unwrap();
        assert_eq!(accepted.text(), "first\nlast");

        let mut removed = document;
        removed.reject_change(3).unwrap();
        assert_eq!(removed.text(), "first\nlast");
    }

    #[test]
    fn test_unknown_ids() {
        let mut document = document(&["text"]);
        assert_eq!(document.accept_change(7), Err(EditError::ChangeNotFound(7)));
        assert_eq!(document.reject_changes(&[7, 8]), Ok(0));
        assert!(document.accept_move("move1").is_err());
    }

    #[test]
    fn test_by_author() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut document = Document::new(vec![
            Paragraph::new()
                .with_run(Run::new("a"))
                .with_tracked(TrackedWrapper::with_runs(
                    ChangeKind::Insertion,
                    ChangeInfo::new(1, "Alice", date),
                    vec![Run::new("b")],
                ))
                .with_tracked(TrackedWrapper::with_runs(
                    ChangeKind::Insertion,
                    ChangeInfo::new(2, "Bob", date),
                    vec![Run::new("c")],
                )),
        ]);

        assert_eq!(document.reject_by_author("Bob"), Ok(1));
        assert_eq!(document.accept_by_author("Alice"), Ok(1));
        assert_eq!(document.text(), "ab");
        assert_eq!(document.parts()[0].paragraphs()[0].content().len(), 1);
    }
}
