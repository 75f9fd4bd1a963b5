use std::collections::{BTreeMap, HashSet};

use log::{debug, error, warn};

use crate::{
    Document, EditError,
    document::tracked::{ChangeKind, Content, MarkChange, ParagraphMark, TrackedWrapper},
};

impl Document {
    /// Runs `operation` atomically: on error, or when the result breaks a
    /// structural invariant, the document is restored to its state before
    /// the call and the error is returned.
    pub(crate) fn transaction<T>(
        &mut self,
        label: &str,
        operation: impl FnOnce(&mut Document) -> Result<T, EditError>,
    ) -> Result<T, EditError> {
        let snapshot = self.clone();

        match operation(self).and_then(|value| self.validate().map(|()| value)) {
            Ok(value) => {
                debug!("Committed {label}");
                Ok(value)
            }
            Err(err) => {
                *self = snapshot;
                if matches!(err, EditError::InvariantViolation(_)) {
                    error!("Rolled back {label}: {err}");
                } else {
                    warn!("Rolled back {label}: {err}");
                }
                Err(err)
            }
        }
    }

    /// Checks the structural invariants of the tracked changes:
    ///
    /// - wrappers only nest as the nesting table allows and never inside a
    ///   wrapper of their own kind
    /// - wrapper ids are unique, as are paragraph mark ids
    /// - only an inserted paragraph mark carries a deletion
    /// - move wrappers carry a name and every name has both a move-from and
    ///   a move-to side
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvariantViolation`] describing the first
    /// violation found.
    pub fn validate(&self) -> Result<(), EditError> {
        let mut checker = Checker::default();

        for part in self.parts() {
            for paragraph in part.paragraphs() {
                checker.check_content(paragraph.content(), &mut Vec::new())?;

                if let Some(mark) = paragraph.mark() {
                    checker.check_mark(mark)?;
                }
            }
        }

        for (name, (from, to)) in checker.moves {
            if from == 0 || to == 0 {
                return Err(violation(format!(
                    "move `{name}` has {from} move-from and {to} move-to wrappers"
                )));
            }
        }

        Ok(())
    }
}

fn violation(reason: String) -> EditError { EditError::InvariantViolation(reason) }

#[derive(Debug, Default)]
struct Checker {
    wrapper_ids: HashSet<u32>,
    mark_ids: HashSet<u32>,
    moves: BTreeMap<String, (usize, usize)>,
}

impl Checker {
    fn check_mark(&mut self, mark: &ParagraphMark) -> Result<(), EditError> {
        if mark.deletion.is_some() && mark.change == MarkChange::Deleted {
            return Err(violation(format!(
                "deleted paragraph mark {} carries a second deletion",
                mark.info.id
            )));
        }

        for id in mark.ids() {
            if !self.mark_ids.insert(id) {
                return Err(violation(format!("paragraph mark id {id} is used twice")));
            }
        }
        Ok(())
    }

    fn check_content<'a>(
        &mut self,
        content: &'a [Content],
        ancestors: &mut Vec<&'a TrackedWrapper>,
    ) -> Result<(), EditError> {
        for node in content {
            let Content::Tracked(wrapper) = node else {
                continue;
            };
            self.check_wrapper(wrapper, ancestors)?;

            ancestors.push(wrapper);
            self.check_content(&wrapper.content, ancestors)?;
            ancestors.pop();
        }
        Ok(())
    }

    fn check_wrapper(
        &mut self,
        wrapper: &TrackedWrapper,
        ancestors: &[&TrackedWrapper],
    ) -> Result<(), EditError> {
        let kind = &wrapper.kind;

        if let Some(parent) = ancestors.last() {
            if !parent.kind.can_contain(kind) {
                return Err(violation(format!(
                    "{} change {} must not contain {kind} change {}",
                    parent.kind, parent.info.id, wrapper.info.id
                )));
            }
        }

        if let Some(ancestor) = ancestors
            .iter()
            .find(|ancestor| ancestor.kind.same_kind(kind))
        {
            return Err(violation(format!(
                "{kind} change {} is nested inside {kind} change {}",
                wrapper.info.id, ancestor.info.id
            )));
        }

        if !self.wrapper_ids.insert(wrapper.info.id) {
            return Err(violation(format!(
                "change id {} is used twice",
                wrapper.info.id
            )));
        }

        if kind.is_move() {
            let Some(name) = &wrapper.info.move_name else {
                return Err(violation(format!(
                    "{kind} change {} has no move name",
                    wrapper.info.id
                )));
            };

            let sides = self.moves.entry(name.clone()).or_default();
            if *kind == ChangeKind::MoveFrom {
                sides.0 += 1;
            } else {
                sides.1 += 1;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::document::{paragraph::Paragraph, run::Run, tracked::ChangeInfo};

    fn info(id: u32) -> ChangeInfo {
        ChangeInfo::new(id, "Reviewer", Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    }

    fn document_with(wrapper: TrackedWrapper) -> Document {
        Document::new(vec![Paragraph::new().with_tracked(wrapper)])
    }

    #[test]
    fn test_deletion_inside_deletion_is_invalid() {
        let document = document_with(TrackedWrapper::new(
            ChangeKind::Deletion,
            info(1),
            vec![TrackedWrapper::with_runs(ChangeKind::Deletion, info(2), vec![Run::new("x")]).into()],
        ));

        assert!(matches!(
            document.validate(),
            Err(EditError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_same_kind_deeper_down_is_invalid() {
        let document = document_with(TrackedWrapper::new(
            ChangeKind::Insertion,
            info(1),
            vec![
                TrackedWrapper::new(
                    ChangeKind::FormatChange {
                        previous: Default::default(),
                    },
                    info(2),
                    vec![
                        TrackedWrapper::with_runs(ChangeKind::Insertion, info(3), vec![Run::new("x")])
                            .into(),
                    ],
                )
                .into(),
            ],
        ));

        assert!(document.validate().is_err());
    }

    #[test]
    fn test_duplicate_ids_and_unpaired_moves() {
        let document = Document::new(vec![
            Paragraph::new()
                .with_tracked(TrackedWrapper::with_runs(ChangeKind::Insertion, info(1), vec![Run::new("a")]))
                .with_tracked(TrackedWrapper::with_runs(ChangeKind::Deletion, info(1), vec![Run::new("b")])),
        ]);
        assert_eq!(
            document.validate(),
            Err(EditError::InvariantViolation("change id 1 is used twice".to_owned()))
        );

        let document = document_with(TrackedWrapper::with_runs(
            ChangeKind::MoveFrom,
            info(1).with_move_name("move1"),
            vec![Run::new("a")],
        ));
        assert_eq!(
            document.validate(),
            Err(EditError::InvariantViolation(
                "move `move1` has 1 move-from and 0 move-to wrappers".to_owned()
            ))
        );
    }

    #[test]
    fn test_paragraph_mark_deletions() {
        let inserted = ParagraphMark {
            deletion: Some(info(2)),
            ..ParagraphMark::inserted(info(1))
        };
        let document = Document::new(vec![Paragraph::from_text("a").with_mark(inserted)]);
        assert_eq!(document.validate(), Ok(()));

        let deleted = ParagraphMark {
            deletion: Some(info(2)),
            ..ParagraphMark::deleted(info(1))
        };
        let document = Document::new(vec![Paragraph::from_text("a").with_mark(deleted)]);
        assert!(document.validate().is_err());

        let reused = ParagraphMark {
            deletion: Some(info(1)),
            ..ParagraphMark::inserted(info(1))
        };
        let document = Document::new(vec![Paragraph::from_text("a").with_mark(reused)]);
        assert_eq!(
            document.validate(),
            Err(EditError::InvariantViolation("paragraph mark id 1 is used twice".to_owned()))
        );
    }

    #[test]
    fn test_transaction_restores_on_error() {
        let mut document = Document::from_texts(["Hello"]);
        let before = document.clone();

        let result: Result<(), EditError> = document.transaction("failing edit", |document| {
            document.parts_mut()[0].paragraphs[0] = Paragraph::from_text("changed");
            document.mark_part_modified(0);
            Err(EditError::invalid_operation("stop"))
        });

        assert!(result.is_err());
        assert_eq!(document, before);
        assert_eq!(document.modified_parts().count(), 0);
    }

    #[test]
    fn test_transaction_restores_on_invariant_violation() {
        let mut document = Document::from_texts(["Hello"]);
        let before = document.clone();

        let result = document.transaction("broken edit", |document| {
            document.parts_mut()[0].paragraphs[0] = Paragraph::new().with_tracked(
                TrackedWrapper::with_runs(ChangeKind::MoveTo, info(5), vec![Run::new("x")]),
            );
            Ok(())
        });

        assert!(matches!(result, Err(EditError::InvariantViolation(_))));
        assert_eq!(document, before);
    }
}
