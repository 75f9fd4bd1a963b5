//! The split and wrap algorithm behind every tracked edit.
//!
//! Edits address a paragraph by a logical byte range in one of the two text
//! views. Runs are split at the range ends, the guard below rejects targets
//! that cannot take the new wrapper, then the aligned runs are wrapped.

use std::ops::Range;

use log::debug;

use crate::{
    EditError,
    document::{
        ChangeStamp,
        formatting::{FormatPatch, Formatting},
        paragraph::Paragraph,
        run::Run,
        tracked::{ChangeInfo, ChangeKind, ParagraphMark, TrackedWrapper},
    },
    segments::Segment,
    text_view::{formatting_at, leaves, logical_text},
};

pub(crate) mod insert;
pub(crate) mod split;
pub(crate) mod wrap;

use insert::{PendingInsertion, insert_at};
use split::isolate;
use wrap::{WrapMode, wrap};

/// What a range is about to become, for [`check_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Delete,
    MoveSource,
    Format,
}

/// Rejects ranges that overlap text which cannot take the requested
/// wrapper: deleted or moved-away text for every target, and any tracked
/// text for move sources.
pub(crate) fn check_target(
    paragraph: &Paragraph,
    range: &Range<usize>,
    include_deleted: bool,
    target: Target,
) -> Result<(), EditError> {
    let text = logical_text(paragraph.content(), include_deleted);
    let already_tracked = |wrapper: &TrackedWrapper| EditError::AlreadyTracked {
        text: text.get(range.clone()).unwrap_or_default().to_owned(),
        id: wrapper.info.id,
        kind: wrapper.kind.name(),
    };

    for leaf in leaves(paragraph.content(), include_deleted) {
        let zero_width = leaf.len == 0;
        let inside = if zero_width {
            range.start < leaf.start && leaf.start < range.end
        } else {
            leaf.start < range.end && range.start < leaf.end()
        };
        if !inside {
            continue;
        }

        if !zero_width {
            if let Some(wrapper) = leaf.ancestors.iter().find(|wrapper| wrapper.kind.hides_text()) {
                return Err(already_tracked(*wrapper));
            }
        }

        if target == Target::MoveSource {
            if let Some(wrapper) = leaf.ancestors.first() {
                return Err(already_tracked(*wrapper));
            }
        }
    }

    Ok(())
}

/// Marks `range` as deleted, or as moved away when `kind` is
/// [`ChangeKind::MoveFrom`]. Returns the number of wrappers created.
pub(crate) fn hide_range(
    paragraph: &mut Paragraph,
    range: &Range<usize>,
    include_deleted: bool,
    kind: &ChangeKind,
    info: &mut dyn FnMut() -> ChangeInfo,
) -> Result<usize, EditError> {
    let target = if kind.is_move() {
        Target::MoveSource
    } else {
        Target::Delete
    };
    check_target(paragraph, range, include_deleted, target)?;

    let content = paragraph.content_mut();
    isolate(content, range, include_deleted);
    let created = wrap(content, range, include_deleted, WrapMode::Hide(kind), info);

    debug!("Wrapped {range:?} into {created} {kind} wrapper(s)");
    Ok(created)
}

pub(crate) fn delete_range(
    paragraph: &mut Paragraph,
    range: &Range<usize>,
    include_deleted: bool,
    stamp: &mut ChangeStamp<'_>,
) -> Result<usize, EditError> {
    hide_range(
        paragraph,
        range,
        include_deleted,
        &ChangeKind::Deletion,
        &mut || stamp.next(),
    )
}

pub(crate) fn format_range(
    paragraph: &mut Paragraph,
    range: &Range<usize>,
    include_deleted: bool,
    patch: &FormatPatch,
    stamp: &mut ChangeStamp<'_>,
) -> Result<usize, EditError> {
    check_target(paragraph, range, include_deleted, Target::Format)?;

    let content = paragraph.content_mut();
    isolate(content, range, include_deleted);
    let created = wrap(
        content,
        range,
        include_deleted,
        WrapMode::Format(patch),
        &mut || stamp.next(),
    );

    debug!("Reformatted {range:?} with {created} format change(s)");
    Ok(created)
}

/// Marks a whole paragraph as deleted, its visible text and its paragraph
/// mark. The mark shares the id of the content deletion when exactly one
/// wrapper was needed. Returns the number of change ids issued.
///
/// A paragraph that is still a pending insertion keeps its inserted mark and
/// records the deletion on top of it.
pub(crate) fn delete_whole_paragraph(
    paragraph: &mut Paragraph,
    stamp: &mut ChangeStamp<'_>,
) -> Result<usize, EditError> {
    if let Some(mark) = paragraph.mark().filter(|mark| mark.is_deleted()) {
        let (id, kind) = match &mark.deletion {
            Some(deletion) => (deletion.id, ChangeKind::Deletion.name()),
            None => (mark.info.id, mark.kind().name()),
        };
        return Err(EditError::AlreadyTracked {
            text: paragraph.text_with_deleted(),
            id,
            kind,
        });
    }

    let mut issued: Vec<ChangeInfo> = Vec::new();
    let len = paragraph.text().len();
    if len > 0 {
        hide_range(paragraph, &(0..len), false, &ChangeKind::Deletion, &mut || {
            let info = stamp.next();
            issued.push(info.clone());
            info
        })?;
    }

    let shared = match issued.as_slice() {
        [info] => Some(info.clone()),
        _ => None,
    };
    let info = shared.unwrap_or_else(|| {
        let info = stamp.next();
        issued.push(info.clone());
        info
    });

    match paragraph.mark_mut() {
        Some(mark) => mark.deletion = Some(info),
        None => paragraph.set_mark(Some(ParagraphMark::deleted(info))),
    }
    Ok(issued.len())
}

/// Turns `paragraph` into a tracked paragraph insertion holding `runs`. The
/// content wrapper and the paragraph mark share one id.
pub(crate) fn inserted_paragraph(
    mut paragraph: Paragraph,
    runs: Vec<Run>,
    stamp: &mut ChangeStamp<'_>,
) -> Paragraph {
    let info = stamp.next();
    if !runs.is_empty() {
        paragraph = paragraph.with_tracked(TrackedWrapper::with_runs(
            ChangeKind::Insertion,
            info.clone(),
            runs,
        ));
    }

    paragraph.with_mark(ParagraphMark::inserted(info))
}

/// Builds the runs for `segments`, layering each segment's flags over
/// `base`.
pub(crate) fn segment_runs(
    segments: &[Segment],
    base: &Formatting,
    stamp: &ChangeStamp<'_>,
) -> Vec<Run> {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text { text, format } => {
                stamp.stamp_run(Run::formatted(text.clone(), base.layered(format)))
            }
            Segment::Break => stamp.stamp_run(Run::line_break()),
        })
        .collect()
}

/// Inserts `segments` as a tracked insertion at logical `offset`. Inserted
/// text inherits `inherit`, or the formatting at the offset when unset.
/// Returns the number of wrappers created.
pub(crate) fn insert_segments(
    paragraph: &mut Paragraph,
    offset: usize,
    include_deleted: bool,
    segments: &[Segment],
    inherit: Option<Formatting>,
    stamp: &mut ChangeStamp<'_>,
) -> Result<usize, EditError> {
    if segments.is_empty() {
        return Err(EditError::invalid_operation("cannot insert empty text"));
    }

    let base = inherit
        .unwrap_or_else(|| formatting_at(paragraph.content(), offset, include_deleted));
    let runs = segment_runs(segments, &base, stamp);
    let author = stamp.author().to_owned();

    insert_runs(
        paragraph,
        offset,
        include_deleted,
        ChangeKind::Insertion,
        runs,
        &author,
        &mut || stamp.next(),
    )
}

/// Places `runs` inside a new wrapper of `kind` at logical `offset`, see
/// [`insert_at`].
pub(crate) fn insert_runs(
    paragraph: &mut Paragraph,
    offset: usize,
    include_deleted: bool,
    kind: ChangeKind,
    runs: Vec<Run>,
    author: &str,
    info: &mut dyn FnMut() -> ChangeInfo,
) -> Result<usize, EditError> {
    let mut pending = PendingInsertion::new(kind, runs, author, info);
    insert_at(paragraph.content_mut(), offset, include_deleted, &mut pending)?;

    debug!("Inserted at offset {offset} with {} new wrapper(s)", pending.created());
    Ok(pending.created())
}
