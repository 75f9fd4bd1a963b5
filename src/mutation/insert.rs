use crate::{
    EditError,
    document::{
        run::Run,
        tracked::{ChangeInfo, ChangeKind, Content, TrackedWrapper},
    },
    text_view::node_len,
};

/// Runs waiting to be placed at an insertion point.
pub(crate) struct PendingInsertion<'a> {
    kind: ChangeKind,
    runs: Vec<Run>,
    author: &'a str,
    info: &'a mut dyn FnMut() -> ChangeInfo,
    created: usize,
}

impl<'a> PendingInsertion<'a> {
    /// `kind` is either [`ChangeKind::Insertion`] or [`ChangeKind::MoveTo`].
    pub(crate) fn new(
        kind: ChangeKind,
        runs: Vec<Run>,
        author: &'a str,
        info: &'a mut dyn FnMut() -> ChangeInfo,
    ) -> Self {
        debug_assert!(
            matches!(kind, ChangeKind::Insertion | ChangeKind::MoveTo),
            "Only insertions and move destinations add text"
        );

        PendingInsertion {
            kind,
            runs,
            author,
            info,
            created: 0,
        }
    }

    /// Number of wrappers created by [`insert_at`].
    pub(crate) fn created(&self) -> usize { self.created }

    fn nodes(&mut self, merged: bool) -> Vec<Content> {
        let runs = core::mem::take(&mut self.runs);
        if merged {
            return runs.into_iter().map(Content::Run).collect();
        }

        self.created += 1;
        vec![Content::Tracked(TrackedWrapper::with_runs(
            self.kind.clone(),
            (self.info)(),
            runs,
        ))]
    }
}

/// Places the pending runs at logical `offset`.
///
/// Content that is zero-width in the view (deleted text when
/// `include_deleted` is unset) and sits exactly at the offset stays before
/// the new text. An offset strictly inside a wrapper nests the new text
/// into it where the nesting rules allow it:
///
/// - inside an insertion by the same author the runs join that insertion
/// - inside a format change a new insertion is nested
/// - anything else is [`EditError::AlreadyTracked`]
pub(crate) fn insert_at(
    content: &mut Vec<Content>,
    offset: usize,
    include_deleted: bool,
    pending: &mut PendingInsertion<'_>,
) -> Result<(), EditError> {
    place(content, offset, include_deleted, false, false, pending)
}

fn place(
    content: &mut Vec<Content>,
    offset: usize,
    include_deleted: bool,
    hidden: bool,
    merged: bool,
    pending: &mut PendingInsertion<'_>,
) -> Result<(), EditError> {
    let mut position = 0;

    for index in 0..content.len() {
        let len = node_len(&content[index], include_deleted, hidden);
        let (start, end) = (position, position + len);
        position = end;

        if end <= offset {
            continue;
        }

        if start >= offset {
            let nodes = pending.nodes(merged);
            content.splice(index..index, nodes);
            return Ok(());
        }

        let tail = match &mut content[index] {
            Content::Run(run) => run.split_off(offset - start).ok_or_else(|| {
                EditError::invalid_operation(format!(
                    "offset {offset} is not on a character boundary"
                ))
            })?,
            Content::Tracked(wrapper) => {
                return place_inside(wrapper, offset - start, include_deleted, hidden, merged, pending);
            }
        };

        let mut nodes = pending.nodes(merged);
        nodes.push(Content::Run(tail));
        content.splice(index + 1..index + 1, nodes);
        return Ok(());
    }

    if offset > position {
        return Err(EditError::invalid_operation(format!(
            "offset {offset} is past the end of the text"
        )));
    }

    let nodes = pending.nodes(merged);
    content.extend(nodes);
    Ok(())
}

fn place_inside(
    wrapper: &mut TrackedWrapper,
    offset: usize,
    include_deleted: bool,
    hidden: bool,
    merged: bool,
    pending: &mut PendingInsertion<'_>,
) -> Result<(), EditError> {
    let already_tracked = || EditError::AlreadyTracked {
        text: wrapper.text(),
        id: wrapper.info.id,
        kind: wrapper.kind.name(),
    };

    let nested = match (&wrapper.kind, &pending.kind) {
        (kind, _) if kind.hides_text() => return Err(already_tracked()),
        (ChangeKind::Insertion | ChangeKind::MoveTo, _) if merged => true,
        (ChangeKind::Insertion, ChangeKind::Insertion) if wrapper.info.author == pending.author => {
            true
        }
        (ChangeKind::FormatChange { .. }, ChangeKind::Insertion) => merged,
        _ => return Err(already_tracked()),
    };

    let hidden = hidden || wrapper.kind.hides_text();
    place(&mut wrapper.content, offset, include_deleted, hidden, nested, pending)
}
