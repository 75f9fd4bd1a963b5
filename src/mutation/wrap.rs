use std::ops::Range;

use crate::{
    document::{
        formatting::{FormatPatch, Formatting},
        run::Run,
        tracked::{ChangeInfo, ChangeKind, Content, TrackedWrapper},
    },
    text_view::node_len,
};

/// What wrapping a range of runs records.
#[derive(Debug, Clone, Copy)]
pub(crate) enum WrapMode<'a> {
    /// Marks the runs as deleted or moved away
    Hide(&'a ChangeKind),
    Format(&'a FormatPatch),
}

/// Wraps every run fully inside `range` into new tracked change wrappers.
/// The range has to be isolated first.
///
/// Runs already inside an insertion or a format change get the new wrapper
/// nested inside that wrapper. Formatting runs that belong to a pending
/// insertion or format change rewrites them in place. Returns the number of
/// wrappers created.
pub(crate) fn wrap(
    content: &mut Vec<Content>,
    range: &Range<usize>,
    include_deleted: bool,
    mode: WrapMode<'_>,
    info: &mut dyn FnMut() -> ChangeInfo,
) -> usize {
    let mut level = Level {
        include_deleted,
        mode,
        info,
        created: 0,
    };
    level.wrap(content, range, false, false);
    level.created
}

struct Level<'a, 'b> {
    include_deleted: bool,
    mode: WrapMode<'a>,
    info: &'b mut dyn FnMut() -> ChangeInfo,
    created: usize,
}

/// Runs collected for the next wrapper of a level.
#[derive(Default)]
struct Group {
    runs: Vec<Content>,

    /// Formatting the grouped runs had before a format change
    previous: Option<Formatting>,
}

impl Level<'_, '_> {
    fn wrap(&mut self, content: &mut Vec<Content>, range: &Range<usize>, hidden: bool, direct: bool) {
        let mut result = Vec::with_capacity(content.len());
        let mut group = Group::default();
        let mut position = 0;

        for node in content.drain(..) {
            let len = node_len(&node, self.include_deleted, hidden);
            let (start, end) = (position, position + len);
            position = end;

            let covered = len > 0 && range.start <= start && end <= range.end;
            let overlaps = len > 0 && start < range.end && range.start < end;

            match node {
                Content::Run(run) if covered => self.wrap_run(run, direct, &mut group, &mut result),
                Content::Tracked(mut wrapper) if overlaps => {
                    self.flush(&mut group, &mut result);

                    let direct = direct
                        || (matches!(self.mode, WrapMode::Format(_)) && !wrapper.kind.hides_text());
                    let inner = range.start.saturating_sub(start)..range.end - start;
                    self.wrap(
                        &mut wrapper.content,
                        &inner,
                        hidden || wrapper.kind.hides_text(),
                        direct,
                    );
                    result.push(Content::Tracked(wrapper));
                }
                node => {
                    self.flush(&mut group, &mut result);
                    result.push(node);
                }
            }
        }

        self.flush(&mut group, &mut result);
        *content = result;
    }

    fn wrap_run(&mut self, mut run: Run, direct: bool, group: &mut Group, result: &mut Vec<Content>) {
        let patch = match self.mode {
            WrapMode::Hide(_) => {
                group.runs.push(Content::Run(run));
                return;
            }
            WrapMode::Format(patch) => patch,
        };

        let format = patch.apply(run.format());
        if direct {
            run.set_format(format);
            result.push(Content::Run(run));
            return;
        }

        if format == *run.format() {
            self.flush(group, result);
            result.push(Content::Run(run));
            return;
        }

        if group.previous.as_ref() != Some(run.format()) {
            self.flush(group, result);
            group.previous = Some(run.format().clone());
        }
        run.set_format(format);
        group.runs.push(Content::Run(run));
    }

    fn flush(&mut self, group: &mut Group, result: &mut Vec<Content>) {
        let previous = group.previous.take();
        if group.runs.is_empty() {
            return;
        }

        let kind = match self.mode {
            WrapMode::Hide(kind) => kind.clone(),
            WrapMode::Format(_) => ChangeKind::FormatChange {
                previous: previous.unwrap_or_default(),
            },
        };

        self.created += 1;
        result.push(Content::Tracked(TrackedWrapper::new(
            kind,
            (self.info)(),
            core::mem::take(&mut group.runs),
        )));
    }
}
