use std::ops::Range;

use crate::{
    document::tracked::Content,
    text_view::node_len,
};

/// Splits runs so that both ends of `range` fall on node boundaries at every
/// nesting level. The logical text is unchanged.
pub(crate) fn isolate(content: &mut Vec<Content>, range: &Range<usize>, include_deleted: bool) {
    split_at(content, range.end, include_deleted, false);
    split_at(content, range.start, include_deleted, false);
}

fn split_at(content: &mut Vec<Content>, offset: usize, include_deleted: bool, hidden: bool) {
    let mut position = 0;

    for index in 0..content.len() {
        let len = node_len(&content[index], include_deleted, hidden);
        if position < offset && offset < position + len {
            let tail = match &mut content[index] {
                Content::Run(run) => run.split_off(offset - position),
                Content::Tracked(wrapper) => {
                    let hidden = hidden || wrapper.kind.hides_text();
                    split_at(&mut wrapper.content, offset - position, include_deleted, hidden);
                    None
                }
            };

            if let Some(tail) = tail {
                content.insert(index + 1, Content::Run(tail));
            }
            return;
        }
        position += len;
    }
}
