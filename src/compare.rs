//! Redlining one document against another.
//!
//! Paragraphs are aligned by their visible text with Myers' diff. Within a
//! hunk of changed paragraphs, removed and added paragraphs are paired by
//! position: a pair becomes a deletion of the old text plus an insertion of
//! the new text in place, leftovers become tracked paragraph deletions or
//! insertions.

use log::{debug, info};

use crate::{
    Document, EditError,
    document::{paragraph::Paragraph, part::Part, tracked::ChangeKind},
    mutation::{delete_range, delete_whole_paragraph, insert_runs, inserted_paragraph},
    text_view::visible_runs,
};

pub(crate) mod myers;

use myers::{DiffOp, diff};

/// The result of [`compare`]: a copy of the original carrying the
/// differences as tracked changes.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub document: Document,

    /// Number of tracked changes created
    pub changes: usize,
}

/// Redlines a copy of `original` so that accepting every change yields the
/// text of `modified`.
///
/// # Errors
///
/// Only fails when the result would break a structural invariant.
pub fn compare(original: &Document, modified: &Document) -> Result<Comparison, EditError> {
    let mut document = original.clone();
    let changes = document.redline_against(modified)?;
    Ok(Comparison { document, changes })
}

/// Changed paragraphs between two unchanged ones.
#[derive(Debug, Default)]
struct Hunk {
    /// Indices into the original part
    removed: Vec<usize>,

    /// Indices into the modified part
    added: Vec<usize>,

    /// Where unpaired additions go in the original part
    position: usize,
}

impl Hunk {
    fn is_empty(&self) -> bool { self.removed.is_empty() && self.added.is_empty() }
}

impl Document {
    /// Records the differences to `modified` as tracked changes made by the
    /// configured author, returning how many were created. Parts are paired
    /// by name; parts that only exist in `modified` are ignored.
    ///
    /// # Errors
    ///
    /// Only fails when the result would break a structural invariant.
    pub fn redline_against(&mut self, modified: &Document) -> Result<usize, EditError> {
        let normalize = self.config().compare_normalize_whitespace;

        let changes = self.transaction("compare", |document| {
            let mut changes = 0;

            for index in 0..document.parts().len() {
                let name = document.parts()[index].name();
                let Some(other) = modified.parts().iter().find(|part| part.name() == name) else {
                    debug!("Part {name} has no counterpart, skipping it");
                    continue;
                };

                let created = document.redline_part(index, other, normalize)?;
                if created > 0 {
                    document.mark_part_modified(index);
                }
                changes += created;
            }

            Ok(changes)
        })?;

        info!("Comparison created {changes} tracked change(s)");
        Ok(changes)
    }

    fn redline_part(
        &mut self,
        index: usize,
        modified: &Part,
        normalize: bool,
    ) -> Result<usize, EditError> {
        let original = &self.parts()[index];

        let live = original
            .paragraphs()
            .iter()
            .enumerate()
            .filter(|(_, paragraph)| !paragraph.is_mark_deleted())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        let old = live
            .iter()
            .map(|index| comparable(&original.paragraphs()[*index], normalize))
            .collect::<Vec<_>>();
        let new = modified
            .paragraphs()
            .iter()
            .map(|paragraph| comparable(paragraph, normalize))
            .collect::<Vec<_>>();

        let hunks = hunks(&diff(&old, &new), &live, original.paragraphs().len());
        debug!("Part {} differs in {} hunk(s)", original.name(), hunks.len());

        let mut changes = 0;
        for hunk in hunks.iter().rev() {
            changes += self.apply_hunk(index, hunk, modified)?;
        }
        Ok(changes)
    }

    fn apply_hunk(&mut self, index: usize, hunk: &Hunk, modified: &Part) -> Result<usize, EditError> {
        let (part, mut stamp) = self.edit_part(index)?;
        let paired = hunk.removed.len().min(hunk.added.len());
        let mut changes = 0;

        let added = hunk.added[paired..]
            .iter()
            .map(|added| {
                let template = &modified.paragraphs()[*added];
                let mut paragraph = Paragraph::new();
                if let Some(style) = template.style() {
                    paragraph = paragraph.with_style(style);
                }
                if let Some(cell) = template.cell() {
                    paragraph = paragraph.in_cell(cell);
                }

                let runs = visible_runs(template.content())
                    .into_iter()
                    .map(|run| stamp.stamp_run(run))
                    .collect();
                inserted_paragraph(paragraph, runs, &mut stamp)
            })
            .collect::<Vec<_>>();
        changes += added.len();
        part.paragraphs.splice(hunk.position..hunk.position, added);

        for removed in &hunk.removed[paired..] {
            changes += delete_whole_paragraph(&mut part.paragraphs[*removed], &mut stamp)?;
        }

        for (removed, added) in hunk.removed.iter().zip(&hunk.added) {
            let paragraph = &mut part.paragraphs[*removed];

            let len = paragraph.text().len();
            if len > 0 {
                changes += delete_range(paragraph, &(0..len), false, &mut stamp)?;
            }

            let runs = visible_runs(modified.paragraphs()[*added].content())
                .into_iter()
                .map(|run| stamp.stamp_run(run))
                .collect::<Vec<_>>();
            if !runs.is_empty() {
                let author = stamp.author().to_owned();
                changes += insert_runs(
                    paragraph,
                    0,
                    false,
                    ChangeKind::Insertion,
                    runs,
                    &author,
                    &mut || stamp.next(),
                )?;
            }
        }

        Ok(changes)
    }
}

/// The text paragraphs are aligned by.
fn comparable(paragraph: &Paragraph, normalize: bool) -> String {
    let text = paragraph.text();
    if normalize {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        text
    }
}

/// Groups the edit script into hunks. `live` maps positions of the old
/// sequence onto paragraph indices of the original part, `end` is the
/// part's paragraph count.
fn hunks(ops: &[DiffOp], live: &[usize], end: usize) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut current = Hunk::default();

    for op in ops {
        match op {
            DiffOp::Equal(range) => {
                if !current.is_empty() {
                    current.position = live[range.start];
                    hunks.push(core::mem::take(&mut current));
                }
            }
            DiffOp::Delete(range) => current.removed.extend(range.clone().map(|old| live[old])),
            DiffOp::Insert(range) => current.added.extend(range.clone()),
        }
    }

    if !current.is_empty() {
        current.position = end;
        hunks.push(current);
    }
    hunks
}
