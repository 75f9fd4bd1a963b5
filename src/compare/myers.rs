//! Myers' diff algorithm over slices of comparable items, adapted from
//! <https://github.com/mitsuhiko/similar/blob/7e15c44de11a1cd61e1149189929e189ef977fd8/src/algorithms/myers.rs>
//!
//! * time: `O((N+M)D)`
//! * space `O(N+M)`
//!
//! See [the original article by Eugene W. Myers](http://www.xmailserver.org/diff2.pdf).
//!
//! There are no heuristics for pathological inputs: two long and completely
//! distinct sequences take quadratic time.

use std::ops::{Index, IndexMut, Range};

/// One step of an edit script. `Equal` and `Delete` ranges index the old
/// sequence, `Insert` ranges index the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DiffOp {
    Equal(Range<usize>),
    Delete(Range<usize>),
    Insert(Range<usize>),
}

/// Computes a shortest edit script turning `old` into `new`. Adjacent steps
/// of the same kind are joined.
pub(crate) fn diff<T: PartialEq>(old: &[T], new: &[T]) -> Vec<DiffOp> {
    let max_d = max_d(old.len(), new.len());
    let mut vf = V::new(max_d);
    let mut vb = V::new(max_d);
    let mut result = Vec::new();

    conquer(
        old,
        0..old.len(),
        new,
        0..new.len(),
        &mut vf,
        &mut vb,
        &mut result,
    );

    result
}

/// Endpoints of the furthest reaching D-paths, indexed by diagonal `k`.
/// Only `x` is stored since `y = x - k`; `offset` maps negative diagonals
/// onto the vector.
#[derive(Debug)]
struct V {
    offset: isize,
    v: Vec<usize>,
}

impl V {
    fn new(max_d: usize) -> Self {
        Self {
            offset: to_isize(max_d),
            v: vec![0; 2 * max_d],
        }
    }

    fn len(&self) -> usize { self.v.len() }

    fn slot(&self, index: isize) -> usize {
        usize::try_from(index + self.offset)
            .unwrap_or_default()
            .min(self.v.len().saturating_sub(1))
    }
}

impl Index<isize> for V {
    type Output = usize;

    fn index(&self, index: isize) -> &Self::Output { &self.v[self.slot(index)] }
}

impl IndexMut<isize> for V {
    fn index_mut(&mut self, index: isize) -> &mut Self::Output {
        let slot = self.slot(index);
        &mut self.v[slot]
    }
}

fn to_isize(value: usize) -> isize { isize::try_from(value).unwrap_or(isize::MAX) }

fn max_d(len1: usize, len2: usize) -> usize { (len1 + len2).div_ceil(2) + 1 }

fn split_at(range: Range<usize>, at: usize) -> (Range<usize>, Range<usize>) {
    (range.start..at, at..range.end)
}

fn common_prefix_len<T: PartialEq>(
    old: &[T],
    old_range: Range<usize>,
    new: &[T],
    new_range: Range<usize>,
) -> usize {
    new_range
        .zip(old_range)
        .take_while(|(new_index, old_index)| new[*new_index] == old[*old_index])
        .count()
}

fn common_suffix_len<T: PartialEq>(
    old: &[T],
    old_range: Range<usize>,
    new: &[T],
    new_range: Range<usize>,
) -> usize {
    new_range
        .rev()
        .zip(old_range.rev())
        .take_while(|(new_index, old_index)| new[*new_index] == old[*old_index])
        .count()
}

/// Finds the middle snake of an optimal path by running the search forward
/// from the top-left and backward from the bottom-right corner until the two
/// frontiers overlap.
fn find_middle_snake<T: PartialEq>(
    old: &[T],
    old_range: Range<usize>,
    new: &[T],
    new_range: Range<usize>,
    vf: &mut V,
    vb: &mut V,
) -> Option<(usize, usize)> {
    let n = old_range.len();
    let m = new_range.len();

    // The length of the optimal edit script has the parity of `delta`
    let delta = to_isize(n) - to_isize(m);
    let odd = delta & 1 == 1;

    vf[1] = 0;
    vb[1] = 0;

    let d_max = max_d(n, m);
    debug_assert!(vf.len() >= d_max && vb.len() >= d_max);

    for d in 0..to_isize(d_max) {
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vf[k - 1] < vf[k + 1]) {
                vf[k + 1]
            } else {
                vf[k - 1] + 1
            };
            let y = usize::try_from(to_isize(x) - k).unwrap_or_default();

            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix_len(
                    old,
                    old_range.start + x..old_range.end,
                    new,
                    new_range.start + y..new_range.end,
                );
            }
            vf[k] = x;

            if odd && (k - delta).abs() <= (d - 1) && vf[k] + vb[-(k - delta)] >= n {
                return Some((x0 + old_range.start, y0 + new_range.start));
            }
        }

        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vb[k - 1] < vb[k + 1]) {
                vb[k + 1]
            } else {
                vb[k - 1] + 1
            };
            let mut y = usize::try_from(to_isize(x) - k).unwrap_or_default();

            if x < n && y < m {
                let advance = common_suffix_len(
                    old,
                    old_range.start..old_range.start + n - x,
                    new,
                    new_range.start..new_range.start + m - y,
                );
                x += advance;
                y += advance;
            }
            vb[k] = x;

            if !odd && (k - delta).abs() <= d && vb[k] + vf[-(k - delta)] >= n {
                return Some((n - x + old_range.start, m - y + new_range.start));
            }
        }
    }

    None
}

fn push(result: &mut Vec<DiffOp>, op: DiffOp) {
    let joined = match (result.last_mut(), &op) {
        (Some(DiffOp::Equal(last)), DiffOp::Equal(next))
        | (Some(DiffOp::Delete(last)), DiffOp::Delete(next))
        | (Some(DiffOp::Insert(last)), DiffOp::Insert(next))
            if last.end == next.start =>
        {
            last.end = next.end;
            true
        }
        _ => false,
    };

    if !joined {
        result.push(op);
    }
}

fn conquer<T: PartialEq>(
    old: &[T],
    mut old_range: Range<usize>,
    new: &[T],
    mut new_range: Range<usize>,
    vf: &mut V,
    vb: &mut V,
    result: &mut Vec<DiffOp>,
) {
    let prefix = common_prefix_len(old, old_range.clone(), new, new_range.clone());
    if prefix > 0 {
        push(result, DiffOp::Equal(old_range.start..old_range.start + prefix));
    }
    old_range.start += prefix;
    new_range.start += prefix;

    let suffix = common_suffix_len(old, old_range.clone(), new, new_range.clone());
    let suffix_start = old_range.end - suffix;
    old_range.end -= suffix;
    new_range.end -= suffix;

    if old_range.is_empty() && new_range.is_empty() {
        // Nothing left between the prefix and the suffix
    } else if new_range.is_empty() {
        push(result, DiffOp::Delete(old_range));
    } else if old_range.is_empty() {
        push(result, DiffOp::Insert(new_range));
    } else if let Some((x_start, y_start)) =
        find_middle_snake(old, old_range.clone(), new, new_range.clone(), vf, vb)
    {
        let (old_a, old_b) = split_at(old_range, x_start);
        let (new_a, new_b) = split_at(new_range, y_start);
        conquer(old, old_a, new, new_a, vf, vb, result);
        conquer(old, old_b, new, new_b, vf, vb, result);
    } else {
        push(result, DiffOp::Delete(old_range));
        push(result, DiffOp::Insert(new_range));
    }

    if suffix > 0 {
        push(result, DiffOp::Equal(suffix_start..suffix_start + suffix));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty_and_identical() {
        assert_eq!(diff::<&str>(&[], &[]), vec![]);
        assert_eq!(diff(&["a", "b"], &["a", "b"]), vec![DiffOp::Equal(0..2)]);
    }

    #[test]
    fn test_only_one_side() {
        assert_eq!(diff(&[], &["a", "b"]), vec![DiffOp::Insert(0..2)]);
        assert_eq!(diff(&["a", "b"], &[]), vec![DiffOp::Delete(0..2)]);
    }

    #[test]
    fn test_insert_between_common_lines() {
        assert_eq!(
            diff(&["Line 1", "Line 3"], &["Line 1", "Line 2", "Line 3"]),
            vec![
                DiffOp::Equal(0..1),
                DiffOp::Insert(1..2),
                DiffOp::Equal(1..2)
            ]
        );
    }

    #[test]
    fn test_replaced_items_keep_the_common_middle() {
        let result = diff(&["a", "b", "c", "d"], &["a", "x", "c", "y"]);

        let equal = result
            .iter()
            .filter_map(|op| match op {
                DiffOp::Equal(range) => Some(range.clone()),
                DiffOp::Delete(_) | DiffOp::Insert(_) => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(equal, vec![0..1, 2..3]);

        let changed = |pick: fn(&DiffOp) -> Option<usize>| result.iter().filter_map(pick).sum::<usize>();
        assert_eq!(
            changed(|op| match op {
                DiffOp::Delete(range) => Some(range.len()),
                _ => None,
            }),
            2
        );
        assert_eq!(
            changed(|op| match op {
                DiffOp::Insert(range) => Some(range.len()),
                _ => None,
            }),
            2
        );
    }
}
