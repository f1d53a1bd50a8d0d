//! Resolving the overlap between two adjacent chunks.
//!
//! Adjacent chunks share a window of positions. We split that window at its midpoint,
//! so that the first chunk keeps the first half (rounded up) and the second chunk keeps the rest.
use crate::error::{unstitchable, Result};
use definitions::Position;

/// The first index `i` such that `x <= xs[i]`, or `xs.len()`.
pub fn lower_bound<T: Ord>(xs: &[T], x: &T) -> usize {
    xs.partition_point(|y| y < x)
}

/// The first index `i` such that `x < xs[i]`, or `xs.len()`.
pub fn upper_bound<T: Ord>(xs: &[T], x: &T) -> usize {
    xs.partition_point(|y| y <= x)
}

/// Number of overlapping positions kept by the first chunk.
pub fn first_padding_size(overlap_len: usize) -> usize {
    (overlap_len + 1) / 2
}

/// Return `(end, start)`, where `first[..end]` and `second[start..]` tile the union of
/// the two position arrays without duplication.
/// Both arrays should be sorted, and their overlapping windows should be the same positions.
pub fn overlap_indices(first: &[Position], second: &[Position]) -> Result<(usize, usize)> {
    let (head, tail) = match (second.first(), first.last()) {
        (Some(head), Some(tail)) => (head, tail),
        _ => return Err(unstitchable(first, second)),
    };
    let first_overlap_start = lower_bound(first, head);
    let second_overlap_end = upper_bound(second, tail);
    let first_overlap = &first[first_overlap_start..];
    let second_overlap = &second[..second_overlap_end];
    let same_insertions = first_overlap.len() == second_overlap.len()
        && first_overlap
            .iter()
            .zip(second_overlap.iter())
            .all(|(x, y)| x.inserted_position == y.inserted_position);
    if first_overlap.is_empty() || !same_insertions {
        return Err(unstitchable(first, second));
    }
    let padding = first_padding_size(first_overlap.len());
    let first_end = first_overlap_start + padding;
    let second_start = match second_overlap_end.checked_sub(first_overlap.len() - padding) {
        Some(start) => start,
        None => return Err(unstitchable(first, second)),
    };
    let retiled = first[first_overlap_start..first_end]
        .iter()
        .chain(second[second_start..second_overlap_end].iter());
    if !retiled.eq(first_overlap.iter()) {
        return Err(unstitchable(first, second));
    }
    trace!(
        "OVERLAP\t{}\t{}\t{}",
        first_overlap.len(),
        first_end,
        second_start
    );
    Ok((first_end, second_start))
}
