//! Stable bottom-up merge sort with a fallible comparator
//!
//! The first comparator error aborts the sort and is returned; the slice is
//! left holding every input element exactly once, in unspecified order.

use std::cmp::Ordering;

use crate::serialization::CodecResult;

/// Sorts `items` stably and returns the number of comparisons made.
pub(crate) fn merge_sort_by<T, F>(items: &mut [T], mut compare: F) -> CodecResult<u64>
where
    T: Copy,
    F: FnMut(&T, &T) -> CodecResult<Ordering>,
{
    let n = items.len();
    if n < 2 {
        return Ok(0);
    }

    let mut scratch = items.to_vec();
    let mut comparisons = 0u64;
    let mut in_items = true;
    let mut width = 1;

    while width < n {
        let pass = if in_items {
            merge_pass(items, &mut scratch, width, &mut compare, &mut comparisons)
        } else {
            merge_pass(&scratch, items, width, &mut compare, &mut comparisons)
        };
        if let Err(err) = pass {
            // the pass source is still a whole permutation
            if !in_items {
                items.copy_from_slice(&scratch);
            }
            return Err(err);
        }

        in_items = !in_items;
        width *= 2;
    }

    if !in_items {
        items.copy_from_slice(&scratch);
    }
    Ok(comparisons)
}

/// Merges adjacent runs of `width` from `src` into `dst`.
fn merge_pass<T, F>(src: &[T], dst: &mut [T], width: usize, compare: &mut F, comparisons: &mut u64) -> CodecResult<()>
where
    T: Copy,
    F: FnMut(&T, &T) -> CodecResult<Ordering>,
{
    let n = src.len();
    let mut start = 0;
    while start < n {
        let mid = (start + width).min(n);
        let end = (start + 2 * width).min(n);
        let (mut i, mut j, mut k) = (start, mid, start);

        while i < mid && j < end {
            *comparisons += 1;
            // right side wins only when strictly smaller
            if compare(&src[j], &src[i])? == Ordering::Less {
                dst[k] = src[j];
                j += 1;
            } else {
                dst[k] = src[i];
                i += 1;
            }
            k += 1;
        }
        let left = mid - i;
        dst[k..k + left].copy_from_slice(&src[i..mid]);
        k += left;
        dst[k..end].copy_from_slice(&src[j..end]);

        start = end;
    }
    Ok(())
}
