//! Lockstep iteration over strided arrays.
//!
//! Every engine walks its operands through this module. The callbacks receive
//! offsets relative to each view's base offset, so the same walk serves any
//! number of arrays sharing one shape.

use std::convert::Infallible;

use crate::fuse::fuse_dims;
use crate::order::compute_order;
use crate::{KernelError, Result};

/// Fail unless both operands have identical dimensions.
#[inline]
pub(crate) fn ensure_same_shape(a: &[usize], b: &[usize]) -> Result<()> {
    if a != b {
        return Err(KernelError::ShapeMismatch(a.to_vec(), b.to_vec()));
    }
    Ok(())
}

/// Iterate in row-major order, calling `f(offsets, len, inner_strides)` once per
/// innermost run.
///
/// `offsets[k]` is the offset of the first element of the run in array `k`;
/// the run has `len` elements spaced by `inner_strides[k]`. Contiguous
/// dimensions are fused first, so a fully contiguous operand pair produces a
/// single run. Nothing is called when any dimension is 0.
pub(crate) fn for_each_inner_run<F>(dims: &[usize], strides_list: &[&[isize]], f: F) -> Result<()>
where
    F: FnMut(&[isize], usize, &[isize]) -> Result<()>,
{
    walk_runs(dims, strides_list, f)
}

/// [`for_each_inner_run`] for callbacks that cannot fail.
pub(crate) fn for_each_run<F>(dims: &[usize], strides_list: &[&[isize]], mut f: F)
where
    F: FnMut(&[isize], usize, &[isize]),
{
    let walked: std::result::Result<(), Infallible> =
        walk_runs(dims, strides_list, |offsets, len, inner| {
            f(offsets, len, inner);
            Ok(())
        });
    match walked {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// [`for_each_offset`] for callbacks that cannot fail.
pub(crate) fn for_each_element<F>(dims: &[usize], strides_list: &[&[isize]], mut f: F)
where
    F: FnMut(&[isize]),
{
    let mut current = vec![0isize; strides_list.len()];
    for_each_run(dims, strides_list, |offsets, len, inner| {
        current.copy_from_slice(offsets);
        for _ in 0..len {
            f(&current);
            for (c, s) in current.iter_mut().zip(inner.iter()) {
                *c += s;
            }
        }
    });
}

fn walk_runs<E, F>(dims: &[usize], strides_list: &[&[isize]], mut f: F) -> std::result::Result<(), E>
where
    F: FnMut(&[isize], usize, &[isize]) -> std::result::Result<(), E>,
{
    if dims.contains(&0) {
        return Ok(());
    }
    let num_arrays = strides_list.len();
    let fused = fuse_dims(dims, strides_list);
    let rank = fused.dims.len();
    log::trace!(
        "kernel: dims {:?} fused to {:?} over {} arrays",
        dims,
        fused.dims,
        num_arrays
    );

    let mut offsets = vec![0isize; num_arrays];
    if rank == 0 {
        let inner = vec![0isize; num_arrays];
        return f(&offsets, 1, &inner);
    }

    let inner_len = fused.dims[rank - 1];
    let inner: Vec<isize> = fused.strides.iter().map(|s| s[rank - 1]).collect();
    let outer_dims = &fused.dims[..rank - 1];
    let mut counter = vec![0usize; outer_dims.len()];

    loop {
        f(&offsets, inner_len, &inner)?;

        // Advance the outer odometer, last outer dimension fastest.
        let mut d = outer_dims.len();
        loop {
            if d == 0 {
                return Ok(());
            }
            d -= 1;
            counter[d] += 1;
            for (off, strides) in offsets.iter_mut().zip(fused.strides.iter()) {
                *off += strides[d];
            }
            if counter[d] < outer_dims[d] {
                break;
            }
            for (off, strides) in offsets.iter_mut().zip(fused.strides.iter()) {
                *off -= strides[d] * outer_dims[d] as isize;
            }
            counter[d] = 0;
        }
    }
}

/// Iterate element by element in row-major order, calling `f(offsets)`.
pub(crate) fn for_each_offset<F>(dims: &[usize], strides_list: &[&[isize]], mut f: F) -> Result<()>
where
    F: FnMut(&[isize]) -> Result<()>,
{
    let mut current = vec![0isize; strides_list.len()];
    for_each_inner_run(dims, strides_list, |offsets, len, inner| {
        current.copy_from_slice(offsets);
        for _ in 0..len {
            f(&current)?;
            for (c, s) in current.iter_mut().zip(inner.iter()) {
                *c += s;
            }
        }
        Ok(())
    })
}

/// Like [`for_each_inner_run`], but free to reorder dimensions for locality.
///
/// Only valid when the result does not depend on visiting order. Dimensions are
/// sorted by stride (destination `dest_index` weighted double) before fusion.
pub(crate) fn for_each_ordered_run<F>(
    dims: &[usize],
    strides_list: &[&[isize]],
    dest_index: Option<usize>,
    f: F,
) -> Result<()>
where
    F: FnMut(&[isize], usize, &[isize]) -> Result<()>,
{
    let order = compute_order(dims, strides_list, dest_index);
    let ordered_dims: Vec<usize> = order.iter().map(|&d| dims[d]).collect();
    let ordered_strides: Vec<Vec<isize>> = strides_list
        .iter()
        .map(|strides| order.iter().map(|&d| strides[d]).collect())
        .collect();
    let refs: Vec<&[isize]> = ordered_strides.iter().map(|s| s.as_slice()).collect();
    for_each_inner_run(&ordered_dims, &refs, f)
}

/// Visit every multi-index of `dims` in row-major order.
pub(crate) fn for_each_index<F>(dims: &[usize], mut f: F) -> Result<()>
where
    F: FnMut(&[usize]) -> Result<()>,
{
    if dims.contains(&0) {
        return Ok(());
    }
    let mut index = vec![0usize; dims.len()];
    loop {
        f(&index)?;
        let mut d = dims.len();
        loop {
            if d == 0 {
                return Ok(());
            }
            d -= 1;
            index[d] += 1;
            if index[d] < dims[d] {
                break;
            }
            index[d] = 0;
        }
    }
}

/// Offsets, relative to the base, of every element of a sub-block in row-major order.
pub(crate) fn block_offsets(dims: &[usize], strides: &[isize]) -> Vec<isize> {
    let mut out = Vec::with_capacity(dims.iter().product());
    for_each_element(dims, &[strides], |offsets| out.push(offsets[0]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_offsets(dims: &[usize], strides_list: &[&[isize]]) -> Vec<Vec<isize>> {
        let mut out = Vec::new();
        for_each_offset(dims, strides_list, |offsets| {
            out.push(offsets.to_vec());
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn test_row_major_order() {
        let a = [1isize, 2];
        let got: Vec<isize> = collect_offsets(&[2, 3], &[&a]).into_iter().map(|v| v[0]).collect();
        // Column-major layout visited in row-major order
        assert_eq!(got, vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_lockstep_two_arrays() {
        let a = [3isize, 1];
        let b = [1isize, 2];
        let got = collect_offsets(&[2, 3], &[&a, &b]);
        assert_eq!(got.len(), 6);
        assert_eq!(got[4], vec![4, 3]);
    }

    #[test]
    fn test_contiguous_single_run() {
        let a = [12isize, 4, 1];
        let mut runs = 0;
        for_each_inner_run(&[2, 3, 4], &[&a, &a], |_, len, inner| {
            runs += 1;
            assert_eq!(len, 24);
            assert_eq!(inner, &[1, 1]);
            Ok(())
        })
        .unwrap();
        assert_eq!(runs, 1);
    }

    #[test]
    fn test_empty_and_scalar() {
        let a = [1isize];
        assert!(collect_offsets(&[0], &[&a]).is_empty());
        assert_eq!(collect_offsets(&[], &[&[]]), vec![vec![0]]);
    }

    #[test]
    fn test_ordered_run_visits_everything() {
        let dst = [1isize, 3];
        let src = [4isize, 1];
        let mut seen = vec![false; 12];
        for_each_ordered_run(&[3, 4], &[&dst, &src], Some(0), |offsets, len, inner| {
            for i in 0..len as isize {
                seen[(offsets[0] + i * inner[0]) as usize] = true;
            }
            Ok(())
        })
        .unwrap();
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_for_each_index() {
        let mut seen = Vec::new();
        for_each_index(&[2, 2], |idx| {
            seen.push(idx.to_vec());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn test_block_offsets() {
        assert_eq!(block_offsets(&[2, 2], &[10, 1]), vec![0, 1, 10, 11]);
    }

    #[test]
    fn test_infallible_walks_match_fallible() {
        let (a, b) = ([1isize, 3], [-2isize, 6]);
        let expected = collect_offsets(&[3, 2], &[&a, &b]);

        let mut elements = Vec::new();
        for_each_element(&[3, 2], &[&a, &b], |offsets| elements.push(offsets.to_vec()));
        assert_eq!(elements, expected);

        let mut runs = 0;
        let mut total = 0;
        for_each_run(&[3, 2], &[&a, &b], |_, len, _| {
            runs += 1;
            total += len;
        });
        assert_eq!(total, 6);
        assert!(runs >= 1);

        // A size-0 dimension visits nothing.
        for_each_element(&[0, 2], &[&a], |_| panic!("visited an empty array"));
    }
}
