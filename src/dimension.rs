//! Operations along dimensions of strided arrays.
//!
//! - [`rr_op`]: reduce along dimensions, keeping them with size 1
//! - [`ri_op`]: packed index lists of extrema and sign tests, or argsort
//! - [`rd_op`]: running accumulation along dimensions

use std::cmp::Ordering;

use crate::element::ra_op;
use crate::kernel::{block_offsets, ensure_same_shape, for_each_offset};
use crate::map::copy_into;
use crate::opcode::{AccumulatorOp, CumulativeOp, IndexOp, ReduceOp};
use crate::view::{StridedView, StridedViewMut};
use crate::{KernelError, Result};

/// Validate operating dimensions and return a membership mask.
pub(crate) fn dim_mask(op_dims: &[usize], rank: usize) -> Result<Vec<bool>> {
    let mut mask = vec![false; rank];
    for &dim in op_dims {
        if dim >= rank {
            return Err(KernelError::InvalidDimension { dim, rank });
        }
        if std::mem::replace(&mut mask[dim], true) {
            return Err(KernelError::DuplicateDimension(dim));
        }
    }
    Ok(mask)
}

fn ensure_rank(a: usize, b: usize) -> Result<()> {
    if a != b {
        return Err(KernelError::RankMismatch(a, b));
    }
    Ok(())
}

fn fold_op(op: ReduceOp) -> AccumulatorOp {
    match op {
        ReduceOp::Sum => AccumulatorOp::Sum,
        ReduceOp::Prod => AccumulatorOp::Prod,
        ReduceOp::Max => AccumulatorOp::Max,
        ReduceOp::Min => AccumulatorOp::Min,
        ReduceOp::Var => AccumulatorOp::Var,
    }
}

// ============================================================================
// Reduction
// ============================================================================

/// Reduce `src` along every dimension in `op_dims`.
///
/// `dst` has the rank of `src`. Each reduced dimension has size 1 in `dst`
/// (a size-0 source dimension may also reduce to size 0, in which case nothing
/// is written); every other dimension matches `src`. `Var` is the population
/// variance of the whole reduced sub-block. An empty sub-block yields the
/// identity of the fold (see [`crate::ra_op`]).
///
/// # Errors
/// - `RankMismatch` / `ShapeMismatch` for incompatible `dst`
/// - `InvalidDimension` / `DuplicateDimension` for bad `op_dims`
///
/// ```
/// use strided_numerics::{rr_op, opcode::ReduceOp, StridedView, StridedViewMut};
///
/// let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
/// let src = StridedView::contiguous(&data, &[2, 3]).unwrap();
/// let mut out = vec![0.0; 2];
/// let mut dst = StridedViewMut::contiguous(&mut out, &[2, 1]).unwrap();
/// rr_op(ReduceOp::Max, &src, &mut dst, &[1]).unwrap();
/// assert_eq!(out, vec![3.0, 6.0]);
/// ```
pub fn rr_op(
    op: ReduceOp,
    src: &StridedView<f64>,
    dst: &mut StridedViewMut<f64>,
    op_dims: &[usize],
) -> Result<()> {
    let rank = src.ndim();
    ensure_rank(rank, dst.ndim())?;
    let mask = dim_mask(op_dims, rank)?;

    let mut expected = src.dims().to_vec();
    for (dim, size) in expected.iter_mut().enumerate() {
        if mask[dim] && !(*size == 0 && dst.dims()[dim] == 0) {
            *size = 1;
        }
    }
    ensure_same_shape(&expected, dst.dims())?;

    let block_dims: Vec<usize> = op_dims.iter().map(|&d| src.dims()[d]).collect();
    let block_strides: Vec<isize> = op_dims.iter().map(|&d| src.strides()[d]).collect();
    let inner = block_offsets(&block_dims, &block_strides);
    let fold = fold_op(op);
    log::trace!("rr_op: {:?} over {:?}, block of {}", op, op_dims, inner.len());

    let outer_dims = dst.dims().to_vec();
    let dst_strides = dst.strides().to_vec();
    let strides_list: [&[isize]; 2] = [&dst_strides, src.strides()];
    let mut block = Vec::with_capacity(inner.len());
    for_each_offset(&outer_dims, &strides_list, |offsets| {
        block.clear();
        block.extend(inner.iter().map(|&o| *src.at(offsets[1] + o)));
        *dst.at_mut(offsets[0]) = ra_op(fold, &block);
        Ok(())
    })
}

// ============================================================================
// Index lists
// ============================================================================

fn matches(op: IndexOp, values: &[f64]) -> Vec<bool> {
    match op {
        IndexOp::Max | IndexOp::Min => {
            let target = if op == IndexOp::Max {
                ra_op(AccumulatorOp::Max, values)
            } else {
                ra_op(AccumulatorOp::Min, values)
            };
            values.iter().map(|&v| v == target).collect()
        }
        IndexOp::Zero => values.iter().map(|&v| v == 0.0).collect(),
        IndexOp::GZero => values.iter().map(|&v| v > 0.0).collect(),
        IndexOp::LZero => values.iter().map(|&v| v < 0.0).collect(),
        IndexOp::Sort => vec![false; values.len()],
    }
}

/// Stable ascending argsort; NaN sorts after every number.
fn argsort(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| match (values[a].is_nan(), values[b].is_nan()) {
        (false, false) => values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal),
        (x, y) => x.cmp(&y),
    });
    order
}

fn to_index(i: usize) -> Result<i32> {
    i32::try_from(i).map_err(|_| KernelError::OffsetOverflow)
}

/// Index lists along a dimension.
///
/// `dst` has the shape of `src`. With `dim = Some(d)`, every line along `d`
/// receives the ascending positions of its matching elements packed at the
/// start, followed by `-1`. Position 0 of a line therefore holds the first
/// maximum (`Max`), minimum (`Min`), zero (`Zero`), positive (`GZero`) or
/// negative (`LZero`) element, or `-1` when there is none. `Sort` writes the
/// stable ascending argsort of each line. [`crate::find`] reads these lists
/// back.
///
/// With `dim = None` the whole array is one population: `dst` receives 1 at
/// matching elements and 0 elsewhere, and `Sort` writes the argsort of all
/// elements in row-major order as flat row-major positions.
pub fn ri_op(
    op: IndexOp,
    src: &StridedView<f64>,
    dst: &mut StridedViewMut<i32>,
    dim: Option<usize>,
) -> Result<()> {
    ensure_same_shape(src.dims(), dst.dims())?;
    let rank = src.ndim();

    let Some(d) = dim else {
        to_index(src.len())?;
        let values = src.to_vec();
        let flat: Vec<i32> = if op == IndexOp::Sort {
            argsort(&values).into_iter().map(|i| i as i32).collect()
        } else {
            matches(op, &values).into_iter().map(i32::from).collect()
        };
        let mut it = flat.into_iter();
        let dims = dst.dims().to_vec();
        let strides = dst.strides().to_vec();
        return for_each_offset(&dims, &[&strides], |offsets| {
            *dst.at_mut(offsets[0]) = it.next().unwrap_or(-1);
            Ok(())
        });
    };

    if d >= rank {
        return Err(KernelError::InvalidDimension { dim: d, rank });
    }
    let n = src.dims()[d];
    to_index(n)?;
    let (src_step, dst_step) = (src.strides()[d], dst.strides()[d]);

    let mut outer = src.dims().to_vec();
    outer[d] = 1;
    let dst_strides = dst.strides().to_vec();
    let strides_list: [&[isize]; 2] = [src.strides(), &dst_strides];
    let mut line = Vec::with_capacity(n);
    for_each_offset(&outer, &strides_list, |offsets| {
        line.clear();
        line.extend((0..n as isize).map(|i| *src.at(offsets[0] + i * src_step)));

        let packed: Vec<usize> = if op == IndexOp::Sort {
            argsort(&line)
        } else {
            matches(op, &line)
                .into_iter()
                .enumerate()
                .filter_map(|(i, hit)| hit.then_some(i))
                .collect()
        };
        for i in 0..n {
            let value = packed.get(i).map_or(-1, |&p| p as i32);
            *dst.at_mut(offsets[1] + i as isize * dst_step) = value;
        }
        Ok(())
    })
}

// ============================================================================
// Running accumulation
// ============================================================================

/// Accumulate `dst` in place along `dim`.
pub(crate) fn scan_along(dst: &mut StridedViewMut<f64>, dim: usize, op: CumulativeOp) -> Result<()> {
    let n = dst.dims()[dim];
    if n < 2 {
        return Ok(());
    }
    let step = dst.strides()[dim];
    let mut outer = dst.dims().to_vec();
    outer[dim] = 1;
    let strides = dst.strides().to_vec();
    for_each_offset(&outer, &[&strides], |offsets| {
        let mut prev = *dst.at(offsets[0]);
        for i in 1..n as isize {
            let cell = dst.at_mut(offsets[0] + i * step);
            *cell = match op {
                CumulativeOp::Sum => prev + *cell,
                CumulativeOp::Prod => prev * *cell,
            };
            prev = *cell;
        }
        Ok(())
    })
}

/// Running accumulation along each dimension of `op_dims` in turn.
///
/// `dst` has the shape of `src`. Accumulating a sum along every dimension
/// produces the inclusive integral image.
pub fn rd_op(
    op: CumulativeOp,
    src: &StridedView<f64>,
    dst: &mut StridedViewMut<f64>,
    op_dims: &[usize],
) -> Result<()> {
    ensure_same_shape(src.dims(), dst.dims())?;
    dim_mask(op_dims, src.ndim())?;
    copy_into(src, dst)?;
    for &d in op_dims {
        scan_along(dst, d, op)?;
    }
    Ok(())
}
