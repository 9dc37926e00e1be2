//! Integral images and integral histograms of N-dimensional arrays.
//!
//! Both transforms accept two destination layouts:
//! - inclusive: same shape as the source, `dst[i] = Σ src[≤ i]`
//! - padded: one larger in every dimension, with a leading zero slice per
//!   dimension and `dst[i + 1] = Σ src[≤ i]`

use crate::dimension::scan_along;
use crate::kernel::{for_each_index, for_each_offset};
use crate::map::copy_into;
use crate::opcode::CumulativeOp;
use crate::view::{SliceRange, SliceSpec, StridedView, StridedViewMut};
use crate::{KernelError, Result};

/// Leading padding (0 or 1) of an integral layout over `src_dims`.
fn integral_padding(src_dims: &[usize], dst_dims: &[usize]) -> Result<usize> {
    if src_dims.len() != dst_dims.len() {
        return Err(KernelError::RankMismatch(src_dims.len(), dst_dims.len()));
    }
    if src_dims == dst_dims {
        return Ok(0);
    }
    if src_dims.iter().zip(dst_dims).all(|(&s, &d)| d == s + 1) {
        return Ok(1);
    }
    Err(KernelError::ShapeMismatch(src_dims.to_vec(), dst_dims.to_vec()))
}

/// Sub-view of a padded destination that skips the leading zero slices.
fn interior_spec(dst_dims: &[usize], pad: usize, leading: usize) -> SliceSpec {
    SliceSpec::new(
        dst_dims
            .iter()
            .enumerate()
            .map(|(d, &size)| {
                if d < leading {
                    SliceRange::new(pad, 1, size - pad)
                } else {
                    SliceRange::full(size)
                }
            })
            .collect(),
    )
}

/// Integral image of `src` (summed-area table), for any rank.
///
/// ```
/// use strided_numerics::{create_integral_image, StridedView, StridedViewMut};
///
/// let data = [1.0; 4];
/// let src = StridedView::contiguous(&data, &[2, 2]).unwrap();
/// let mut out = [0.0; 9];
/// let mut dst = StridedViewMut::contiguous(&mut out, &[3, 3]).unwrap();
/// create_integral_image(&src, &mut dst).unwrap();
/// assert_eq!(out, [0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 2.0, 4.0]);
/// ```
pub fn create_integral_image(src: &StridedView<f64>, dst: &mut StridedViewMut<f64>) -> Result<()> {
    let rank = src.ndim();
    let pad = integral_padding(src.dims(), dst.dims())?;
    if pad == 1 {
        dst.fill(0.0);
    }
    let spec = interior_spec(&dst.dims().to_vec(), pad, rank);
    let mut interior = dst.slice_mut(&spec)?;
    copy_into(src, &mut interior)?;
    for d in 0..rank {
        scan_along(&mut interior, d, CumulativeOp::Sum)?;
    }
    Ok(())
}

/// Integral histogram: one integral image per bin.
///
/// `memberships` has the shape of `src` and assigns each element to a bin;
/// a negative membership leaves the element out. `dst` has the integral-image
/// shape of `src` (inclusive or padded) followed by a trailing bin dimension,
/// whose size is the number of bins.
///
/// # Errors
/// `IndexOutOfRange` when a membership is not below the number of bins,
/// reported before anything is written.
pub fn create_integral_histogram(
    src: &StridedView<f64>,
    memberships: &StridedView<i32>,
    dst: &mut StridedViewMut<f64>,
) -> Result<()> {
    let rank = src.ndim();
    if memberships.dims() != src.dims() {
        return Err(KernelError::ShapeMismatch(
            src.dims().to_vec(),
            memberships.dims().to_vec(),
        ));
    }
    if dst.ndim() != rank + 1 {
        return Err(KernelError::RankMismatch(dst.ndim(), rank + 1));
    }
    let dst_dims = dst.dims().to_vec();
    let pad = integral_padding(src.dims(), &dst_dims[..rank])?;
    let bins = dst_dims[rank];

    let mut bad = None;
    for_each_offset(memberships.dims(), &[memberships.strides()], |offsets| {
        let bin = *memberships.at(offsets[0]);
        if bin >= 0 && bin as usize >= bins {
            bad = Some(bin);
        }
        Ok(())
    })?;
    if let Some(bin) = bad {
        return Err(KernelError::IndexOutOfRange {
            index: bin as isize,
            dim: rank,
            size: bins,
        });
    }

    dst.fill(0.0);
    let spec = interior_spec(&dst_dims, pad, rank);
    let mut interior = dst.slice_mut(&spec)?;
    let mut cell = vec![0usize; rank + 1];
    for_each_index(src.dims(), |index| {
        let bin = memberships.get(index)?;
        if bin >= 0 {
            cell[..rank].copy_from_slice(index);
            cell[rank] = bin as usize;
            let pos = interior.position(&cell)?;
            interior.data_mut()[pos] += src.get(index)?;
        }
        Ok(())
    })?;
    for d in 0..rank {
        scan_along(&mut interior, d, CumulativeOp::Sum)?;
    }
    Ok(())
}
