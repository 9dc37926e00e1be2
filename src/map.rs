//! Copy-based mapping operations between strided views.
//!
//! - [`copy_into`]: same-shape strided copy
//! - [`map`]: lockstep copy of offset windows with modular wrap-around
//! - [`slice`]: copy of a `(start, step, count)` selection
//! - [`splice`]: copy along an explicit coordinate mapping

use crate::kernel::{ensure_same_shape, for_each_index, for_each_ordered_run};
use crate::view::{SliceSpec, SpliceSpec, StridedView, StridedViewMut};
use crate::{KernelError, Result};

/// One `(src_offset, dst_offset, count)` window along a single dimension.
///
/// Element `i` of the window reads source coordinate
/// `(src_offset + i) mod src_dim` and writes destination coordinate
/// `(dst_offset + i) mod dst_dim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapBound {
    pub src_offset: usize,
    pub dst_offset: usize,
    pub count: usize,
}

impl MapBound {
    pub fn new(src_offset: usize, dst_offset: usize, count: usize) -> Self {
        Self {
            src_offset,
            dst_offset,
            count,
        }
    }

    /// Build one bound per dimension from `(src_offset, dst_offset, count)` triples.
    pub fn from_triples(triples: &[(usize, usize, usize)]) -> Vec<Self> {
        triples
            .iter()
            .map(|&(src, dst, count)| Self::new(src, dst, count))
            .collect()
    }

    /// The same window read in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self::new(self.dst_offset, self.src_offset, self.count)
    }
}

/// Copy `src` into `dst` element by element.
///
/// Both views must have identical dimensions. Contiguous operands are copied
/// as one slice; otherwise dimensions are visited smallest destination stride
/// innermost.
pub fn copy_into<T: Copy>(src: &StridedView<T>, dst: &mut StridedViewMut<T>) -> Result<()> {
    ensure_same_shape(src.dims(), dst.dims())?;
    if src.is_empty() {
        return Ok(());
    }

    if src.is_contiguous() && dst.is_contiguous() {
        let len = src.len();
        let (so, do_) = (src.offset(), dst.offset());
        dst.data_mut()[do_..do_ + len].copy_from_slice(&src.data()[so..so + len]);
        return Ok(());
    }

    let dims = dst.dims().to_vec();
    let dst_strides = dst.strides().to_vec();
    let strides_list: [&[isize]; 2] = [&dst_strides, src.strides()];
    for_each_ordered_run(&dims, &strides_list, Some(0), |offsets, len, inner| {
        let (mut d, mut s) = (offsets[0], offsets[1]);
        for _ in 0..len {
            *dst.at_mut(d) = *src.at(s);
            d += inner[0];
            s += inner[1];
        }
        Ok(())
    })
}

/// Copy the windows described by `bounds` from `src` to `dst`.
///
/// One bound per dimension. Coordinates wrap modulo the size of their
/// dimension, so offsets and counts may exceed it; when a window is longer
/// than the destination dimension, later elements overwrite earlier ones.
/// Applying the inverse bounds to the result restores the original window.
///
/// # Errors
/// - `RankMismatch` when the number of bounds differs from either rank
/// - `IndexOutOfRange` for a non-empty window over a size-0 dimension
pub fn map<T: Copy>(
    bounds: &[MapBound],
    src: &StridedView<T>,
    dst: &mut StridedViewMut<T>,
) -> Result<()> {
    if bounds.len() != src.ndim() {
        return Err(KernelError::RankMismatch(bounds.len(), src.ndim()));
    }
    if bounds.len() != dst.ndim() {
        return Err(KernelError::RankMismatch(bounds.len(), dst.ndim()));
    }

    // Per-dimension offset tables, built before touching dst.
    let mut src_table: Vec<Vec<isize>> = Vec::with_capacity(bounds.len());
    let mut dst_table: Vec<Vec<isize>> = Vec::with_capacity(bounds.len());
    for (dim, bound) in bounds.iter().enumerate() {
        let (src_size, dst_size) = (src.dims()[dim], dst.dims()[dim]);
        if bound.count > 0 {
            for (size, offset) in [(src_size, bound.src_offset), (dst_size, bound.dst_offset)] {
                if size == 0 {
                    return Err(KernelError::IndexOutOfRange {
                        index: offset as isize,
                        dim,
                        size,
                    });
                }
            }
        }
        let (src_stride, dst_stride) = (src.strides()[dim], dst.strides()[dim]);
        src_table.push(
            (0..bound.count)
                .map(|i| ((bound.src_offset + i) % src_size) as isize * src_stride)
                .collect(),
        );
        dst_table.push(
            (0..bound.count)
                .map(|i| ((bound.dst_offset + i) % dst_size) as isize * dst_stride)
                .collect(),
        );
    }

    let counts: Vec<usize> = bounds.iter().map(|b| b.count).collect();
    log::trace!("map: window {:?}", counts);
    for_each_index(&counts, |index| {
        let mut s = 0isize;
        let mut d = 0isize;
        for (dim, &i) in index.iter().enumerate() {
            s += src_table[dim][i];
            d += dst_table[dim][i];
        }
        *dst.at_mut(d) = *src.at(s);
        Ok(())
    })
}

/// Copy the selection `spec` of `src` into `dst`.
///
/// `dst` must have dimensions equal to the selection counts. The selection is
/// taken as a zero-copy view of `src` and then copied.
pub fn slice<T: Copy>(
    spec: &SliceSpec,
    src: &StridedView<T>,
    dst: &mut StridedViewMut<T>,
) -> Result<()> {
    let selected = src.slice(spec)?;
    copy_into(&selected, dst)
}

/// Copy `src` into `dst` along an explicit per-dimension coordinate mapping.
///
/// Every combination of mapped coordinates is copied; destination positions
/// not reached by the mapping are left untouched.
pub fn splice<T: Copy>(
    spec: &SpliceSpec,
    src: &StridedView<T>,
    dst: &mut StridedViewMut<T>,
) -> Result<()> {
    ensure_same_shape(spec.dst_dims(), dst.dims())?;
    spec.validate(src.dims())?;

    let rank = src.ndim();
    let pairs: Vec<&[(usize, usize)]> = (0..rank).map(|d| spec.pairs(d)).collect();
    let counts: Vec<usize> = pairs.iter().map(|p| p.len()).collect();
    let src_strides = src.strides().to_vec();
    let dst_strides = dst.strides().to_vec();

    for_each_index(&counts, |index| {
        let mut s = 0isize;
        let mut d = 0isize;
        for (dim, &i) in index.iter().enumerate() {
            let (src_coord, dst_coord) = pairs[dim][i];
            s += src_coord as isize * src_strides[dim];
            d += dst_coord as isize * dst_strides[dim];
        }
        *dst.at_mut(d) = *src.at(s);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_into_transposed() {
        let data: Vec<i32> = (0..6).collect();
        let src = StridedView::contiguous(&data, &[2, 3]).unwrap();
        let mut out = vec![0; 6];
        let mut dst = StridedViewMut::new(&mut out, &[2, 3], &[1, 2], 0).unwrap();
        copy_into(&src, &mut dst).unwrap();
        // Column-major storage of [[0, 1, 2], [3, 4, 5]]
        assert_eq!(out, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_copy_into_shape_mismatch() {
        let data = vec![0.0; 6];
        let src = StridedView::contiguous(&data, &[2, 3]).unwrap();
        let mut out = vec![0.0; 6];
        let mut dst = StridedViewMut::contiguous(&mut out, &[3, 2]).unwrap();
        assert!(matches!(
            copy_into(&src, &mut dst),
            Err(KernelError::ShapeMismatch(..))
        ));
    }

    #[test]
    fn test_map_wraps_around() {
        let data: Vec<i32> = (0..4).collect();
        let src = StridedView::contiguous(&data, &[4]).unwrap();
        let mut out = vec![-1; 4];
        let mut dst = StridedViewMut::contiguous(&mut out, &[4]).unwrap();
        map(&[MapBound::new(2, 1, 3)], &src, &mut dst).unwrap();
        // src coords 2, 3, 0 land at dst coords 1, 2, 3
        assert_eq!(out, vec![-1, 2, 3, 0]);
    }

    #[test]
    fn test_map_inverse_restores() {
        let data: Vec<f64> = (0..12).map(|x| x as f64).collect();
        let bounds = MapBound::from_triples(&[(1, 0, 2), (3, 1, 3)]);
        let src = StridedView::contiguous(&data, &[3, 4]).unwrap();

        let mut mid = vec![0.0; 6];
        let mut mid_view = StridedViewMut::contiguous(&mut mid, &[2, 3]).unwrap();
        map(&bounds, &src, &mut mid_view).unwrap();

        let inverse: Vec<MapBound> = bounds.iter().map(MapBound::inverse).collect();
        let mut back = vec![0.0; 12];
        let mid_src = StridedView::contiguous(&mid, &[2, 3]).unwrap();
        let mut back_view = StridedViewMut::contiguous(&mut back, &[3, 4]).unwrap();
        map(&inverse, &mid_src, &mut back_view).unwrap();

        for (i, row) in [1usize, 2].iter().enumerate() {
            for (j, col) in [3usize, 0, 1].iter().enumerate() {
                assert_eq!(back[row * 4 + col], data[row * 4 + col], "at ({i}, {j})");
            }
        }
    }

    #[test]
    fn test_map_rejects_empty_dimension() {
        let data: Vec<i32> = Vec::new();
        let src = StridedView::contiguous(&data, &[0]).unwrap();
        let mut out = vec![0; 2];
        let mut dst = StridedViewMut::contiguous(&mut out, &[2]).unwrap();
        assert!(matches!(
            map(&[MapBound::new(0, 0, 1)], &src, &mut dst),
            Err(KernelError::IndexOutOfRange { size: 0, .. })
        ));
    }

    #[test]
    fn test_slice_with_reversal() {
        let data: Vec<i32> = (0..10).collect();
        let src = StridedView::contiguous(&data, &[10]).unwrap();
        let mut out = vec![0; 4];
        let mut dst = StridedViewMut::contiguous(&mut out, &[4]).unwrap();
        slice(&SliceSpec::from_triples(&[(9, -3, 4)]), &src, &mut dst).unwrap();
        assert_eq!(out, vec![9, 6, 3, 0]);
    }

    #[test]
    fn test_slice_repetition() {
        let data = vec![7, 8];
        let src = StridedView::contiguous(&data, &[2]).unwrap();
        let mut out = vec![0; 3];
        let mut dst = StridedViewMut::contiguous(&mut out, &[3]).unwrap();
        slice(&SliceSpec::from_triples(&[(1, 0, 3)]), &src, &mut dst).unwrap();
        assert_eq!(out, vec![8, 8, 8]);
    }

    #[test]
    fn test_splice_leaves_unmapped() {
        let data = vec![1, 2, 3, 4];
        let src = StridedView::contiguous(&data, &[2, 2]).unwrap();
        let spec = SpliceSpec::from_triples(&[3, 3], &[(0, 2, 0), (1, 0, 0), (1, 1, 1)]).unwrap();
        let mut out = vec![0; 9];
        let mut dst = StridedViewMut::contiguous(&mut out, &[3, 3]).unwrap();
        splice(&spec, &src, &mut dst).unwrap();
        // dst[2][1] = src[0][1], dst[0][1] = src[1][1]
        assert_eq!(out, vec![0, 4, 0, 0, 0, 0, 0, 2, 0]);
    }
}
