//! Index search.

use crate::kernel::for_each_element;
use crate::view::StridedView;
use crate::{KernelError, Result};

/// Element test for [`find_where`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    NonZero,
    Zero,
    Positive,
    Negative,
}

impl Predicate {
    #[inline]
    fn test(self, x: f64) -> bool {
        match self {
            Predicate::NonZero => x != 0.0,
            Predicate::Zero => x == 0.0,
            Predicate::Positive => x > 0.0,
            Predicate::Negative => x < 0.0,
        }
    }
}

/// Read back one index list written by [`crate::ri_op`].
///
/// `logical` has one entry per dimension: exactly one entry is `-1` and marks
/// the line's free dimension, the others fix a coordinate. Returns the
/// non-negative values found along that line, sorted ascending.
///
/// ```
/// use strided_numerics::{find, StridedView};
///
/// // Two packed lists along dimension 1
/// let lists = [2, 0, -1, 1, -1, -1];
/// let view = StridedView::contiguous(&lists, &[2, 3]).unwrap();
/// assert_eq!(find(&view, &[0, -1]).unwrap(), vec![0, 2]);
/// assert_eq!(find(&view, &[1, -1]).unwrap(), vec![1]);
/// ```
pub fn find(src: &StridedView<i32>, logical: &[isize]) -> Result<Vec<i32>> {
    let rank = src.ndim();
    if logical.len() != rank {
        return Err(KernelError::RankMismatch(logical.len(), rank));
    }
    let free: Vec<usize> = (0..rank).filter(|&d| logical[d] == -1).collect();
    let [free] = free[..] else {
        return Err(KernelError::FreeDimension(free.len()));
    };

    let mut start = vec![0usize; rank];
    for (dim, (&coord, &size)) in logical.iter().zip(src.dims()).enumerate() {
        if dim == free {
            continue;
        }
        if coord < 0 || coord as usize >= size {
            return Err(KernelError::IndexOutOfRange {
                index: coord,
                dim,
                size,
            });
        }
        start[dim] = coord as usize;
    }

    let n = src.dims()[free];
    if n == 0 {
        return Ok(Vec::new());
    }
    let base = src.position_unchecked(&start);
    let step = src.strides()[free];
    let data = src.data();
    let mut found: Vec<i32> = (0..n as isize)
        .map(|i| data[(base as isize + i * step) as usize])
        .filter(|&v| v >= 0)
        .collect();
    found.sort_unstable();
    Ok(found)
}

/// Row-major logical positions of the elements satisfying `predicate`, ascending.
pub fn find_where(src: &StridedView<f64>, predicate: Predicate) -> Vec<usize> {
    let mut out = Vec::new();
    let mut position = 0usize;
    let dims = src.dims().to_vec();
    let strides = [src.strides()];
    for_each_element(&dims, &strides, |offsets| {
        if predicate.test(*src.at(offsets[0])) {
            out.push(position);
        }
        position += 1;
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_along_first_dim() {
        // Lists along dimension 0 of a 3x2 array (column-major storage)
        let lists = [1, 0, -1, 2, -1, -1];
        let view = StridedView::new(&lists, &[3, 2], &[1, 3], 0).unwrap();
        assert_eq!(find(&view, &[-1, 0]).unwrap(), vec![0, 1]);
        assert_eq!(find(&view, &[-1, 1]).unwrap(), vec![2]);
    }

    #[test]
    fn test_find_requires_one_free_dim() {
        let lists = [0; 4];
        let view = StridedView::contiguous(&lists, &[2, 2]).unwrap();
        assert_eq!(find(&view, &[0, 1]), Err(KernelError::FreeDimension(0)));
        assert_eq!(find(&view, &[-1, -1]), Err(KernelError::FreeDimension(2)));
        assert!(matches!(
            find(&view, &[2, -1]),
            Err(KernelError::IndexOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn test_find_empty_result() {
        let lists = [-1, -1];
        let view = StridedView::contiguous(&lists, &[2]).unwrap();
        assert!(find(&view, &[-1]).unwrap().is_empty());
    }

    #[test]
    fn test_find_where_strided() {
        let data = [1.0, 0.0, -2.0, 3.0];
        // Transposed view: logical [[1, -2], [0, 3]]
        let view = StridedView::new(&data, &[2, 2], &[1, 2], 0).unwrap();
        assert_eq!(find_where(&view, Predicate::NonZero), vec![0, 1, 3]);
        assert_eq!(find_where(&view, Predicate::Negative), vec![1]);
        assert_eq!(find_where(&view, Predicate::Zero), vec![2]);
    }
}
