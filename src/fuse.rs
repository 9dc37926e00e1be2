//! Dimension fusion.
//!
//! Merges neighbouring dimensions that are contiguous in memory for every
//! array taking part in an iteration, so the kernel walks fewer, longer runs.

/// Dimensions and per-array strides after fusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fused {
    pub(crate) dims: Vec<usize>,
    pub(crate) strides: Vec<Vec<isize>>,
}

/// Fuse contiguous dimensions across multiple arrays, keeping row-major order.
///
/// Dimensions `i-1` and `i` merge when `strides[k][i-1] == dims[i] * strides[k][i]`
/// holds for every array `k`. Size-1 dimensions are dropped first since they
/// never move an offset. Iteration order over the fused dimensions equals the
/// row-major order over the original ones.
///
/// An empty result means a single element (rank 0 or all dimensions of size 1).
pub(crate) fn fuse_dims(dims: &[usize], all_strides: &[&[isize]]) -> Fused {
    let keep: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] != 1).collect();

    let mut out_dims: Vec<usize> = Vec::with_capacity(keep.len());
    let mut out_strides: Vec<Vec<isize>> = vec![Vec::with_capacity(keep.len()); all_strides.len()];

    for &i in &keep {
        let size = dims[i];
        let can_merge = match out_dims.last() {
            Some(_) => out_strides
                .iter()
                .zip(all_strides.iter())
                .all(|(fused, strides)| fused.last() == Some(&(size as isize * strides[i]))),
            None => false,
        };

        if can_merge {
            if let Some(last) = out_dims.last_mut() {
                *last *= size;
            }
            for (fused, strides) in out_strides.iter_mut().zip(all_strides.iter()) {
                if let Some(s) = fused.last_mut() {
                    *s = strides[i];
                }
            }
        } else {
            out_dims.push(size);
            for (fused, strides) in out_strides.iter_mut().zip(all_strides.iter()) {
                fused.push(strides[i]);
            }
        }
    }

    Fused {
        dims: out_dims,
        strides: out_strides,
    }
}
