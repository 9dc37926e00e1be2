//! Loop ordering for order-free iteration.
//!
//! When every array moves in lockstep and the visiting order does not affect
//! the result (plain copies), dimensions can be walked largest stride first so
//! the innermost loop has the smallest stride.

/// Permutation of dimensions, outer to inner.
///
/// Each dimension is scored by the sum of absolute strides over all arrays;
/// the destination array (if any) counts twice. Ties keep the original order.
pub(crate) fn compute_order(
    dims: &[usize],
    strides_list: &[&[isize]],
    dest_index: Option<usize>,
) -> Vec<usize> {
    let scores: Vec<usize> = (0..dims.len())
        .map(|dim| {
            strides_list
                .iter()
                .enumerate()
                .fold(0usize, |acc, (i, strides)| {
                    let weight = if dest_index == Some(i) { 2 } else { 1 };
                    acc.saturating_add(weight * strides[dim].unsigned_abs())
                })
        })
        .collect();

    let mut order: Vec<usize> = (0..dims.len()).collect();
    // Stable sort keeps the original order on ties.
    order.sort_by_key(|&d| std::cmp::Reverse(scores[d]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_prefers_small_inner_stride() {
        // Column-major destination: dim 0 has the small stride and goes inner.
        let dst = [1isize, 3];
        let src = [4isize, 1];
        let order = compute_order(&[3, 4], &[&dst, &src], Some(0));
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_order_row_major_unchanged() {
        let a = [12isize, 4, 1];
        let order = compute_order(&[2, 3, 4], &[&a], None);
        assert_eq!(order, vec![0, 1, 2]);
    }
}
