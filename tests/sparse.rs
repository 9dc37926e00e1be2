use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strided_numerics::{
    slice, ErrorKind, SliceSpec, SparseArray, SpliceSpec, StridedView, StridedViewMut,
};

/// Random sparse array with roughly a third of the entries set.
fn random_sparse(dims: &[usize], seed: u64) -> SparseArray<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let len: usize = dims.iter().product();
    let (mut linear, mut values) = (Vec::new(), Vec::new());
    for li in 0..len {
        if rng.gen_bool(0.3) {
            linear.push(li);
            values.push(rng.gen_range(1.0..2.0));
        }
    }
    SparseArray::from_entries(dims, &linear, &values).unwrap()
}

fn dense(a: &SparseArray<f64>) -> Vec<f64> {
    let mut out = vec![0.0; a.len()];
    let mut dst = StridedViewMut::contiguous(&mut out, a.dims()).unwrap();
    a.to_dense(&mut dst).unwrap();
    out
}

#[test]
fn test_insert_center_then_slice_corner() {
    let a = SparseArray::<f64>::new(&[3, 3]).unwrap();
    let a = a.insert(&[5.0], &[4]).unwrap();
    assert_eq!(a.get(4).unwrap(), 5.0);
    assert_eq!(a.get_at(&[1, 1]).unwrap(), 5.0);

    let sub = a
        .slice(&SliceSpec::from_triples(&[(0, 1, 2), (0, 1, 2)]))
        .unwrap();
    assert_eq!(sub.nnz(), 1);
    assert_eq!(sub.indices(), &[3]);
}

#[test]
fn test_slice_with_step_and_reversal_matches_dense() {
    let dims = [5, 4, 3];
    let a = random_sparse(&dims, 3);
    let spec = SliceSpec::from_triples(&[(4, -2, 3), (0, 1, 4), (2, -1, 2)]);
    let sub = a.slice(&spec).unwrap();
    assert_eq!(sub.dims(), &[3, 4, 2]);

    let full = dense(&a);
    let src = StridedView::contiguous(&full, &dims).unwrap();
    let mut expected = vec![0.0; 24];
    let mut dst = StridedViewMut::contiguous(&mut expected, &[3, 4, 2]).unwrap();
    slice(&spec, &src, &mut dst).unwrap();

    assert_eq!(dense(&sub), expected);
    // Indices stay sorted and zeros are never stored
    assert!(sub.indices().windows(2).all(|w| w[0] < w[1]));
    assert!(sub.values().iter().all(|&v| v != 0.0));
}

#[test]
fn test_orderings_sorted_per_dimension() {
    let a = random_sparse(&[4, 6], 9);
    for d in 0..2 {
        let coords = a.coordinates(d).unwrap();
        let order = a.ordering(d).unwrap();
        assert_eq!(order.len(), a.nnz());
        for w in order.windows(2) {
            let (p, q) = (w[0], w[1]);
            assert!((coords[p], a.indices()[p]) < (coords[q], a.indices()[q]));
        }
    }
}

#[test]
fn test_splice_replicates_and_drops() {
    // Entries at (0, 0) = 1 and (1, 2) = 2 in a 2x3 array
    let a = SparseArray::from_entries(&[2, 3], &[0, 5], &[1.0, 2.0]).unwrap();
    // Row 1 feeds destination rows 0 and 1; row 0 is dropped. Column 2 feeds column 0.
    let spec = SpliceSpec::from_triples(&[2, 1], &[(1, 0, 0), (1, 1, 0), (2, 0, 1)]).unwrap();
    let b = a.splice(&spec).unwrap();
    assert_eq!(b.dims(), &[2, 1]);
    assert_eq!(b.indices(), &[0, 1]);
    assert_eq!(b.values(), &[2.0, 2.0]);
}

#[test]
fn test_splice_rejects_double_claimed_destination() {
    let a = SparseArray::<f64>::new(&[2, 2]).unwrap();
    let spec = SpliceSpec::from_triples(&[1, 2], &[(0, 0, 0), (1, 0, 0)]).unwrap();
    let err = a.splice(&spec).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Index);
}

#[test]
fn test_complex_entries() {
    let z = Complex64::new(0.0, 1.0);
    let a = SparseArray::from_entries(&[2, 2], &[3, 1], &[z, Complex64::new(0.0, 0.0)]).unwrap();
    assert_eq!(a.nnz(), 1);
    assert_eq!(a.get_at(&[1, 1]).unwrap(), z);
    assert_eq!(a.get(0).unwrap(), Complex64::new(0.0, 0.0));
}
