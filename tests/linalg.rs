use approx::{assert_abs_diff_eq, assert_relative_eq};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strided_numerics::linalg::{diag, diag_view, eigs, invert, mul, mul_packed, svd};
use strided_numerics::{as_complex, ErrorKind, KernelError, StridedView, StridedViewMut};

fn random_matrix(rows: usize, cols: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows * cols).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn naive_mul(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut c = vec![0.0; m * n];
    for i in 0..m {
        for j in 0..n {
            c[i * n + j] = (0..k).map(|l| a[i * k + l] * b[l * n + j]).sum();
        }
    }
    c
}

#[test]
fn test_mul_matches_naive_with_transposed_rhs() {
    let (m, k, n) = (7, 5, 6);
    let a = random_matrix(m, k, 1);
    // rhs stored as n x k and read transposed
    let bt = random_matrix(n, k, 2);
    let lhs = StridedView::contiguous(&a, &[m, k]).unwrap();
    let rhs_t = StridedView::contiguous(&bt, &[n, k]).unwrap();
    let rhs = rhs_t.transpose().unwrap();

    let mut out = vec![0.0; m * n];
    let mut dst = StridedViewMut::contiguous(&mut out, &[m, n]).unwrap();
    mul(&lhs, &rhs, &mut dst).unwrap();

    let expected = naive_mul(&a, &rhs.to_vec(), m, k, n);
    for (x, y) in out.iter().zip(&expected) {
        assert_relative_eq!(x, y, epsilon = 1e-12);
    }
}

#[test]
fn test_mul_into_strided_destination() {
    let a = random_matrix(3, 4, 3);
    let b = random_matrix(4, 2, 4);
    let lhs = StridedView::contiguous(&a, &[3, 4]).unwrap();
    let rhs = StridedView::contiguous(&b, &[4, 2]).unwrap();

    // Column-major 3x2 destination
    let mut out = vec![0.0; 6];
    let mut dst = StridedViewMut::new(&mut out, &[3, 2], &[1, 3], 0).unwrap();
    mul(&lhs, &rhs, &mut dst).unwrap();

    let expected = naive_mul(&a, &b, 3, 4, 2);
    for i in 0..3 {
        for j in 0..2 {
            assert_relative_eq!(out[j * 3 + i], expected[i * 2 + j], epsilon = 1e-12);
        }
    }
}

#[test]
fn test_mul_packed_complex_matches_naive() {
    let a = random_matrix(2, 6, 5); // 2x3 complex
    let b = random_matrix(3, 4, 6); // 3x2 complex
    let mut out = vec![0.0; 8];
    mul_packed(&a, &b, 2, 2, &mut out, true).unwrap();

    let (ca, cb, co) = (
        as_complex(&a).unwrap(),
        as_complex(&b).unwrap(),
        as_complex(&out).unwrap(),
    );
    for i in 0..2 {
        for j in 0..2 {
            let expected: Complex64 = (0..3).map(|l| ca[i * 3 + l] * cb[l * 2 + j]).sum();
            assert_relative_eq!(co[i * 2 + j].re, expected.re, epsilon = 1e-12);
            assert_relative_eq!(co[i * 2 + j].im, expected.im, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_diag_complex_round_trip() {
    let values = [1.0, 2.0, 3.0, 4.0];
    let mut matrix = vec![0.0; 8];
    diag(&values, &mut matrix, 2, true).unwrap();
    assert_eq!(matrix, vec![1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0, 4.0]);

    let mut back = vec![0.0; 4];
    diag(&matrix, &mut back, 2, true).unwrap();
    assert_eq!(back, values);

    let rect = random_matrix(3, 5, 7);
    let view = StridedView::contiguous(&rect, &[3, 5]).unwrap();
    let mut d = vec![0.0; 3];
    diag_view(&view, &mut d).unwrap();
    assert_eq!(d, vec![rect[0], rect[6], rect[12]]);
}

fn check_svd(m: usize, n: usize, a: &[f64], src: &StridedView<f64>) {
    let k = m.min(n);
    let (mut u, mut s, mut v) = (vec![0.0; m * k], vec![0.0; k], vec![0.0; n * k]);
    svd(src, &mut u, &mut s, &mut v).unwrap();

    for w in s.windows(2) {
        assert!(w[0] >= w[1]);
    }
    for i in 0..m {
        for j in 0..n {
            let r: f64 = (0..k).map(|l| u[i * k + l] * s[l] * v[j * k + l]).sum();
            assert_abs_diff_eq!(r, a[i * n + j], epsilon = 1e-9);
        }
    }
    // V has orthonormal columns
    for p in 0..k {
        for q in 0..k {
            let dot: f64 = (0..n).map(|i| v[i * k + p] * v[i * k + q]).sum();
            assert_abs_diff_eq!(dot, if p == q { 1.0 } else { 0.0 }, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_svd_reconstruction_tall_and_wide() {
    for (m, n, seed) in [(6, 4, 10), (4, 6, 11), (5, 5, 12)] {
        let a = random_matrix(m, n, seed);
        let src = StridedView::contiguous(&a, &[m, n]).unwrap();
        check_svd(m, n, &a, &src);
    }
}

#[test]
fn test_svd_rank_deficient() {
    // Outer product of (1, 2, 3) and (1, -1, 2): rank 1
    let x = [1.0, 2.0, 3.0];
    let y = [1.0, -1.0, 2.0];
    let a: Vec<f64> = x.iter().flat_map(|&p| y.iter().map(move |&q| p * q)).collect();
    let src = StridedView::contiguous(&a, &[3, 3]).unwrap();
    let (mut u, mut s, mut v) = (vec![0.0; 9], vec![0.0; 3], vec![0.0; 9]);
    svd(&src, &mut u, &mut s, &mut v).unwrap();

    assert_relative_eq!(s[0], 14f64.sqrt() * 6f64.sqrt(), epsilon = 1e-12);
    assert_abs_diff_eq!(s[1], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(s[2], 0.0, epsilon = 1e-12);

    // Both factors stay orthonormal across the null space.
    for m in [&u, &v] {
        for p in 0..3 {
            for q in 0..3 {
                let dot: f64 = (0..3).map(|i| m[i * 3 + p] * m[i * 3 + q]).sum();
                assert_abs_diff_eq!(dot, if p == q { 1.0 } else { 0.0 }, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn test_invert_diagonally_dominant() {
    let n = 6;
    let mut a = random_matrix(n, n, 20);
    for i in 0..n {
        a[i * n + i] += n as f64;
    }
    let src = StridedView::contiguous(&a, &[n, n]).unwrap();
    let mut inv = vec![0.0; n * n];
    let mut dst = StridedViewMut::contiguous(&mut inv, &[n, n]).unwrap();
    invert(&src, &mut dst).unwrap();

    let product = naive_mul(&a, &inv, n, n, n);
    for i in 0..n {
        for j in 0..n {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_abs_diff_eq!(product[i * n + j], expected, epsilon = 1e-10);
        }
    }
}

#[test]
fn test_invert_zero_matrix_is_singular() {
    let a = vec![0.0; 9];
    let src = StridedView::contiguous(&a, &[3, 3]).unwrap();
    let mut out = vec![0.0; 9];
    let mut dst = StridedViewMut::contiguous(&mut out, &[3, 3]).unwrap();
    let err = invert(&src, &mut dst).unwrap_err();
    assert!(matches!(err, KernelError::Singular { column: 0, .. }));
    assert_eq!(err.kind(), ErrorKind::Numerical);
}

fn check_eigen_residual(a: &[f64], n: usize, vectors: &[f64], values: &[f64], tol: f64) {
    let vecs = as_complex(vectors).unwrap();
    let vals = as_complex(values).unwrap();
    for j in 0..n {
        let norm: f64 = (0..n).map(|i| vecs[i * n + j].norm_sqr()).sum::<f64>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-10);
        for i in 0..n {
            let av: Complex64 = (0..n).map(|l| vecs[l * n + j] * a[i * n + l]).sum();
            let lv = vals[j] * vecs[i * n + j];
            assert_abs_diff_eq!((av - lv).norm(), 0.0, epsilon = tol);
        }
    }
}

#[test]
fn test_eigs_symmetric_real_spectrum() {
    let n = 5;
    let r = random_matrix(n, n, 30);
    let mut a = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            a[i * n + j] = r[i * n + j] + r[j * n + i];
        }
    }
    let src = StridedView::contiguous(&a, &[n, n]).unwrap();
    let (mut vectors, mut values) = (vec![0.0; 2 * n * n], vec![0.0; 2 * n]);
    eigs(&src, &mut vectors, &mut values).unwrap();

    let vals = as_complex(&values).unwrap();
    assert!(vals.iter().all(|z| z.im == 0.0));
    for w in vals.windows(2) {
        assert!(w[0].re >= w[1].re);
    }
    check_eigen_residual(&a, n, &vectors, &values, 1e-9);
}

#[test]
fn test_eigs_nonsymmetric_residual_and_trace() {
    let n = 6;
    let a = random_matrix(n, n, 31);
    let src = StridedView::contiguous(&a, &[n, n]).unwrap();
    let (mut vectors, mut values) = (vec![0.0; 2 * n * n], vec![0.0; 2 * n]);
    eigs(&src, &mut vectors, &mut values).unwrap();

    let vals = as_complex(&values).unwrap();
    let trace: f64 = (0..n).map(|i| a[i * n + i]).sum();
    let sum: Complex64 = vals.iter().sum();
    assert_abs_diff_eq!(sum.re, trace, epsilon = 1e-9);
    assert_abs_diff_eq!(sum.im, 0.0, epsilon = 1e-9);
    check_eigen_residual(&a, n, &vectors, &values, 1e-8);
}

#[test]
fn test_eigs_rotation_pair_order() {
    // 90 degree rotation: eigenvalues +i then -i
    let a = [0.0, -1.0, 1.0, 0.0];
    let src = StridedView::contiguous(&a, &[2, 2]).unwrap();
    let (mut vectors, mut values) = (vec![0.0; 8], vec![0.0; 4]);
    eigs(&src, &mut vectors, &mut values).unwrap();
    assert_abs_diff_eq!(values[1], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(values[3], -1.0, epsilon = 1e-12);
    check_eigen_residual(&a, 2, &vectors, &values, 1e-12);
}
