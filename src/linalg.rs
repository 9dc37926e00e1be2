//! Dense linear algebra on strided matrices.
//!
//! Every routine reads rank-2 [`StridedView`]s, so row and column strides are
//! explicit and transposed or reversed matrices need no copy.
//!
//! # Key functions
//!
//! - [`mul`] / [`mul_packed`]: matrix product, real or complex
//! - [`diag`] / [`diag_view`]: diagonal extraction and construction
//! - [`svd`]: one-sided Jacobi singular value decomposition
//! - [`eigs`]: eigendecomposition (Jacobi for symmetric input, Hessenberg QR otherwise)
//! - [`invert`]: LU inverse with partial pivoting

use std::fmt::Debug;
use std::ops::{Add, Mul};

use num_complex::Complex64;
use num_traits::Zero;

use crate::complex::{as_complex, as_complex_mut};
use crate::eigen;
use crate::jacobi::{argsort_desc, column_gram, identity, JacobiRotation};
use crate::map::copy_into;
use crate::view::{StridedView, StridedViewMut};
use crate::{KernelError, Result, JACOBI_MAX_SWEEPS, SYMMETRY_TOLERANCE};

/// Element types accepted by [`mul`].
pub trait Scalar:
    Copy + Zero + Add<Output = Self> + Mul<Output = Self> + Send + Sync + Debug
{
}

impl Scalar for f64 {}
impl Scalar for Complex64 {}

fn matrix_dims<T>(view: &StridedView<T>) -> Result<(usize, usize)> {
    match view.dims() {
        &[rows, cols] => Ok((rows, cols)),
        dims => Err(KernelError::RankMismatch(dims.len(), 2)),
    }
}

fn square_dim<T>(view: &StridedView<T>) -> Result<usize> {
    let (rows, cols) = matrix_dims(view)?;
    if rows != cols {
        return Err(KernelError::NonSquare { rows, cols });
    }
    Ok(rows)
}

fn check_len(actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(KernelError::BufferLength { expected, actual });
    }
    Ok(())
}

// ============================================================================
// Matrix product
// ============================================================================

#[inline]
fn dot<T: Scalar>(lhs: &StridedView<T>, rhs: &StridedView<T>, i: usize, j: usize, k: usize) -> T {
    let (ls, rs) = (lhs.strides(), rhs.strides());
    let mut a = i as isize * ls[0];
    let mut b = j as isize * rs[1];
    let mut sum = T::zero();
    for _ in 0..k {
        sum = sum + *lhs.at(a) * *rhs.at(b);
        a += ls[1];
        b += rs[0];
    }
    sum
}

/// Matrix product `dst = lhs * rhs`.
///
/// `lhs` is `m x k`, `rhs` is `k x n` and `dst` is `m x n`; any strides.
/// With the `parallel` feature and a contiguous `dst`, rows are computed on
/// the rayon pool.
///
/// ```
/// use strided_numerics::{linalg, StridedView, StridedViewMut};
///
/// let a = [1.0, 2.0, 3.0, 4.0];
/// let lhs = StridedView::contiguous(&a, &[2, 2]).unwrap();
/// let rhs = lhs.transpose().unwrap();
/// let mut out = [0.0; 4];
/// let mut dst = StridedViewMut::contiguous(&mut out, &[2, 2]).unwrap();
/// linalg::mul(&lhs, &rhs, &mut dst).unwrap();
/// assert_eq!(out, [5.0, 11.0, 11.0, 25.0]);
/// ```
pub fn mul<T: Scalar>(
    lhs: &StridedView<T>,
    rhs: &StridedView<T>,
    dst: &mut StridedViewMut<T>,
) -> Result<()> {
    let (m, k) = matrix_dims(lhs)?;
    let (k2, n) = matrix_dims(rhs)?;
    if k != k2 {
        return Err(KernelError::ShapeMismatch(
            lhs.dims().to_vec(),
            rhs.dims().to_vec(),
        ));
    }
    if dst.dims() != [m, n] {
        return Err(KernelError::ShapeMismatch(vec![m, n], dst.dims().to_vec()));
    }
    if m == 0 || n == 0 {
        return Ok(());
    }

    #[cfg(feature = "parallel")]
    {
        if dst.is_contiguous() {
            use rayon::prelude::*;

            log::trace!("mul: {}x{}x{} on {} threads", m, k, n, rayon::current_num_threads());
            let off = dst.offset();
            dst.data_mut()[off..off + m * n]
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(i, row)| {
                    for (j, out) in row.iter_mut().enumerate() {
                        *out = dot(lhs, rhs, i, j, k);
                    }
                });
            return Ok(());
        }
    }

    let ds = dst.strides().to_vec();
    for i in 0..m {
        for j in 0..n {
            *dst.at_mut(i as isize * ds[0] + j as isize * ds[1]) = dot(lhs, rhs, i, j, k);
        }
    }
    Ok(())
}

/// Matrix product over flat row-major buffers.
///
/// `lhs` has `lhs_rows` rows and `rhs` has `rhs_cols` columns; the inner
/// dimension is inferred from the buffer lengths. With `complex` set, all
/// three buffers are interleaved complex and lengths count complex elements.
pub fn mul_packed(
    lhs: &[f64],
    rhs: &[f64],
    lhs_rows: usize,
    rhs_cols: usize,
    dst: &mut [f64],
    complex: bool,
) -> Result<()> {
    if complex {
        let (l, r) = (as_complex(lhs)?, as_complex(rhs)?);
        let d = as_complex_mut(dst)?;
        return mul_flat(l, r, lhs_rows, rhs_cols, d);
    }
    mul_flat(lhs, rhs, lhs_rows, rhs_cols, dst)
}

fn mul_flat<T: Scalar>(
    lhs: &[T],
    rhs: &[T],
    lhs_rows: usize,
    rhs_cols: usize,
    dst: &mut [T],
) -> Result<()> {
    let inner = if lhs_rows > 0 {
        lhs.len() / lhs_rows
    } else if rhs_cols > 0 {
        rhs.len() / rhs_cols
    } else {
        0
    };
    check_len(lhs.len(), lhs_rows * inner)?;
    check_len(rhs.len(), inner * rhs_cols)?;
    check_len(dst.len(), lhs_rows * rhs_cols)?;

    let a = StridedView::contiguous(lhs, &[lhs_rows, inner])?;
    let b = StridedView::contiguous(rhs, &[inner, rhs_cols])?;
    let mut c = StridedViewMut::contiguous(dst, &[lhs_rows, rhs_cols])?;
    mul(&a, &b, &mut c)
}

// ============================================================================
// Diagonal
// ============================================================================

fn diag_flat<T: Copy + Zero>(src: &[T], dst: &mut [T], size: usize) -> Result<()> {
    if src.len() == size * size && dst.len() == size {
        for (i, out) in dst.iter_mut().enumerate() {
            *out = src[i * size + i];
        }
        Ok(())
    } else if src.len() == size && dst.len() == size * size {
        dst.fill(T::zero());
        for (i, &x) in src.iter().enumerate() {
            dst[i * size + i] = x;
        }
        Ok(())
    } else {
        Err(KernelError::ShapeMismatch(vec![src.len()], vec![dst.len()]))
    }
}

/// Diagonal extraction or construction over flat row-major buffers.
///
/// The direction follows the buffer sizes: a `size * size` source with a
/// `size` destination extracts the diagonal; a `size` source with a
/// `size * size` destination builds a diagonal matrix with zeros elsewhere.
/// With `complex` set, sizes count interleaved complex elements.
pub fn diag(src: &[f64], dst: &mut [f64], size: usize, complex: bool) -> Result<()> {
    if complex {
        return diag_flat(as_complex(src)?, as_complex_mut(dst)?, size);
    }
    diag_flat(src, dst, size)
}

/// Extract the main diagonal of a strided matrix; `dst` holds `min(rows, cols)` elements.
pub fn diag_view<T: Copy>(src: &StridedView<T>, dst: &mut [T]) -> Result<()> {
    let (rows, cols) = matrix_dims(src)?;
    check_len(dst.len(), rows.min(cols))?;
    let step = src.strides()[0] + src.strides()[1];
    for (i, out) in dst.iter_mut().enumerate() {
        *out = *src.at(i as isize * step);
    }
    Ok(())
}

// ============================================================================
// Singular value decomposition
// ============================================================================

/// One-sided Jacobi on a tall `rows x cols` row-major matrix (`rows >= cols`).
///
/// Returns `(u, sigma, v)` with `u` `rows x cols`, `v` `cols x cols`, columns
/// ordered by descending singular value.
fn one_sided_jacobi(mut w: Vec<f64>, rows: usize, cols: usize) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    let mut v = identity(cols);
    let tol = f64::EPSILON * rows as f64;

    let mut sweeps = 0;
    loop {
        let mut rotated = false;
        for p in 0..cols {
            for q in p + 1..cols {
                let (alpha, beta, gamma) = column_gram(&w, rows, cols, p, q);
                if alpha == 0.0 || beta == 0.0 || gamma.abs() <= tol * (alpha * beta).sqrt() {
                    continue;
                }
                let rot = JacobiRotation::compute(alpha, beta, gamma);
                rot.rotate_columns(&mut w, rows, cols, p, q);
                rot.rotate_columns(&mut v, cols, cols, p, q);
                rotated = true;
            }
        }
        if !rotated {
            break;
        }
        sweeps += 1;
        if sweeps == JACOBI_MAX_SWEEPS {
            return Err(KernelError::NoConvergence {
                algorithm: "one-sided Jacobi SVD",
                iterations: sweeps,
            });
        }
    }
    log::debug!("svd: {}x{} converged after {} sweeps", rows, cols, sweeps);

    let norms: Vec<f64> = (0..cols)
        .map(|j| (0..rows).map(|i| w[i * cols + j] * w[i * cols + j]).sum::<f64>().sqrt())
        .collect();
    let order = argsort_desc(&norms);

    let mut u = vec![0.0; rows * cols];
    let mut v_sorted = vec![0.0; cols * cols];
    let mut sigma = Vec::with_capacity(cols);
    let mut filled = vec![false; cols];
    for (dst_col, &j) in order.iter().enumerate() {
        let s = norms[j];
        sigma.push(s);
        if s > 0.0 {
            for i in 0..rows {
                u[i * cols + dst_col] = w[i * cols + j] / s;
            }
            filled[dst_col] = true;
        }
        for i in 0..cols {
            v_sorted[i * cols + dst_col] = v[i * cols + j];
        }
    }
    complete_basis(&mut u, rows, cols, &mut filled);
    Ok((u, sigma, v_sorted))
}

/// Fill the unset columns of a `rows x cols` matrix (`rows >= cols`) so that
/// all columns are orthonormal.
///
/// Each new column is the unit vector with the largest component outside the
/// span of the columns set so far, orthogonalized and normalized.
fn complete_basis(u: &mut [f64], rows: usize, cols: usize, filled: &mut [bool]) {
    for col in 0..cols {
        if filled[col] {
            continue;
        }
        let mut best: Option<(f64, Vec<f64>)> = None;
        for e in 0..rows {
            let mut x = vec![0.0; rows];
            x[e] = 1.0;
            // Two Gram-Schmidt passes against the columns set so far.
            for _ in 0..2 {
                for other in (0..cols).filter(|&c| filled[c]) {
                    let dot: f64 = (0..rows).map(|i| u[i * cols + other] * x[i]).sum();
                    for (i, xi) in x.iter_mut().enumerate() {
                        *xi -= dot * u[i * cols + other];
                    }
                }
            }
            let norm = x.iter().map(|xi| xi * xi).sum::<f64>().sqrt();
            if best.as_ref().map_or(true, |(b, _)| norm > *b) {
                best = Some((norm, x));
            }
        }
        if let Some((norm, x)) = best {
            if norm > 0.0 {
                for (i, xi) in x.iter().enumerate() {
                    u[i * cols + col] = xi / norm;
                }
                filled[col] = true;
            }
        }
    }
}

/// Singular value decomposition `src = U diag(S) V^T`.
///
/// For an `m x n` source and `k = min(m, n)`: `u` receives `m x k`, `s`
/// receives `k` non-increasing values and `v` receives `n x k`, all
/// row-major. Rank-deficient input yields zero singular values; the factor
/// columns paired with them are completed to an orthonormal basis, so both
/// `U` and `V` always have orthonormal columns.
///
/// # Errors
/// `BufferLength` for wrongly sized outputs, `NoConvergence` if the sweep
/// budget is exhausted.
pub fn svd(src: &StridedView<f64>, u: &mut [f64], s: &mut [f64], v: &mut [f64]) -> Result<()> {
    let (m, n) = matrix_dims(src)?;
    let k = m.min(n);
    check_len(u.len(), m * k)?;
    check_len(s.len(), k)?;
    check_len(v.len(), n * k)?;
    if k == 0 {
        return Ok(());
    }

    if m >= n {
        let (left, sigma, right) = one_sided_jacobi(src.to_vec(), m, n)?;
        u.copy_from_slice(&left);
        s.copy_from_slice(&sigma);
        v.copy_from_slice(&right);
    } else {
        // Decompose the transpose and swap the factors.
        let (left, sigma, right) = one_sided_jacobi(src.transpose()?.to_vec(), n, m)?;
        u.copy_from_slice(&right);
        s.copy_from_slice(&sigma);
        v.copy_from_slice(&left);
    }
    Ok(())
}

// ============================================================================
// Eigendecomposition
// ============================================================================

fn is_symmetric(a: &[f64], n: usize) -> bool {
    let scale = a.iter().fold(0.0f64, |m, x| m.max(x.abs()));
    (0..n).all(|i| (i + 1..n).all(|j| (a[i * n + j] - a[j * n + i]).abs() <= SYMMETRY_TOLERANCE * scale))
}

/// Eigendecomposition of a square matrix.
///
/// `values` receives `n` complex eigenvalues as interleaved `(re, im)` pairs,
/// ordered by descending real part and then descending imaginary part, so a
/// conjugate pair is adjacent with the positive imaginary part first.
/// `vectors` receives an `n x n` complex matrix (row-major, interleaved) whose
/// column `j` is the unit-norm eigenvector of eigenvalue `j`.
///
/// Symmetric input (within [`SYMMETRY_TOLERANCE`]) takes the Jacobi path and
/// produces real eigenvalues and orthonormal real eigenvectors.
pub fn eigs(src: &StridedView<f64>, vectors: &mut [f64], values: &mut [f64]) -> Result<()> {
    let n = square_dim(src)?;
    check_len(values.len(), 2 * n)?;
    check_len(vectors.len(), 2 * n * n)?;

    let a = src.to_vec();
    let mut eig = if is_symmetric(&a, n) {
        eigen::symmetric(a, n)?
    } else {
        log::debug!("eigs: {}x{} input is not symmetric, using Hessenberg QR", n, n);
        eigen::general(a, n)?
    };
    eig.normalize();
    eig.sort();

    as_complex_mut(values)?.copy_from_slice(&eig.values);
    let out = as_complex_mut(vectors)?;
    for (j, vector) in eig.vectors.iter().enumerate() {
        for (i, &z) in vector.iter().enumerate() {
            out[i * n + j] = z;
        }
    }
    Ok(())
}

// ============================================================================
// Inverse
// ============================================================================

/// Inverse of a square matrix through LU decomposition with partial pivoting.
///
/// # Errors
/// `Singular` when a pivot falls below `n * eps * max|a_ij|` (an all-zero
/// matrix always fails). Nothing is written to `dst` in that case.
pub fn invert(src: &StridedView<f64>, dst: &mut StridedViewMut<f64>) -> Result<()> {
    let n = square_dim(src)?;
    if dst.dims() != [n, n] {
        return Err(KernelError::ShapeMismatch(vec![n, n], dst.dims().to_vec()));
    }
    if n == 0 {
        return Ok(());
    }

    let mut lu = src.to_vec();
    let scale = lu.iter().fold(0.0f64, |m, x| m.max(x.abs()));
    let tol = n as f64 * f64::EPSILON * scale;
    let mut perm: Vec<usize> = (0..n).collect();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| lu[a * n + col].abs().total_cmp(&lu[b * n + col].abs()))
            .unwrap_or(col);
        let pivot = lu[pivot_row * n + col];
        if pivot.abs() <= tol || !pivot.is_finite() {
            return Err(KernelError::Singular { column: col, pivot });
        }
        if pivot_row != col {
            for j in 0..n {
                lu.swap(col * n + j, pivot_row * n + j);
            }
            perm.swap(col, pivot_row);
        }
        for r in col + 1..n {
            let factor = lu[r * n + col] / pivot;
            lu[r * n + col] = factor;
            for c in col + 1..n {
                lu[r * n + c] -= factor * lu[col * n + c];
            }
        }
    }

    // Solve LU x = P e_j for every column j.
    let mut inv = vec![0.0; n * n];
    let mut x = vec![0.0; n];
    for j in 0..n {
        for (i, xi) in x.iter_mut().enumerate() {
            *xi = if perm[i] == j { 1.0 } else { 0.0 };
        }
        for i in 0..n {
            let s: f64 = (0..i).map(|c| lu[i * n + c] * x[c]).sum();
            x[i] -= s;
        }
        for i in (0..n).rev() {
            let s: f64 = (i + 1..n).map(|c| lu[i * n + c] * x[c]).sum();
            x[i] = (x[i] - s) / lu[i * n + i];
        }
        for i in 0..n {
            inv[i * n + j] = x[i];
        }
    }

    copy_into(&StridedView::contiguous(&inv, &[n, n])?, dst)
}
