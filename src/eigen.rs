//! Dense eigensolvers.
//!
//! - Symmetric input: cyclic two-sided Jacobi. Eigenvalues are real and the
//!   eigenvectors orthonormal.
//! - General input: orthogonal reduction to upper Hessenberg form, Francis
//!   double-shift QR iteration to real Schur form, then back-substitution for
//!   the eigenvectors. Complex eigenvalues come in conjugate pairs.
//!
//! Both solvers work on a dense row-major copy of the input.

use std::ops::{Index, IndexMut};

use num_complex::Complex64;

use crate::jacobi::{identity, JacobiRotation};
use crate::{KernelError, Result, JACOBI_MAX_SWEEPS, QR_MAX_ITERATIONS_PER_EIGENVALUE};

/// Eigenvalues with their eigenvectors; `vectors[j]` belongs to `values[j]`.
#[derive(Debug, Clone)]
pub(crate) struct Eigen {
    pub(crate) values: Vec<Complex64>,
    pub(crate) vectors: Vec<Vec<Complex64>>,
}

impl Eigen {
    /// Order by descending real part, then descending imaginary part.
    pub(crate) fn sort(&mut self) {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| {
            let (x, y) = (self.values[a], self.values[b]);
            y.re.total_cmp(&x.re).then(y.im.total_cmp(&x.im))
        });
        self.values = order.iter().map(|&i| self.values[i]).collect();
        self.vectors = order.iter().map(|&i| self.vectors[i].clone()).collect();
    }

    /// Scale every eigenvector to unit Euclidean norm.
    pub(crate) fn normalize(&mut self) {
        for v in &mut self.vectors {
            let norm = v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
            if norm > 0.0 {
                v.iter_mut().for_each(|z| *z /= norm);
            }
        }
    }
}

// ============================================================================
// Symmetric: cyclic Jacobi
// ============================================================================

/// Eigendecomposition of a symmetric `n x n` row-major matrix.
pub(crate) fn symmetric(mut a: Vec<f64>, n: usize) -> Result<Eigen> {
    let mut v = identity(n);
    let norm = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let eps = f64::EPSILON;

    let mut sweeps = 0;
    loop {
        let mut rotated = false;
        for p in 0..n {
            for q in p + 1..n {
                let (a_pp, a_qq, a_pq) = (a[p * n + p], a[q * n + q], a[p * n + q]);
                // Negligible against the diagonal pair, or against the whole matrix.
                if a_pq.abs() <= eps * (a_pp * a_qq).abs().sqrt() + eps * eps * norm {
                    continue;
                }
                let rot = JacobiRotation::compute(a_pp, a_qq, a_pq);
                rot.rotate_columns(&mut a, n, n, p, q);
                rot.rotate_rows(&mut a, n, p, q);
                a[p * n + q] = 0.0;
                a[q * n + p] = 0.0;
                rot.rotate_columns(&mut v, n, n, p, q);
                rotated = true;
            }
        }
        if !rotated {
            break;
        }
        sweeps += 1;
        if sweeps == JACOBI_MAX_SWEEPS {
            return Err(KernelError::NoConvergence {
                algorithm: "symmetric Jacobi eigensolver",
                iterations: sweeps,
            });
        }
    }
    log::debug!("eigs: symmetric Jacobi converged after {} sweeps", sweeps);

    Ok(Eigen {
        values: (0..n).map(|i| Complex64::new(a[i * n + i], 0.0)).collect(),
        vectors: (0..n)
            .map(|j| (0..n).map(|i| Complex64::new(v[i * n + j], 0.0)).collect())
            .collect(),
    })
}

// ============================================================================
// General: Hessenberg + Francis QR
// ============================================================================

/// Square work matrix addressed with signed indices, which the QR sweep
/// bookkeeping steps below zero.
struct Work {
    n: isize,
    data: Vec<f64>,
}

impl Work {
    fn new(n: usize, data: Vec<f64>) -> Self {
        Self {
            n: n as isize,
            data,
        }
    }
}

impl Index<(isize, isize)> for Work {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (isize, isize)) -> &f64 {
        &self.data[(i * self.n + j) as usize]
    }
}

impl IndexMut<(isize, isize)> for Work {
    #[inline]
    fn index_mut(&mut self, (i, j): (isize, isize)) -> &mut f64 {
        &mut self.data[(i * self.n + j) as usize]
    }
}

/// Complex division `(xr + i xi) / (yr + i yi)`.
#[inline]
fn cdiv(xr: f64, xi: f64, yr: f64, yi: f64) -> (f64, f64) {
    let q = Complex64::new(xr, xi) / Complex64::new(yr, yi);
    (q.re, q.im)
}

/// Reduce `h` to upper Hessenberg form by Householder similarity transforms,
/// accumulating the transformations in `v`.
fn hessenberg(h: &mut Work, v: &mut Work) {
    let n = h.n;
    let (low, high) = (0isize, n - 1);
    let mut ort = vec![0.0; n as usize];

    for m in low + 1..high {
        let scale: f64 = (m..=high).map(|i| h[(i, m - 1)].abs()).sum();
        if scale == 0.0 {
            continue;
        }

        let mut hh = 0.0;
        for i in (m..=high).rev() {
            ort[i as usize] = h[(i, m - 1)] / scale;
            hh += ort[i as usize] * ort[i as usize];
        }
        let mut g = hh.sqrt();
        if ort[m as usize] > 0.0 {
            g = -g;
        }
        hh -= ort[m as usize] * g;
        ort[m as usize] -= g;

        for j in m..n {
            let f = (m..=high).rev().map(|i| ort[i as usize] * h[(i, j)]).sum::<f64>() / hh;
            for i in m..=high {
                h[(i, j)] -= f * ort[i as usize];
            }
        }
        for i in 0..=high {
            let f = (m..=high).rev().map(|j| ort[j as usize] * h[(i, j)]).sum::<f64>() / hh;
            for j in m..=high {
                h[(i, j)] -= f * ort[j as usize];
            }
        }
        ort[m as usize] *= scale;
        h[(m, m - 1)] = scale * g;
    }

    for m in (low + 1..high).rev() {
        if h[(m, m - 1)] == 0.0 {
            continue;
        }
        for i in m + 1..=high {
            ort[i as usize] = h[(i, m - 1)];
        }
        for j in m..=high {
            let g: f64 = (m..=high).map(|i| ort[i as usize] * v[(i, j)]).sum();
            // Double division avoids possible underflow.
            let g = (g / ort[m as usize]) / h[(m, m - 1)];
            for i in m..=high {
                v[(i, j)] += g * ort[i as usize];
            }
        }
    }
}

/// Francis double-shift QR on a Hessenberg matrix, followed by eigenvector
/// back-substitution. On return `d + i e` are the eigenvalues and the columns
/// of `v` hold the (real, packed) eigenvectors.
fn schur_vectors(h: &mut Work, v: &mut Work, d: &mut [f64], e: &mut [f64]) -> Result<()> {
    let nn = h.n;
    let mut n = nn - 1;
    let (low, high) = (0isize, nn - 1);
    let eps = f64::EPSILON;
    let mut exshift = 0.0;
    let (mut p, mut q, mut r, mut s, mut z) = (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
    let (mut t, mut w, mut x, mut y) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);

    let mut norm = 0.0;
    for i in 0..nn {
        for j in (i - 1).max(0)..nn {
            norm += h[(i, j)].abs();
        }
    }

    let mut iter = 0;
    let mut total_iter = 0;
    while n >= low {
        // Look for a single small sub-diagonal element.
        let mut l = n;
        while l > low {
            s = h[(l - 1, l - 1)].abs() + h[(l, l)].abs();
            if s == 0.0 {
                s = norm;
            }
            if h[(l, l - 1)].abs() < eps * s {
                break;
            }
            l -= 1;
        }

        if l == n {
            // One root found.
            h[(n, n)] += exshift;
            d[n as usize] = h[(n, n)];
            e[n as usize] = 0.0;
            n -= 1;
            iter = 0;
        } else if l == n - 1 {
            // Two roots found.
            w = h[(n, n - 1)] * h[(n - 1, n)];
            p = (h[(n - 1, n - 1)] - h[(n, n)]) / 2.0;
            q = p * p + w;
            z = q.abs().sqrt();
            h[(n, n)] += exshift;
            h[(n - 1, n - 1)] += exshift;
            x = h[(n, n)];

            if q >= 0.0 {
                // Real pair.
                z = if p >= 0.0 { p + z } else { p - z };
                d[(n - 1) as usize] = x + z;
                d[n as usize] = d[(n - 1) as usize];
                if z != 0.0 {
                    d[n as usize] = x - w / z;
                }
                e[(n - 1) as usize] = 0.0;
                e[n as usize] = 0.0;
                x = h[(n, n - 1)];
                s = x.abs() + z.abs();
                p = x / s;
                q = z / s;
                r = (p * p + q * q).sqrt();
                p /= r;
                q /= r;

                for j in n - 1..nn {
                    z = h[(n - 1, j)];
                    h[(n - 1, j)] = q * z + p * h[(n, j)];
                    h[(n, j)] = q * h[(n, j)] - p * z;
                }
                for i in 0..=n {
                    z = h[(i, n - 1)];
                    h[(i, n - 1)] = q * z + p * h[(i, n)];
                    h[(i, n)] = q * h[(i, n)] - p * z;
                }
                for i in low..=high {
                    z = v[(i, n - 1)];
                    v[(i, n - 1)] = q * z + p * v[(i, n)];
                    v[(i, n)] = q * v[(i, n)] - p * z;
                }
            } else {
                // Complex pair.
                d[(n - 1) as usize] = x + p;
                d[n as usize] = x + p;
                e[(n - 1) as usize] = z;
                e[n as usize] = -z;
            }
            n -= 2;
            iter = 0;
        } else {
            // No convergence yet; form shift.
            x = h[(n, n)];
            y = 0.0;
            w = 0.0;
            if l < n {
                y = h[(n - 1, n - 1)];
                w = h[(n, n - 1)] * h[(n - 1, n)];
            }

            // Exceptional shifts break cycles.
            if iter == 10 {
                exshift += x;
                for i in low..=n {
                    h[(i, i)] -= x;
                }
                s = h[(n, n - 1)].abs() + h[(n - 1, n - 2)].abs();
                x = 0.75 * s;
                y = x;
                w = -0.4375 * s * s;
            }
            if iter == 30 {
                s = (y - x) / 2.0;
                s = s * s + w;
                if s > 0.0 {
                    s = s.sqrt();
                    if y < x {
                        s = -s;
                    }
                    s = x - w / ((y - x) / 2.0 + s);
                    for i in low..=n {
                        h[(i, i)] -= s;
                    }
                    exshift += s;
                    x = 0.964;
                    y = x;
                    w = x;
                }
            }

            iter += 1;
            total_iter += 1;
            if iter > QR_MAX_ITERATIONS_PER_EIGENVALUE {
                return Err(KernelError::NoConvergence {
                    algorithm: "Hessenberg QR eigensolver",
                    iterations: total_iter,
                });
            }

            // Look for two consecutive small sub-diagonal elements.
            let mut m = n - 2;
            while m >= l {
                z = h[(m, m)];
                r = x - z;
                s = y - z;
                p = (r * s - w) / h[(m + 1, m)] + h[(m, m + 1)];
                q = h[(m + 1, m + 1)] - z - r - s;
                r = h[(m + 2, m + 1)];
                s = p.abs() + q.abs() + r.abs();
                p /= s;
                q /= s;
                r /= s;
                if m == l {
                    break;
                }
                if h[(m, m - 1)].abs() * (q.abs() + r.abs())
                    < eps * (p.abs() * (h[(m - 1, m - 1)].abs() + z.abs() + h[(m + 1, m + 1)].abs()))
                {
                    break;
                }
                m -= 1;
            }

            for i in m + 2..=n {
                h[(i, i - 2)] = 0.0;
                if i > m + 2 {
                    h[(i, i - 3)] = 0.0;
                }
            }

            // Double QR step on rows l..=n and columns m..=n.
            let mut k = m;
            while k < n {
                let notlast = k != n - 1;
                if k != m {
                    p = h[(k, k - 1)];
                    q = h[(k + 1, k - 1)];
                    r = if notlast { h[(k + 2, k - 1)] } else { 0.0 };
                    x = p.abs() + q.abs() + r.abs();
                    if x == 0.0 {
                        k += 1;
                        continue;
                    }
                    p /= x;
                    q /= x;
                    r /= x;
                }

                s = (p * p + q * q + r * r).sqrt();
                if p < 0.0 {
                    s = -s;
                }
                if s != 0.0 {
                    if k != m {
                        h[(k, k - 1)] = -s * x;
                    } else if l != m {
                        h[(k, k - 1)] = -h[(k, k - 1)];
                    }
                    p += s;
                    x = p / s;
                    y = q / s;
                    z = r / s;
                    q /= p;
                    r /= p;

                    for j in k..nn {
                        p = h[(k, j)] + q * h[(k + 1, j)];
                        if notlast {
                            p += r * h[(k + 2, j)];
                            h[(k + 2, j)] -= p * z;
                        }
                        h[(k, j)] -= p * x;
                        h[(k + 1, j)] -= p * y;
                    }
                    for i in 0..=n.min(k + 3) {
                        p = x * h[(i, k)] + y * h[(i, k + 1)];
                        if notlast {
                            p += z * h[(i, k + 2)];
                            h[(i, k + 2)] -= p * r;
                        }
                        h[(i, k)] -= p;
                        h[(i, k + 1)] -= p * q;
                    }
                    for i in low..=high {
                        p = x * v[(i, k)] + y * v[(i, k + 1)];
                        if notlast {
                            p += z * v[(i, k + 2)];
                            v[(i, k + 2)] -= p * r;
                        }
                        v[(i, k)] -= p;
                        v[(i, k + 1)] -= p * q;
                    }
                }
                k += 1;
            }
        }
    }
    log::debug!("eigs: Hessenberg QR converged after {} iterations", total_iter);

    if norm == 0.0 {
        return Ok(());
    }

    // Back-substitute to find vectors of the upper triangular form.
    for n in (0..nn).rev() {
        p = d[n as usize];
        q = e[n as usize];

        if q == 0.0 {
            // Real vector.
            let mut l = n;
            h[(n, n)] = 1.0;
            for i in (0..n).rev() {
                w = h[(i, i)] - p;
                r = (l..=n).map(|j| h[(i, j)] * h[(j, n)]).sum();
                if e[i as usize] < 0.0 {
                    z = w;
                    s = r;
                } else {
                    l = i;
                    if e[i as usize] == 0.0 {
                        h[(i, n)] = if w != 0.0 { -r / w } else { -r / (eps * norm) };
                    } else {
                        // Solve real equations.
                        x = h[(i, i + 1)];
                        y = h[(i + 1, i)];
                        let di = d[i as usize] - p;
                        q = di * di + e[i as usize] * e[i as usize];
                        t = (x * s - z * r) / q;
                        h[(i, n)] = t;
                        h[(i + 1, n)] = if x.abs() > z.abs() {
                            (-r - w * t) / x
                        } else {
                            (-s - y * t) / z
                        };
                    }
                    // Overflow control.
                    t = h[(i, n)].abs();
                    if (eps * t) * t > 1.0 {
                        for j in i..=n {
                            h[(j, n)] /= t;
                        }
                    }
                }
            }
        } else if q < 0.0 {
            // Complex vector; the last component is taken imaginary.
            let mut l = n - 1;
            if h[(n, n - 1)].abs() > h[(n - 1, n)].abs() {
                h[(n - 1, n - 1)] = q / h[(n, n - 1)];
                h[(n - 1, n)] = -(h[(n, n)] - p) / h[(n, n - 1)];
            } else {
                let (cr, ci) = cdiv(0.0, -h[(n - 1, n)], h[(n - 1, n - 1)] - p, q);
                h[(n - 1, n - 1)] = cr;
                h[(n - 1, n)] = ci;
            }
            h[(n, n - 1)] = 0.0;
            h[(n, n)] = 1.0;

            for i in (0..n - 1).rev() {
                let (mut ra, mut sa) = (0.0, 0.0);
                for j in l..=n {
                    ra += h[(i, j)] * h[(j, n - 1)];
                    sa += h[(i, j)] * h[(j, n)];
                }
                w = h[(i, i)] - p;

                if e[i as usize] < 0.0 {
                    z = w;
                    r = ra;
                    s = sa;
                } else {
                    l = i;
                    if e[i as usize] == 0.0 {
                        let (cr, ci) = cdiv(-ra, -sa, w, q);
                        h[(i, n - 1)] = cr;
                        h[(i, n)] = ci;
                    } else {
                        // Solve complex equations.
                        x = h[(i, i + 1)];
                        y = h[(i + 1, i)];
                        let di = d[i as usize] - p;
                        let mut vr = di * di + e[i as usize] * e[i as usize] - q * q;
                        let vi = di * 2.0 * q;
                        if vr == 0.0 && vi == 0.0 {
                            vr = eps * norm * (w.abs() + q.abs() + x.abs() + y.abs() + z.abs());
                        }
                        let (cr, ci) =
                            cdiv(x * r - z * ra + q * sa, x * s - z * sa - q * ra, vr, vi);
                        h[(i, n - 1)] = cr;
                        h[(i, n)] = ci;
                        if x.abs() > z.abs() + q.abs() {
                            h[(i + 1, n - 1)] = (-ra - w * h[(i, n - 1)] + q * h[(i, n)]) / x;
                            h[(i + 1, n)] = (-sa - w * h[(i, n)] - q * h[(i, n - 1)]) / x;
                        } else {
                            let (cr, ci) =
                                cdiv(-r - y * h[(i, n - 1)], -s - y * h[(i, n)], z, q);
                            h[(i + 1, n - 1)] = cr;
                            h[(i + 1, n)] = ci;
                        }
                    }

                    // Overflow control.
                    t = h[(i, n - 1)].abs().max(h[(i, n)].abs());
                    if (eps * t) * t > 1.0 {
                        for j in i..=n {
                            h[(j, n - 1)] /= t;
                            h[(j, n)] /= t;
                        }
                    }
                }
            }
        }
    }

    // Back-transform to the eigenvectors of the original matrix.
    for j in (low..nn).rev() {
        for i in low..=high {
            z = (low..=j.min(high)).map(|k| v[(i, k)] * h[(k, j)]).sum();
            v[(i, j)] = z;
        }
    }
    Ok(())
}

/// Eigendecomposition of a general real `n x n` row-major matrix.
pub(crate) fn general(a: Vec<f64>, n: usize) -> Result<Eigen> {
    let mut h = Work::new(n, a);
    let mut v = Work::new(n, identity(n));
    let mut d = vec![0.0; n];
    let mut e = vec![0.0; n];

    hessenberg(&mut h, &mut v);
    schur_vectors(&mut h, &mut v, &mut d, &mut e)?;

    let column = |j: usize| -> Vec<f64> { (0..n).map(|i| v.data[i * n + j]).collect() };
    let mut values = Vec::with_capacity(n);
    let mut vectors = Vec::with_capacity(n);
    let mut j = 0;
    while j < n {
        if e[j] == 0.0 {
            values.push(Complex64::new(d[j], 0.0));
            vectors.push(column(j).into_iter().map(|x| Complex64::new(x, 0.0)).collect());
            j += 1;
        } else {
            // Columns j, j+1 hold the real and imaginary parts for d[j] + i e[j].
            let (re, im) = (column(j), column(j + 1));
            let vec_pos: Vec<Complex64> = re
                .iter()
                .zip(&im)
                .map(|(&a, &b)| Complex64::new(a, b))
                .collect();
            let vec_neg: Vec<Complex64> = vec_pos.iter().map(|z| z.conj()).collect();
            values.push(Complex64::new(d[j], e[j]));
            vectors.push(vec_pos);
            values.push(Complex64::new(d[j + 1], e[j + 1]));
            vectors.push(vec_neg);
            j += 2;
        }
    }
    Ok(Eigen { values, vectors })
}
