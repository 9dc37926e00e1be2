//! Jacobi rotations shared by the SVD and the symmetric eigensolver.
//!
//! Matrices here are dense row-major work buffers owned by the solver.

/// Plane rotation `[[c, s], [-s, c]]` acting on a pair of columns `(p, q)`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct JacobiRotation {
    pub(crate) c: f64,
    pub(crate) s: f64,
}

impl JacobiRotation {
    /// Rotation that zeroes the off-diagonal of the symmetric 2x2 block
    /// `[[a_pp, a_pq], [a_pq, a_qq]]`.
    ///
    /// Uses the LAPACK-stable form of the smaller root:
    /// ```text
    /// tau = (a_qq - a_pp) / (2 a_pq)
    /// t   = sign(tau) / (|tau| + sqrt(1 + tau^2))
    /// c   = 1 / sqrt(1 + t^2),  s = t c
    /// ```
    #[inline]
    pub(crate) fn compute(a_pp: f64, a_qq: f64, a_pq: f64) -> Self {
        if a_pq == 0.0 {
            return Self { c: 1.0, s: 0.0 };
        }
        let tau = (a_qq - a_pp) / (2.0 * a_pq);
        let root = tau.hypot(1.0);
        let t = if tau >= 0.0 {
            1.0 / (tau + root)
        } else {
            -1.0 / (-tau + root)
        };
        let c = 1.0 / t.hypot(1.0);
        Self { c, s: t * c }
    }

    /// `col_p <- c col_p - s col_q`, `col_q <- s col_p + c col_q`.
    #[inline]
    pub(crate) fn rotate_columns(&self, data: &mut [f64], rows: usize, cols: usize, p: usize, q: usize) {
        for i in 0..rows {
            let (ip, iq) = (i * cols + p, i * cols + q);
            let (vp, vq) = (data[ip], data[iq]);
            data[ip] = self.c * vp - self.s * vq;
            data[iq] = self.s * vp + self.c * vq;
        }
    }

    /// `row_p <- c row_p - s row_q`, `row_q <- s row_p + c row_q`.
    #[inline]
    pub(crate) fn rotate_rows(&self, data: &mut [f64], cols: usize, p: usize, q: usize) {
        for j in 0..cols {
            let (pj, qj) = (p * cols + j, q * cols + j);
            let (vp, vq) = (data[pj], data[qj]);
            data[pj] = self.c * vp - self.s * vq;
            data[qj] = self.s * vp + self.c * vq;
        }
    }
}

/// Squared norms of columns `p`, `q` and their dot product.
#[inline]
pub(crate) fn column_gram(data: &[f64], rows: usize, cols: usize, p: usize, q: usize) -> (f64, f64, f64) {
    let (mut app, mut aqq, mut apq) = (0.0, 0.0, 0.0);
    for i in 0..rows {
        let (vp, vq) = (data[i * cols + p], data[i * cols + q]);
        app += vp * vp;
        aqq += vq * vq;
        apq += vp * vq;
    }
    (app, aqq, apq)
}

/// Row-major identity matrix.
pub(crate) fn identity(n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    for i in 0..n {
        out[i * n + i] = 1.0;
    }
    out
}

/// Indices that sort `values` in descending order (stable).
pub(crate) fn argsort_desc(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rotation_zeroes_off_diagonal() {
        let (a_pp, a_qq, a_pq) = (2.0, -1.0, 0.7);
        let rot = JacobiRotation::compute(a_pp, a_qq, a_pq);
        let mut a = vec![a_pp, a_pq, a_pq, a_qq];
        rot.rotate_columns(&mut a, 2, 2, 0, 1);
        rot.rotate_rows(&mut a, 2, 0, 1);
        assert_abs_diff_eq!(a[1], 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(a[2], 0.0, epsilon = 1e-14);
        // Trace is preserved
        assert_abs_diff_eq!(a[0] + a[3], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_rotation_orthogonalizes_columns() {
        // Columns (1, 1) and (1, 0)
        let mut a = vec![1.0, 1.0, 1.0, 0.0];
        let (app, aqq, apq) = column_gram(&a, 2, 2, 0, 1);
        JacobiRotation::compute(app, aqq, apq).rotate_columns(&mut a, 2, 2, 0, 1);
        let (_, _, dot) = column_gram(&a, 2, 2, 0, 1);
        assert_abs_diff_eq!(dot, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_argsort_desc() {
        assert_eq!(argsort_desc(&[1.0, 3.0, 2.0]), vec![1, 2, 0]);
    }
}
