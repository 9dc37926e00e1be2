//! Element-wise operations over flat buffers.
//!
//! Real buffers are `f64`, integer buffers are `i32` and complex buffers are
//! interleaved `(re, im)` pairs of `f64`. Complex arithmetic goes through
//! `Complex64` after an in-place cast (see [`crate::as_complex`]).

use num_complex::Complex64;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::complex::{as_complex, as_complex_mut};
use crate::opcode::{
    AccumulatorOp, BinaryOp, ComplexUnaryOp, ConvertOp, CumulativeOp, IntegerUnaryOp, RealUnaryOp,
};
use crate::seed::with_rng;
use crate::{KernelError, Result};

// ============================================================================
// Unary updates
// ============================================================================

/// Apply `dst[i] = op(a, dst[i])` in place over a real buffer.
///
/// `Rnd` overwrites every element with a uniform sample from `[0, a)` and
/// `Shuffle` permutes the buffer; both draw from the process-wide generator.
///
/// ```
/// use strided_numerics::{ru_op, opcode::RealUnaryOp};
///
/// let mut x = vec![1.0, 4.0, 9.0];
/// ru_op(RealUnaryOp::Sqrt, 0.0, &mut x);
/// assert_eq!(x, vec![1.0, 2.0, 3.0]);
/// ```
pub fn ru_op(op: RealUnaryOp, a: f64, dst: &mut [f64]) {
    match op {
        RealUnaryOp::Rnd => with_rng(|rng| {
            for x in dst.iter_mut() {
                *x = rng.gen::<f64>() * a;
            }
        }),
        RealUnaryOp::Shuffle => with_rng(|rng| dst.shuffle(rng)),
        _ => {
            let f = real_unary(op, a);
            for x in dst.iter_mut() {
                *x = f(*x);
            }
        }
    }
}

fn real_unary(op: RealUnaryOp, a: f64) -> impl Fn(f64) -> f64 {
    move |x: f64| match op {
        RealUnaryOp::Add => x + a,
        RealUnaryOp::Mul => x * a,
        RealUnaryOp::Fill => a,
        RealUnaryOp::Abs => x.abs(),
        RealUnaryOp::Pow => x.powf(a),
        RealUnaryOp::Exp => x.exp(),
        RealUnaryOp::Log => x.ln(),
        RealUnaryOp::Sqrt => x.sqrt(),
        RealUnaryOp::Sqr => x * x,
        RealUnaryOp::Inv => 1.0 / x,
        RealUnaryOp::Ceil => x.ceil(),
        RealUnaryOp::Floor => x.floor(),
        RealUnaryOp::Round => x.round(),
        RealUnaryOp::Sin => x.sin(),
        RealUnaryOp::Cos => x.cos(),
        RealUnaryOp::Tan => x.tan(),
        RealUnaryOp::Asin => x.asin(),
        RealUnaryOp::Acos => x.acos(),
        RealUnaryOp::Atan => x.atan(),
        RealUnaryOp::Sinh => x.sinh(),
        RealUnaryOp::Cosh => x.cosh(),
        RealUnaryOp::Tanh => x.tanh(),
        // Handled by the caller.
        RealUnaryOp::Rnd | RealUnaryOp::Shuffle => x,
    }
}

/// Apply `dst[i] = op(a, dst[i])` in place over an interleaved complex buffer.
///
/// `Rnd` draws the real part from `[0, a.re)` and the imaginary part from
/// `[0, a.im)`.
///
/// # Errors
/// `ComplexLength` if `dst` has an odd number of doubles.
pub fn cu_op(op: ComplexUnaryOp, a: Complex64, dst: &mut [f64]) -> Result<()> {
    let z = as_complex_mut(dst)?;
    if op == ComplexUnaryOp::Rnd {
        with_rng(|rng| {
            for v in z.iter_mut() {
                *v = Complex64::new(rng.gen::<f64>() * a.re, rng.gen::<f64>() * a.im);
            }
        });
        return Ok(());
    }
    for v in z.iter_mut() {
        *v = match op {
            ComplexUnaryOp::Add => *v + a,
            ComplexUnaryOp::Mul => *v * a,
            ComplexUnaryOp::Fill => a,
            ComplexUnaryOp::Exp => v.exp(),
            ComplexUnaryOp::Inv => v.inv(),
            ComplexUnaryOp::Sqrt => v.sqrt(),
            ComplexUnaryOp::Log => v.ln(),
            ComplexUnaryOp::Conj => v.conj(),
            ComplexUnaryOp::Cos => v.cos(),
            ComplexUnaryOp::Sin => v.sin(),
            ComplexUnaryOp::Rnd => *v,
        };
    }
    Ok(())
}

/// Apply `dst[i] = op(a, dst[i])` in place over an integer buffer.
///
/// Arithmetic wraps on overflow. `Rnd` draws each element uniformly with
/// magnitude below `|a|` and the sign of `a` (zeros when `a == 0`).
pub fn iu_op(op: IntegerUnaryOp, a: i32, dst: &mut [i32]) {
    match op {
        IntegerUnaryOp::Add => dst.iter_mut().for_each(|x| *x = x.wrapping_add(a)),
        IntegerUnaryOp::Mul => dst.iter_mut().for_each(|x| *x = x.wrapping_mul(a)),
        IntegerUnaryOp::Fill => dst.fill(a),
        IntegerUnaryOp::Abs => dst.iter_mut().for_each(|x| *x = x.wrapping_abs()),
        IntegerUnaryOp::Rnd => {
            let bound = (a as i64).unsigned_abs();
            if bound == 0 {
                dst.fill(0);
                return;
            }
            let sign = if a < 0 { -1i64 } else { 1 };
            with_rng(|rng| {
                for x in dst.iter_mut() {
                    *x = (sign * rng.gen_range(0..bound) as i64) as i32;
                }
            });
        }
        IntegerUnaryOp::Shuffle => with_rng(|rng| dst.shuffle(rng)),
    }
}

// ============================================================================
// Binary operations
// ============================================================================

fn check_lengths(lhs: usize, rhs: usize, dst: usize) -> Result<()> {
    for actual in [rhs, dst] {
        if actual != lhs {
            return Err(KernelError::BufferLength {
                expected: lhs,
                actual,
            });
        }
    }
    Ok(())
}

#[inline]
fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Binary element-wise operation `dst[i] = op(lhs[i], rhs[i])` over `f64` buffers.
///
/// With `complex` set, the buffers are interleaved complex and only `Add`,
/// `Sub`, `Mul` and `Div` apply. Comparison and logical opcodes write 1 or 0.
///
/// # Errors
/// - `BufferLength` when the three buffers differ in length
/// - `ComplexLength` for odd complex buffers
/// - `UnsupportedOpcode` for an ordering or logical opcode in complex mode
pub fn e_op(op: BinaryOp, lhs: &[f64], rhs: &[f64], dst: &mut [f64], complex: bool) -> Result<()> {
    check_lengths(lhs.len(), rhs.len(), dst.len())?;

    if complex {
        let (l, r) = (as_complex(lhs)?, as_complex(rhs)?);
        let f: fn(Complex64, Complex64) -> Complex64 = match op {
            BinaryOp::Add => |x, y| x + y,
            BinaryOp::Sub => |x, y| x - y,
            BinaryOp::Mul => |x, y| x * y,
            BinaryOp::Div => |x, y| x / y,
            _ => return Err(op.unsupported()),
        };
        let d = as_complex_mut(dst)?;
        for ((out, &x), &y) in d.iter_mut().zip(l).zip(r) {
            *out = f(x, y);
        }
        return Ok(());
    }

    let f: fn(f64, f64) -> f64 = match op {
        BinaryOp::Add => |x, y| x + y,
        BinaryOp::Sub => |x, y| x - y,
        BinaryOp::Mul => |x, y| x * y,
        BinaryOp::Div => |x, y| x / y,
        BinaryOp::Max => f64::max,
        BinaryOp::Min => f64::min,
        BinaryOp::Eq => |x, y| truth(x == y),
        BinaryOp::Gt => |x, y| truth(x > y),
        BinaryOp::Lt => |x, y| truth(x < y),
        BinaryOp::And => |x, y| truth(x != 0.0 && y != 0.0),
        BinaryOp::Or => |x, y| truth(x != 0.0 || y != 0.0),
    };
    for ((out, &x), &y) in dst.iter_mut().zip(lhs).zip(rhs) {
        *out = f(x, y);
    }
    Ok(())
}

/// Binary element-wise operation over `i32` buffers, wrapping on overflow.
///
/// # Errors
/// `DivisionByZero` (with the first offending position) is reported before
/// anything is written.
pub fn e_op_int(op: BinaryOp, lhs: &[i32], rhs: &[i32], dst: &mut [i32]) -> Result<()> {
    check_lengths(lhs.len(), rhs.len(), dst.len())?;
    if op == BinaryOp::Div {
        if let Some(pos) = rhs.iter().position(|&y| y == 0) {
            return Err(KernelError::DivisionByZero(pos));
        }
    }

    let f: fn(i32, i32) -> i32 = match op {
        BinaryOp::Add => i32::wrapping_add,
        BinaryOp::Sub => i32::wrapping_sub,
        BinaryOp::Mul => i32::wrapping_mul,
        BinaryOp::Div => i32::wrapping_div,
        BinaryOp::Max => std::cmp::max,
        BinaryOp::Min => std::cmp::min,
        BinaryOp::Eq => |x, y| (x == y) as i32,
        BinaryOp::Gt => |x, y| (x > y) as i32,
        BinaryOp::Lt => |x, y| (x < y) as i32,
        BinaryOp::And => |x, y| (x != 0 && y != 0) as i32,
        BinaryOp::Or => |x, y| (x != 0 || y != 0) as i32,
    };
    for ((out, &x), &y) in dst.iter_mut().zip(lhs).zip(rhs) {
        *out = f(x, y);
    }
    Ok(())
}

// ============================================================================
// Folds and scans
// ============================================================================

/// Fold a whole buffer to one scalar.
///
/// Empty buffers return the identity of the fold: `Sum` 0, `Prod` 1,
/// `Max` -inf, `Min` +inf, `Ent` 0. `Var` (population variance) of an empty
/// buffer is NaN.
pub fn ra_op(op: AccumulatorOp, src: &[f64]) -> f64 {
    match op {
        AccumulatorOp::Sum => src.iter().sum(),
        AccumulatorOp::Prod => src.iter().product(),
        AccumulatorOp::Max => src.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AccumulatorOp::Min => src.iter().copied().fold(f64::INFINITY, f64::min),
        AccumulatorOp::Var => variance(src.iter().copied()),
        AccumulatorOp::Ent => -src
            .iter()
            .filter(|&&p| p != 0.0)
            .map(|&p| p * p.ln())
            .sum::<f64>(),
    }
}

/// Population variance, two-pass.
pub(crate) fn variance<I>(values: I) -> f64
where
    I: Iterator<Item = f64> + Clone,
{
    let (n, sum) = values.clone().fold((0usize, 0.0), |(n, s), x| (n + 1, s + x));
    if n == 0 {
        return f64::NAN;
    }
    let mean = sum / n as f64;
    values.map(|x| (x - mean) * (x - mean)).sum::<f64>() / n as f64
}

/// Running fold from left to right; `out[i]` folds `src[..=i]`.
pub fn ca_op(op: CumulativeOp, src: &[f64]) -> Vec<f64> {
    let mut acc = match op {
        CumulativeOp::Sum => 0.0,
        CumulativeOp::Prod => 1.0,
    };
    src.iter()
        .map(|&x| {
            match op {
                CumulativeOp::Sum => acc += x,
                CumulativeOp::Prod => acc *= x,
            }
            acc
        })
        .collect()
}

// ============================================================================
// Conversion
// ============================================================================

/// A read-only numeric buffer of one of the three element kinds.
#[derive(Debug, Clone, Copy)]
pub enum NumericSlice<'a> {
    Real(&'a [f64]),
    /// Interleaved `(re, im)` pairs
    Complex(&'a [f64]),
    Integer(&'a [i32]),
}

/// A writable numeric buffer of one of the three element kinds.
#[derive(Debug)]
pub enum NumericSliceMut<'a> {
    Real(&'a mut [f64]),
    /// Interleaved `(re, im)` pairs
    Complex(&'a mut [f64]),
    Integer(&'a mut [i32]),
}

impl NumericSlice<'_> {
    /// Number of elements (complex pairs count once).
    pub fn elements(&self) -> Result<usize> {
        Ok(match self {
            NumericSlice::Real(x) => x.len(),
            NumericSlice::Complex(x) => as_complex(x)?.len(),
            NumericSlice::Integer(x) => x.len(),
        })
    }

    fn read(&self) -> Result<Vec<Complex64>> {
        Ok(match self {
            NumericSlice::Real(x) => x.iter().map(|&v| Complex64::new(v, 0.0)).collect(),
            NumericSlice::Complex(x) => as_complex(x)?.to_vec(),
            NumericSlice::Integer(x) => x.iter().map(|&v| Complex64::new(v as f64, 0.0)).collect(),
        })
    }
}

impl NumericSliceMut<'_> {
    /// Number of elements (complex pairs count once).
    pub fn elements(&self) -> Result<usize> {
        Ok(match self {
            NumericSliceMut::Real(x) => x.len(),
            NumericSliceMut::Complex(x) => {
                if x.len() % 2 != 0 {
                    return Err(KernelError::ComplexLength(x.len()));
                }
                x.len() / 2
            }
            NumericSliceMut::Integer(x) => x.len(),
        })
    }
}

/// Convert between real, complex and integer buffers.
///
/// Scalar targets (real, integer) receive: `Re` the real part, `Im` the
/// imaginary part (0 for real or integer sources), `Abs` the modulus. Complex
/// targets receive: `Re` the value on the real axis, `Im` the value on the
/// imaginary axis (a complex source keeps only its imaginary part), `Abs` the
/// modulus on the real axis. Integer targets truncate toward zero and
/// saturate; NaN becomes 0.
///
/// # Errors
/// `BufferLength` when element counts differ, `ComplexLength` for odd
/// complex buffers.
pub fn convert(op: ConvertOp, src: NumericSlice<'_>, dst: NumericSliceMut<'_>) -> Result<()> {
    let (n_src, n_dst) = (src.elements()?, dst.elements()?);
    if n_src != n_dst {
        return Err(KernelError::BufferLength {
            expected: n_src,
            actual: n_dst,
        });
    }
    let values = src.read()?;
    let src_is_complex = matches!(src, NumericSlice::Complex(_));

    let scalar = |z: &Complex64| match op {
        ConvertOp::Re => z.re,
        ConvertOp::Im => z.im,
        ConvertOp::Abs => z.norm(),
    };

    match dst {
        NumericSliceMut::Real(out) => {
            for (o, z) in out.iter_mut().zip(&values) {
                *o = scalar(z);
            }
        }
        NumericSliceMut::Integer(out) => {
            for (o, z) in out.iter_mut().zip(&values) {
                *o = scalar(z) as i32;
            }
        }
        NumericSliceMut::Complex(out) => {
            let out = as_complex_mut(out)?;
            for (o, z) in out.iter_mut().zip(&values) {
                *o = match op {
                    ConvertOp::Re => Complex64::new(z.re, 0.0),
                    ConvertOp::Im if src_is_complex => Complex64::new(0.0, z.im),
                    ConvertOp::Im => Complex64::new(0.0, z.re),
                    ConvertOp::Abs => Complex64::new(z.norm(), 0.0),
                };
            }
        }
    }
    Ok(())
}
