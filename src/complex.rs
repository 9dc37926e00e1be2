//! Interleaved complex buffers.
//!
//! At the boundary, complex arrays are flat `f64` buffers holding `(re, im)`
//! pairs. `num_complex::Complex64` is `repr(C)` and `Pod` (through the
//! `bytemuck` feature), so the pairs are reinterpreted in place.

use num_complex::Complex64;

use crate::{KernelError, Result};

/// View an interleaved `(re, im)` buffer as complex numbers.
///
/// # Errors
/// `ComplexLength` if the buffer has an odd number of doubles.
///
/// ```
/// let data = [1.0, 2.0, 3.0, -4.0];
/// let z = strided_numerics::as_complex(&data).unwrap();
/// assert_eq!(z[1].im, -4.0);
/// ```
pub fn as_complex(data: &[f64]) -> Result<&[Complex64]> {
    if data.len() % 2 != 0 {
        return Err(KernelError::ComplexLength(data.len()));
    }
    bytemuck::try_cast_slice(data).map_err(|_| KernelError::ComplexLength(data.len()))
}

/// Mutable variant of [`as_complex`].
pub fn as_complex_mut(data: &mut [f64]) -> Result<&mut [Complex64]> {
    let len = data.len();
    if len % 2 != 0 {
        return Err(KernelError::ComplexLength(len));
    }
    bytemuck::try_cast_slice_mut(data).map_err(|_| KernelError::ComplexLength(len))
}
