//! Strided numeric kernels for dense and sparse N-dimensional arrays.
//!
//! Every operation in this crate reads its inputs through explicit strides and
//! writes its outputs through explicit strides. Nothing is cached between
//! calls: a caller builds [`StridedView`]s over buffers it owns and invokes a
//! single operation.
//!
//! # Core Types
//!
//! - [`StridedView`] / [`StridedViewMut`]: zero-copy views `(storage, dims, strides, offset)`
//! - [`SliceSpec`] / [`SpliceSpec`] / [`MapBound`]: coordinate selections
//! - [`SparseArray`]: sorted-coordinate sparse storage
//! - Opcode enums in [`opcode`] with fixed wire values
//!
//! # Engines
//!
//! ## Mapping
//!
//! - [`map`]: lockstep copy with per-dimension offsets and modular wrap-around
//! - [`slice`], [`splice`], [`copy_into`]
//!
//! ## Element-wise
//!
//! - [`ru_op`], [`cu_op`], [`iu_op`]: in-place unary updates with a scalar operand
//! - [`e_op`], [`e_op_int`]: binary element-wise ops, real or interleaved complex
//! - [`ra_op`], [`ca_op`]: whole-buffer fold and prefix scan
//! - [`convert`]: real / complex / integer conversion
//!
//! ## Dimensions
//!
//! - [`rr_op`]: reduce along dimensions, keeping them as size 1
//! - [`ri_op`]: index of extrema (and zero tests, argsort) along a dimension
//! - [`rd_op`]: cumulative accumulation along dimensions
//!
//! ## Linear algebra
//!
//! - [`linalg::mul`], [`linalg::diag`], [`linalg::svd`], [`linalg::eigs`], [`linalg::invert`]
//!
//! ## Images
//!
//! - [`create_integral_image`], [`create_integral_histogram`]
//!
//! # Example
//!
//! ```rust
//! use strided_numerics::{rr_op, opcode::ReduceOp, StridedView, StridedViewMut};
//!
//! let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let src = StridedView::new(&data, &[2, 3], &[3, 1], 0).unwrap();
//!
//! let mut out = vec![0.0; 3];
//! let mut dst = StridedViewMut::new(&mut out, &[1, 3], &[3, 1], 0).unwrap();
//! rr_op(ReduceOp::Sum, &src, &mut dst, &[0]).unwrap();
//!
//! assert_eq!(out, vec![5.0, 7.0, 9.0]);
//! ```

mod complex;
mod dimension;
mod eigen;
mod element;
mod fuse;
mod image;
mod index;
mod jacobi;
mod kernel;
pub mod linalg;
mod map;
pub mod opcode;
mod order;
pub mod seed;
mod sparse;
pub mod view;

// ============================================================================
// Views
// ============================================================================
pub use view::{row_major_strides, SliceRange, SliceSpec, SpliceSpec, StridedView, StridedViewMut};

// ============================================================================
// Mapping
// ============================================================================
pub use map::{copy_into, map, slice, splice, MapBound};

// ============================================================================
// Element-wise operations
// ============================================================================
pub use complex::{as_complex, as_complex_mut};
pub use element::{
    ca_op, convert, cu_op, e_op, e_op_int, iu_op, ra_op, ru_op, NumericSlice, NumericSliceMut,
};

// ============================================================================
// Dimension operations
// ============================================================================
pub use dimension::{rd_op, ri_op, rr_op};

// ============================================================================
// Search
// ============================================================================
pub use index::{find, find_where, Predicate};

// ============================================================================
// Sparse arrays
// ============================================================================
pub use sparse::{SparseArray, SparseElement};

// ============================================================================
// Images
// ============================================================================
pub use image::{create_integral_histogram, create_integral_image};

// ============================================================================
// Seed control
// ============================================================================
pub use seed::{derandomize, randomize};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of full sweeps for the Jacobi SVD and symmetric eigensolver.
///
/// Jacobi methods converge quadratically; well-conditioned inputs need well
/// under 15 sweeps.
pub const JACOBI_MAX_SWEEPS: usize = 60;

/// Iteration budget per eigenvalue for the Hessenberg QR eigensolver.
pub const QR_MAX_ITERATIONS_PER_EIGENVALUE: usize = 60;

/// Relative tolerance under which a matrix is treated as symmetric by [`linalg::eigs`].
pub const SYMMETRY_TOLERANCE: f64 = 1e-12;

// ============================================================================
// Error types
// ============================================================================

/// Broad category of a [`KernelError`].
///
/// Lets callers branch on "bad call" versus "bad math" without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Dimension counts, sizes, strides or buffer lengths are incompatible.
    Shape,
    /// Unknown opcode, or an opcode that does not apply to the requested mode.
    Opcode,
    /// The computation itself failed (singular matrix, no convergence).
    Numerical,
    /// A coordinate, slice or linear index is out of range.
    Index,
}

/// Errors that can occur during kernel operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    /// Array ranks do not match.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// Array shapes are incompatible for the operation.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Invalid dimension index for the given array rank.
    #[error("invalid dimension {dim} for rank {rank}")]
    InvalidDimension { dim: usize, rank: usize },

    /// The same dimension was listed twice.
    #[error("duplicate operating dimension {0}")]
    DuplicateDimension(usize),

    /// Zero stride is not allowed for a dimension longer than one.
    #[error("invalid stride 0 for dim {dim}")]
    ZeroStride { dim: usize },

    /// Stride array length doesn't match dimensions.
    #[error("stride and dims length mismatch")]
    StrideLengthMismatch,

    /// A buffer does not hold the number of elements the operation requires.
    #[error("buffer length mismatch: expected {expected}, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    /// An interleaved complex buffer has an odd number of doubles.
    #[error("complex buffer must have even length, got {0}")]
    ComplexLength(usize),

    /// Matrix is not square when a square matrix was required.
    #[error("non-square matrix: rows={rows}, cols={cols}")]
    NonSquare { rows: usize, cols: usize },

    /// Integer overflow while computing an offset.
    #[error("offset overflow while computing index")]
    OffsetOverflow,

    /// Unrecognized opcode value.
    #[error("invalid {family} opcode {code}")]
    InvalidOpcode { family: &'static str, code: i32 },

    /// A known opcode that this entry point cannot apply.
    #[error("{family} opcode {op} is not supported here")]
    UnsupportedOpcode { family: &'static str, op: &'static str },

    /// Matrix is singular within numerical tolerance.
    #[error("matrix is singular (pivot {pivot:e} at column {column})")]
    Singular { column: usize, pivot: f64 },

    /// An iterative algorithm did not converge.
    #[error("{algorithm} did not converge after {iterations} iterations")]
    NoConvergence {
        algorithm: &'static str,
        iterations: usize,
    },

    /// Integer division by zero.
    #[error("integer division by zero at element {0}")]
    DivisionByZero(usize),

    /// A coordinate or slice reaches outside a dimension.
    #[error("index {index} out of range for dimension {dim} of size {size}")]
    IndexOutOfRange { index: isize, dim: usize, size: usize },

    /// A line selector must leave exactly one dimension free.
    #[error("expected exactly one free dimension (-1), found {0}")]
    FreeDimension(usize),

    /// A view would reach outside its storage.
    #[error("view reaches offset {offset} outside storage of length {len}")]
    OutOfBounds { offset: isize, len: usize },
}

impl KernelError {
    /// Returns the broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::RankMismatch(..)
            | KernelError::ShapeMismatch(..)
            | KernelError::InvalidDimension { .. }
            | KernelError::DuplicateDimension(_)
            | KernelError::ZeroStride { .. }
            | KernelError::StrideLengthMismatch
            | KernelError::BufferLength { .. }
            | KernelError::ComplexLength(_)
            | KernelError::NonSquare { .. }
            | KernelError::OffsetOverflow => ErrorKind::Shape,
            KernelError::InvalidOpcode { .. } | KernelError::UnsupportedOpcode { .. } => {
                ErrorKind::Opcode
            }
            KernelError::Singular { .. }
            | KernelError::NoConvergence { .. }
            | KernelError::DivisionByZero(_) => ErrorKind::Numerical,
            KernelError::IndexOutOfRange { .. }
            | KernelError::FreeDimension(_)
            | KernelError::OutOfBounds { .. } => ErrorKind::Index,
        }
    }
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
