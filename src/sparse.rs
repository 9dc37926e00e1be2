//! Sorted-coordinate sparse arrays.
//!
//! A [`SparseArray`] stores its non-zero entries as parallel `values` /
//! `indices` sequences, where an index is the row-major linear position of the
//! entry in the dense array of the same dimensions. Two per-dimension
//! structures are derived from them on every construction:
//!
//! - `coordinates`: for each dimension `d`, the coordinate of every entry along
//!   `d`, stored as one run of `nnz` values starting at `dim_offsets[d]`.
//! - `orderings`: for each dimension `d`, the entry positions sorted by the key
//!   `(coordinate along d, linear index)`, in the same flattened layout.
//!
//! Operations never mutate an array; they return a new one.

use std::collections::BTreeMap;
use std::fmt::Debug;

use num_complex::Complex64;
use num_traits::Zero;

use crate::kernel::for_each_index;
use crate::view::{row_major_strides, SliceSpec, SpliceSpec, StridedViewMut};
use crate::{KernelError, Result};

/// Element types storable in a [`SparseArray`]. Zero is the implicit value.
pub trait SparseElement: Copy + PartialEq + Zero + Debug {}

impl SparseElement for f64 {}
impl SparseElement for i32 {}
impl SparseElement for Complex64 {}

/// Sparse N-dimensional array with sorted linear indices.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseArray<T> {
    values: Vec<T>,
    dims: Vec<usize>,
    strides: Vec<usize>,
    dim_offsets: Vec<usize>,
    indices: Vec<usize>,
    coordinates: Vec<usize>,
    orderings: Vec<usize>,
}

fn checked_len(dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(KernelError::OffsetOverflow)
}

impl<T: SparseElement> SparseArray<T> {
    /// An array of the given dimensions with no stored entries.
    pub fn new(dims: &[usize]) -> Result<Self> {
        checked_len(dims)?;
        Ok(Self::build(dims, Vec::new(), Vec::new()))
    }

    /// Build from `(linear index, value)` pairs; see [`SparseArray::insert`].
    pub fn from_entries(dims: &[usize], linear: &[usize], values: &[T]) -> Result<Self> {
        Self::new(dims)?.insert(values, linear)
    }

    /// Assemble an array from entries already sorted by linear index and free of zeros.
    fn build(dims: &[usize], indices: Vec<usize>, values: Vec<T>) -> Self {
        let rank = dims.len();
        let nnz = indices.len();
        let strides: Vec<usize> = row_major_strides(dims)
            .into_iter()
            .map(|s| s as usize)
            .collect();
        let dim_offsets: Vec<usize> = (0..rank).map(|d| d * nnz).collect();

        let mut coordinates = Vec::with_capacity(rank * nnz);
        for d in 0..rank {
            coordinates.extend(indices.iter().map(|&li| (li / strides[d]) % dims[d]));
        }

        let mut orderings = Vec::with_capacity(rank * nnz);
        for d in 0..rank {
            let run = &coordinates[d * nnz..(d + 1) * nnz];
            let mut order: Vec<usize> = (0..nnz).collect();
            order.sort_by_key(|&k| (run[k], indices[k]));
            orderings.extend(order);
        }

        Self {
            values,
            dims: dims.to_vec(),
            strides,
            dim_offsets,
            indices,
            coordinates,
            orderings,
        }
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Row-major strides used to form linear indices.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Start of each dimension's run in [`coordinates`](Self::coordinates) and
    /// [`orderings`](Self::orderings).
    pub fn dim_offsets(&self) -> &[usize] {
        &self.dim_offsets
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Linear indices, strictly ascending.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn check_dim(&self, dim: usize) -> Result<()> {
        let rank = self.dims.len();
        if dim >= rank {
            return Err(KernelError::InvalidDimension { dim, rank });
        }
        Ok(())
    }

    fn coordinate_run(&self, dim: usize) -> &[usize] {
        let start = self.dim_offsets[dim];
        &self.coordinates[start..start + self.nnz()]
    }

    /// Coordinates of every entry along `dim`, parallel to [`indices`](Self::indices).
    ///
    /// # Errors
    /// `InvalidDimension` when `dim` is not below the rank.
    pub fn coordinates(&self, dim: usize) -> Result<&[usize]> {
        self.check_dim(dim)?;
        Ok(self.coordinate_run(dim))
    }

    /// Entry positions ordered by `(coordinate along dim, linear index)`.
    ///
    /// # Errors
    /// `InvalidDimension` when `dim` is not below the rank.
    pub fn ordering(&self, dim: usize) -> Result<&[usize]> {
        self.check_dim(dim)?;
        let start = self.dim_offsets[dim];
        Ok(&self.orderings[start..start + self.nnz()])
    }

    /// Total number of dense positions.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_linear(&self, linear: usize) -> Result<()> {
        let len = self.len();
        if linear >= len {
            return Err(KernelError::IndexOutOfRange {
                index: linear as isize,
                dim: 0,
                size: len,
            });
        }
        Ok(())
    }

    /// Value at a linear index (zero when not stored).
    pub fn get(&self, linear: usize) -> Result<T> {
        self.check_linear(linear)?;
        Ok(match self.indices.binary_search(&linear) {
            Ok(k) => self.values[k],
            Err(_) => T::zero(),
        })
    }

    /// Value at a multi-index (zero when not stored).
    pub fn get_at(&self, coords: &[usize]) -> Result<T> {
        if coords.len() != self.dims.len() {
            return Err(KernelError::RankMismatch(coords.len(), self.dims.len()));
        }
        let mut linear = 0;
        for (dim, ((&c, &size), &stride)) in coords
            .iter()
            .zip(&self.dims)
            .zip(&self.strides)
            .enumerate()
        {
            if c >= size {
                return Err(KernelError::IndexOutOfRange {
                    index: c as isize,
                    dim,
                    size,
                });
            }
            linear += c * stride;
        }
        self.get(linear)
    }

    /// Insert entries, returning the merged array.
    ///
    /// The result holds the sorted union of old and new indices. A new value
    /// replaces an existing one at the same index, and within the batch a later
    /// pair wins over an earlier one. Inserting zero removes the entry; zeros
    /// are never stored.
    ///
    /// # Errors
    /// `BufferLength` when the two sequences differ in length,
    /// `IndexOutOfRange` for a linear index outside the array.
    pub fn insert(&self, new_values: &[T], new_linear: &[usize]) -> Result<Self> {
        if new_values.len() != new_linear.len() {
            return Err(KernelError::BufferLength {
                expected: new_linear.len(),
                actual: new_values.len(),
            });
        }
        for &li in new_linear {
            self.check_linear(li)?;
        }

        let mut merged: BTreeMap<usize, T> = self
            .indices
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect();
        for (&li, &v) in new_linear.iter().zip(new_values) {
            if v.is_zero() {
                merged.remove(&li);
            } else {
                merged.insert(li, v);
            }
        }

        let (indices, values): (Vec<usize>, Vec<T>) = merged.into_iter().unzip();
        log::trace!(
            "sparse insert: {} + {} -> {} entries",
            self.nnz(),
            new_linear.len(),
            indices.len()
        );
        Ok(Self::build(&self.dims, indices, values))
    }

    /// Restrict to a `(start, step, count)` selection per dimension.
    ///
    /// Entries outside the selection are dropped; survivors are renumbered in
    /// the selection's index space. Negative steps reverse a dimension.
    pub fn slice(&self, spec: &SliceSpec) -> Result<Self> {
        self.splice(&spec.to_splice(&self.dims)?)
    }

    /// Remap entries along an explicit per-dimension coordinate mapping.
    ///
    /// An entry whose coordinate is mapped to several destination coordinates
    /// is replicated; unmapped entries are dropped.
    pub fn splice(&self, spec: &SpliceSpec) -> Result<Self> {
        let tables = spec.lookup(&self.dims)?;
        let dst_dims = spec.dst_dims();
        checked_len(dst_dims)?;
        let dst_strides: Vec<usize> = row_major_strides(dst_dims)
            .into_iter()
            .map(|s| s as usize)
            .collect();
        let rank = self.dims.len();

        let mut entries: Vec<(usize, T)> = Vec::new();
        for k in 0..self.nnz() {
            let targets: Vec<&[usize]> = (0..rank)
                .map(|d| tables[d][self.coordinate_run(d)[k]].as_slice())
                .collect();
            let counts: Vec<usize> = targets.iter().map(|t| t.len()).collect();
            let value = self.values[k];
            for_each_index(&counts, |choice| {
                let linear = choice
                    .iter()
                    .enumerate()
                    .map(|(d, &c)| targets[d][c] * dst_strides[d])
                    .sum();
                entries.push((linear, value));
                Ok(())
            })?;
        }
        // Each destination coordinate has a single source, so indices are unique.
        entries.sort_unstable_by_key(|&(li, _)| li);
        let (indices, values) = entries.into_iter().unzip();
        Ok(Self::build(dst_dims, indices, values))
    }

    /// Write the dense form into `dst`, which must have the same dimensions.
    pub fn to_dense(&self, dst: &mut StridedViewMut<T>) -> Result<()> {
        if dst.dims() != self.dims.as_slice() {
            return Err(KernelError::ShapeMismatch(
                self.dims.clone(),
                dst.dims().to_vec(),
            ));
        }
        dst.fill(T::zero());
        let rank = self.dims.len();
        let mut coords = vec![0usize; rank];
        for (k, &v) in self.values.iter().enumerate() {
            for (d, c) in coords.iter_mut().enumerate() {
                *c = self.coordinate_run(d)[k];
            }
            let pos = dst.position_unchecked(&coords);
            dst.data_mut()[pos] = v;
        }
        Ok(())
    }
}
