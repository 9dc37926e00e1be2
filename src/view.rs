//! Strided views over flat storage.
//!
//! This module provides `StridedView` and `StridedViewMut`, which interpret a
//! flat slice as an N-dimensional array through `(dims, strides, offset)`.
//!
//! Key features:
//! - Zero-copy views over caller-owned storage
//! - Dynamic rank (dimension metadata arrives as plain integer sequences)
//! - Negative strides for reversed views
//! - Lazy transformations (permute, transpose, slice)
//!
//! The element at multi-index `(i0, .., ik)` lives at
//! `offset + i0 * strides[0] + .. + ik * strides[k]`. Construction checks that
//! every reachable position lies inside the storage, so element access through
//! a view never reads out of bounds.

use crate::{KernelError, Result};

/// An immutable strided view over a flat buffer.
///
/// # Example
/// ```
/// use strided_numerics::StridedView;
///
/// let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
/// let view = StridedView::new(&data, &[2, 3], &[3, 1], 0).unwrap();
/// assert_eq!(view.get(&[1, 2]).unwrap(), 6.0);
///
/// // Transpose is zero-copy
/// let t = view.transpose().unwrap();
/// assert_eq!(t.dims(), &[3, 2]);
/// assert_eq!(t.get(&[2, 1]).unwrap(), 6.0);
/// ```
#[derive(Debug, Clone)]
pub struct StridedView<'a, T> {
    data: &'a [T],
    dims: Vec<usize>,
    strides: Vec<isize>,
    offset: usize,
}

/// A mutable strided view over a flat buffer.
///
/// Same as `StridedView` but allows mutation.
#[derive(Debug)]
pub struct StridedViewMut<'a, T> {
    data: &'a mut [T],
    dims: Vec<usize>,
    strides: Vec<isize>,
    offset: usize,
}

/// Row-major ("last dimension fastest") strides for the given dimensions.
///
/// ```
/// assert_eq!(strided_numerics::row_major_strides(&[2, 3, 4]), vec![12, 4, 1]);
/// ```
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let mut strides = vec![0isize; dims.len()];
    let mut acc = 1isize;
    for (stride, &dim) in strides.iter_mut().zip(dims.iter()).rev() {
        *stride = acc;
        acc = acc.saturating_mul(dim.max(1) as isize);
    }
    strides
}

impl<'a, T> StridedView<'a, T> {
    /// Create a new strided view.
    ///
    /// # Arguments
    /// - `data`: The underlying flat storage
    /// - `dims`: Size of each dimension
    /// - `strides`: Stride for each dimension (in elements, can be negative)
    /// - `offset`: Position of the element at multi-index zero
    ///
    /// # Errors
    /// Returns an error if the view would access out-of-bounds memory, if the
    /// stride count differs from the dimension count, or if a dimension longer
    /// than one has stride zero.
    pub fn new(data: &'a [T], dims: &[usize], strides: &[isize], offset: usize) -> Result<Self> {
        validate_layout(data.len(), dims, strides, offset)?;
        Ok(Self {
            data,
            dims: dims.to_vec(),
            strides: strides.to_vec(),
            offset,
        })
    }

    /// Create a row-major view covering `data` from position zero.
    pub fn contiguous(data: &'a [T], dims: &[usize]) -> Result<Self> {
        Self::new(data, dims, &row_major_strides(dims), 0)
    }

    /// Returns the size of each dimension.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the stride for each dimension.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Returns the starting offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns true if the view holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.contains(&0)
    }

    /// Returns a reference to the underlying storage.
    #[inline]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// Check if the view is contiguous in memory (row-major order).
    pub fn is_contiguous(&self) -> bool {
        is_row_major(&self.dims, &self.strides)
    }

    /// Compute the storage position for a multi-index.
    ///
    /// # Errors
    /// Returns an error if the index has the wrong rank or is out of range.
    pub fn position(&self, index: &[usize]) -> Result<usize> {
        position(&self.dims, &self.strides, self.offset, index)
    }

    /// Storage position without checks. Callers guarantee `index` is in range.
    #[inline]
    pub(crate) fn position_unchecked(&self, index: &[usize]) -> usize {
        let mut pos = self.offset as isize;
        for (&i, &s) in index.iter().zip(self.strides.iter()) {
            pos += i as isize * s;
        }
        pos as usize
    }

    /// Element at storage position `offset + delta`.
    ///
    /// `delta` comes from the kernel odometer, which only produces reachable offsets.
    #[inline]
    pub(crate) fn at(&self, delta: isize) -> &T {
        &self.data[(self.offset as isize + delta) as usize]
    }

    /// Select a sub-view with one `(start, step, count)` triple per dimension.
    ///
    /// The result aliases the same storage. A step of 0 repeats one coordinate.
    pub fn slice(&self, spec: &SliceSpec) -> Result<StridedView<'a, T>> {
        let (dims, strides, offset) =
            slice_layout(&self.dims, &self.strides, self.offset, spec, true)?;
        Ok(StridedView {
            data: self.data,
            dims,
            strides,
            offset,
        })
    }

    /// Permute dimensions according to the given permutation.
    ///
    /// # Errors
    /// Returns an error if `perm` is not a permutation of `0..ndim`.
    pub fn permute(&self, perm: &[usize]) -> Result<StridedView<'a, T>> {
        let (dims, strides) = permute_layout(&self.dims, &self.strides, perm)?;
        Ok(StridedView {
            data: self.data,
            dims,
            strides,
            offset: self.offset,
        })
    }

    /// Transpose a 2D view (swap dimensions).
    pub fn transpose(&self) -> Result<StridedView<'a, T>> {
        if self.ndim() != 2 {
            return Err(KernelError::RankMismatch(self.ndim(), 2));
        }
        self.permute(&[1, 0])
    }
}

impl<'a, T: Copy> StridedView<'a, T> {
    /// Get the element at the given multi-index.
    pub fn get(&self, index: &[usize]) -> Result<T> {
        Ok(self.data[self.position(index)?])
    }

    /// Collect the elements in row-major iteration order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        let strides = [&self.strides[..]];
        crate::kernel::for_each_run(&self.dims, &strides, |offsets, len, inner| {
            let mut off = offsets[0];
            for _ in 0..len {
                out.push(*self.at(off));
                off += inner[0];
            }
        });
        out
    }
}

// Mutable view implementation
impl<'a, T> StridedViewMut<'a, T> {
    /// Create a new mutable strided view.
    pub fn new(
        data: &'a mut [T],
        dims: &[usize],
        strides: &[isize],
        offset: usize,
    ) -> Result<Self> {
        validate_layout(data.len(), dims, strides, offset)?;
        Ok(Self {
            data,
            dims: dims.to_vec(),
            strides: strides.to_vec(),
            offset,
        })
    }

    /// Create a row-major view covering `data` from position zero.
    pub fn contiguous(data: &'a mut [T], dims: &[usize]) -> Result<Self> {
        let strides = row_major_strides(dims);
        Self::new(data, dims, &strides, 0)
    }

    /// Returns the size of each dimension.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the stride for each dimension.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Returns the starting offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns true if the view holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.contains(&0)
    }

    /// Check if the view is contiguous in memory (row-major order).
    pub fn is_contiguous(&self) -> bool {
        is_row_major(&self.dims, &self.strides)
    }

    /// Returns a mutable reference to the underlying storage.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    /// Compute the storage position for a multi-index.
    pub fn position(&self, index: &[usize]) -> Result<usize> {
        position(&self.dims, &self.strides, self.offset, index)
    }

    #[inline]
    pub(crate) fn position_unchecked(&self, index: &[usize]) -> usize {
        let mut pos = self.offset as isize;
        for (&i, &s) in index.iter().zip(self.strides.iter()) {
            pos += i as isize * s;
        }
        pos as usize
    }

    #[inline]
    pub(crate) fn at(&self, delta: isize) -> &T {
        &self.data[(self.offset as isize + delta) as usize]
    }

    #[inline]
    pub(crate) fn at_mut(&mut self, delta: isize) -> &mut T {
        &mut self.data[(self.offset as isize + delta) as usize]
    }

    /// Borrow as an immutable view with the same layout.
    pub fn reborrow(&self) -> StridedView<'_, T> {
        StridedView {
            data: &*self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }

    /// Borrow as a shorter-lived mutable view with the same layout.
    pub fn reborrow_mut(&mut self) -> StridedViewMut<'_, T> {
        StridedViewMut {
            data: &mut *self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }

    /// Mutable sub-view selected by a slice specification.
    pub fn slice_mut(&mut self, spec: &SliceSpec) -> Result<StridedViewMut<'_, T>> {
        let (dims, strides, offset) =
            slice_layout(&self.dims, &self.strides, self.offset, spec, false)?;
        Ok(StridedViewMut {
            data: &mut *self.data,
            dims,
            strides,
            offset,
        })
    }

    /// Permute dimensions of a mutable view.
    pub fn permute(self, perm: &[usize]) -> Result<StridedViewMut<'a, T>> {
        let (dims, strides) = permute_layout(&self.dims, &self.strides, perm)?;
        Ok(StridedViewMut {
            data: self.data,
            dims,
            strides,
            offset: self.offset,
        })
    }
}

impl<'a, T: Copy> StridedViewMut<'a, T> {
    /// Get the element at the given multi-index.
    pub fn get(&self, index: &[usize]) -> Result<T> {
        Ok(self.data[self.position(index)?])
    }

    /// Set the element at the given multi-index.
    pub fn set(&mut self, index: &[usize], value: T) -> Result<()> {
        let pos = self.position(index)?;
        self.data[pos] = value;
        Ok(())
    }

    /// Write `value` to every element of the view.
    pub fn fill(&mut self, value: T) {
        let dims = self.dims.clone();
        let strides = [self.strides.clone()];
        let strides_list = [&strides[0][..]];
        crate::kernel::for_each_run(&dims, &strides_list, |offsets, len, inner| {
            let mut off = offsets[0];
            for _ in 0..len {
                *self.at_mut(off) = value;
                off += inner[0];
            }
        });
    }

    /// Collect the elements in row-major iteration order.
    pub fn to_vec(&self) -> Vec<T> {
        self.reborrow().to_vec()
    }
}

// ============================================================================
// Slice specifications
// ============================================================================

/// One `(start, step, count)` selection along a single dimension.
///
/// Selects source coordinates `start, start + step, .., start + (count - 1) * step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    pub start: usize,
    pub step: isize,
    pub count: usize,
}

impl SliceRange {
    pub fn new(start: usize, step: isize, count: usize) -> Self {
        Self { start, step, count }
    }

    /// The whole dimension in order.
    pub fn full(size: usize) -> Self {
        Self::new(0, 1, size)
    }

    /// A single coordinate, keeping the dimension with size 1.
    pub fn index(i: usize) -> Self {
        Self::new(i, 1, 1)
    }

    /// Source coordinate of the `i`-th selected element.
    #[inline]
    pub(crate) fn source(&self, i: usize) -> usize {
        (self.start as isize + i as isize * self.step) as usize
    }

    fn validate(&self, dim: usize, size: usize) -> Result<()> {
        if self.count == 0 {
            return Ok(());
        }
        let last = (self.count as isize - 1)
            .checked_mul(self.step)
            .and_then(|d| d.checked_add(self.start as isize))
            .ok_or(KernelError::OffsetOverflow)?;
        for index in [self.start as isize, last] {
            if index < 0 || index >= size as isize {
                return Err(KernelError::IndexOutOfRange { index, dim, size });
            }
        }
        Ok(())
    }
}

/// Per-dimension `(start, step, count)` selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceSpec {
    ranges: Vec<SliceRange>,
}

impl SliceSpec {
    pub fn new(ranges: Vec<SliceRange>) -> Self {
        Self { ranges }
    }

    /// Build from `(start, step, count)` triples.
    pub fn from_triples(triples: &[(usize, isize, usize)]) -> Self {
        Self::new(
            triples
                .iter()
                .map(|&(start, step, count)| SliceRange::new(start, step, count))
                .collect(),
        )
    }

    /// Identity selection for the given dimensions.
    pub fn full(dims: &[usize]) -> Self {
        Self::new(dims.iter().map(|&d| SliceRange::full(d)).collect())
    }

    pub fn ranges(&self) -> &[SliceRange] {
        &self.ranges
    }

    /// Dimensions of the selected region.
    pub fn counts(&self) -> Vec<usize> {
        self.ranges.iter().map(|r| r.count).collect()
    }

    /// Check the specification against source dimensions.
    pub fn validate(&self, dims: &[usize]) -> Result<()> {
        if self.ranges.len() != dims.len() {
            return Err(KernelError::RankMismatch(self.ranges.len(), dims.len()));
        }
        for (dim, (range, &size)) in self.ranges.iter().zip(dims.iter()).enumerate() {
            range.validate(dim, size)?;
        }
        Ok(())
    }

    /// Lower to an explicit coordinate mapping.
    pub fn to_splice(&self, src_dims: &[usize]) -> Result<SpliceSpec> {
        self.validate(src_dims)?;
        let mut splice = SpliceSpec::new(&self.counts());
        for (dim, range) in self.ranges.iter().enumerate() {
            for i in 0..range.count {
                splice.push(dim, range.source(i), i)?;
            }
        }
        Ok(splice)
    }
}

/// Explicit per-dimension mapping from source coordinates to destination coordinates.
///
/// A source coordinate may feed several destination coordinates; each
/// destination coordinate is fed by at most one source coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceSpec {
    dst_dims: Vec<usize>,
    pairs: Vec<Vec<(usize, usize)>>,
}

impl SpliceSpec {
    /// Empty mapping into a destination of the given dimensions.
    pub fn new(dst_dims: &[usize]) -> Self {
        Self {
            dst_dims: dst_dims.to_vec(),
            pairs: vec![Vec::new(); dst_dims.len()],
        }
    }

    /// Build from `(src, dst, dim)` triples.
    pub fn from_triples(dst_dims: &[usize], triples: &[(usize, usize, usize)]) -> Result<Self> {
        let mut spec = Self::new(dst_dims);
        for &(src, dst, dim) in triples {
            spec.push(dim, src, dst)?;
        }
        Ok(spec)
    }

    /// Map source coordinate `src` to destination coordinate `dst` along `dim`.
    pub fn push(&mut self, dim: usize, src: usize, dst: usize) -> Result<()> {
        let rank = self.dst_dims.len();
        let size = *self
            .dst_dims
            .get(dim)
            .ok_or(KernelError::InvalidDimension { dim, rank })?;
        if dst >= size {
            return Err(KernelError::IndexOutOfRange {
                index: dst as isize,
                dim,
                size,
            });
        }
        self.pairs[dim].push((src, dst));
        Ok(())
    }

    pub fn dst_dims(&self) -> &[usize] {
        &self.dst_dims
    }

    /// The `(src, dst)` pairs along `dim`.
    pub fn pairs(&self, dim: usize) -> &[(usize, usize)] {
        &self.pairs[dim]
    }

    /// Check the mapping against source dimensions.
    ///
    /// Every source coordinate must exist and no destination coordinate may be
    /// claimed twice along a dimension.
    pub fn validate(&self, src_dims: &[usize]) -> Result<()> {
        self.lookup(src_dims).map(|_| ())
    }

    /// Check against source dimensions and build, per dimension, the list of
    /// destination coordinates fed by each source coordinate.
    pub(crate) fn lookup(&self, src_dims: &[usize]) -> Result<Vec<Vec<Vec<usize>>>> {
        if src_dims.len() != self.dst_dims.len() {
            return Err(KernelError::RankMismatch(src_dims.len(), self.dst_dims.len()));
        }
        let mut tables = Vec::with_capacity(src_dims.len());
        for (dim, (&src_size, &dst_size)) in src_dims.iter().zip(self.dst_dims.iter()).enumerate() {
            let mut table = vec![Vec::new(); src_size];
            let mut claimed = vec![false; dst_size];
            for &(src, dst) in &self.pairs[dim] {
                if src >= src_size {
                    return Err(KernelError::IndexOutOfRange {
                        index: src as isize,
                        dim,
                        size: src_size,
                    });
                }
                if std::mem::replace(&mut claimed[dst], true) {
                    return Err(KernelError::IndexOutOfRange {
                        index: dst as isize,
                        dim,
                        size: dst_size,
                    });
                }
                table[src].push(dst);
            }
            for targets in &mut table {
                targets.sort_unstable();
            }
            tables.push(table);
        }
        Ok(tables)
    }
}

// ============================================================================
// Layout helpers
// ============================================================================

pub(crate) fn validate_layout(
    data_len: usize,
    dims: &[usize],
    strides: &[isize],
    offset: usize,
) -> Result<()> {
    if dims.len() != strides.len() {
        return Err(KernelError::StrideLengthMismatch);
    }
    if dims.contains(&0) {
        // Empty array, no bounds to check
        return Ok(());
    }

    // Calculate min and max possible offsets
    let mut min_offset = offset as isize;
    let mut max_offset = offset as isize;

    for (dim, (&size, &stride)) in dims.iter().zip(strides.iter()).enumerate() {
        if size > 1 && stride == 0 {
            return Err(KernelError::ZeroStride { dim });
        }
        let reach = stride
            .checked_mul((size - 1) as isize)
            .ok_or(KernelError::OffsetOverflow)?;
        if reach >= 0 {
            max_offset = max_offset
                .checked_add(reach)
                .ok_or(KernelError::OffsetOverflow)?;
        } else {
            min_offset = min_offset
                .checked_add(reach)
                .ok_or(KernelError::OffsetOverflow)?;
        }
    }

    if min_offset < 0 {
        return Err(KernelError::OutOfBounds {
            offset: min_offset,
            len: data_len,
        });
    }
    if max_offset as usize >= data_len {
        return Err(KernelError::OutOfBounds {
            offset: max_offset,
            len: data_len,
        });
    }
    Ok(())
}

pub(crate) fn is_row_major(dims: &[usize], strides: &[isize]) -> bool {
    let mut expected = 1isize;
    for (&dim, &stride) in dims.iter().zip(strides.iter()).rev() {
        if dim <= 1 {
            continue;
        }
        if stride != expected {
            return false;
        }
        expected *= dim as isize;
    }
    true
}

fn position(dims: &[usize], strides: &[isize], offset: usize, index: &[usize]) -> Result<usize> {
    if index.len() != dims.len() {
        return Err(KernelError::RankMismatch(index.len(), dims.len()));
    }
    let mut pos = offset as isize;
    for (dim, ((&i, &size), &stride)) in index.iter().zip(dims).zip(strides).enumerate() {
        if i >= size {
            return Err(KernelError::IndexOutOfRange {
                index: i as isize,
                dim,
                size,
            });
        }
        pos += i as isize * stride;
    }
    Ok(pos as usize)
}

fn slice_layout(
    dims: &[usize],
    strides: &[isize],
    offset: usize,
    spec: &SliceSpec,
    allow_repeat: bool,
) -> Result<(Vec<usize>, Vec<isize>, usize)> {
    spec.validate(dims)?;
    let mut new_offset = offset as isize;
    let mut new_strides = Vec::with_capacity(dims.len());
    for (dim, (range, &stride)) in spec.ranges().iter().zip(strides.iter()).enumerate() {
        if range.count > 0 {
            new_offset += range.start as isize * stride;
        }
        let s = stride * range.step;
        // Step 0 repeats one source coordinate. Readable, but a mutable view
        // would alias its own elements.
        if s == 0 && range.count > 1 && !allow_repeat {
            return Err(KernelError::ZeroStride { dim });
        }
        new_strides.push(s);
    }
    Ok((spec.counts(), new_strides, new_offset as usize))
}

fn permute_layout(
    dims: &[usize],
    strides: &[isize],
    perm: &[usize],
) -> Result<(Vec<usize>, Vec<isize>)> {
    if perm.len() != dims.len() {
        return Err(KernelError::RankMismatch(perm.len(), dims.len()));
    }
    let mut seen = vec![false; dims.len()];
    for &p in perm {
        if p >= dims.len() {
            return Err(KernelError::InvalidDimension {
                dim: p,
                rank: dims.len(),
            });
        }
        if std::mem::replace(&mut seen[p], true) {
            return Err(KernelError::DuplicateDimension(p));
        }
    }
    Ok((
        perm.iter().map(|&p| dims[p]).collect(),
        perm.iter().map(|&p| strides[p]).collect(),
    ))
}
