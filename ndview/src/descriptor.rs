/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::ops::Range;

use serde::Deserialize;
use serde::Serialize;

use crate::config;
use crate::geometry::ViewError;
use crate::geometry::check_geometry;
use crate::geometry::reachable_extent;
use crate::memory::MemoryBlock;
use crate::resolve::Indirection;
use crate::resolve::resolve;

/// Memory layout order used to derive strides for contiguous views.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Order {
    /// Row-major layout (C-style): last index varies fastest.
    RowMajor,

    /// Column-major layout (Fortran-style): first index varies
    /// fastest.
    ColumnMajor,
}

/// Computes the byte strides of a contiguous array of `shape` with
/// elements of `item_size` bytes, laid out in `order`.
///
/// This is the layout a consumer assumes when a producer supplies no
/// strides.
///
/// ```
/// use ndview::Order;
/// use ndview::contiguous_strides;
///
/// assert_eq!(contiguous_strides(&[2, 3, 4], 8, Order::RowMajor).unwrap(), vec![96, 32, 8]);
/// assert_eq!(contiguous_strides(&[2, 3, 4], 8, Order::ColumnMajor).unwrap(), vec![8, 16, 48]);
/// ```
pub fn contiguous_strides(
    shape: &[usize],
    item_size: usize,
    order: Order,
) -> Result<Vec<isize>, ViewError> {
    let mut strides = vec![0isize; shape.len()];
    let mut step = isize::try_from(item_size).map_err(|_| ViewError::Overflow)?;
    let mut assign = |dim: usize| -> Result<(), ViewError> {
        strides[dim] = step;
        // An empty dimension makes every later stride irrelevant;
        // keep it as if the extent were 1.
        let size = isize::try_from(shape[dim].max(1)).map_err(|_| ViewError::Overflow)?;
        step = step.checked_mul(size).ok_or(ViewError::Overflow)?;
        Ok(())
    };
    match order {
        Order::RowMajor => (0..shape.len()).rev().try_for_each(&mut assign)?,
        Order::ColumnMajor => (0..shape.len()).try_for_each(&mut assign)?,
    }
    Ok(strides)
}

/// Describes how a flat memory block is interpreted as an
/// N-dimensional array of fixed-size items.
///
/// The item at index `(i₀, …, iₙ₋₁)` starts at
/// `offset + ∑ⱼ strides[j] × iⱼ`, measured in bytes from the start of
/// the block, unless some dimension carries a non-negative suboffset,
/// in which case the address computed so far holds a pointer that
/// must be followed (see [`crate::resolve()`]).
///
/// A descriptor is a plain value. Construction only checks that its
/// parts agree with each other; whether it fits a particular block is
/// decided by [`ViewDescriptor::check_within`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawViewDescriptor")]
pub struct ViewDescriptor {
    item_size: usize,
    shape: Vec<usize>,
    strides: Vec<isize>,
    suboffsets: Option<Vec<isize>>,
    offset: isize,
}

/// Wire form of [`ViewDescriptor`]. Deserialization goes through
/// [`ViewDescriptor::new`] so that decoded descriptors obey the same
/// length agreement and dimension limit as constructed ones.
#[derive(Deserialize)]
struct RawViewDescriptor {
    item_size: usize,
    shape: Vec<usize>,
    strides: Vec<isize>,
    #[serde(default)]
    suboffsets: Option<Vec<isize>>,
    offset: isize,
}

impl TryFrom<RawViewDescriptor> for ViewDescriptor {
    type Error = ViewError;

    fn try_from(raw: RawViewDescriptor) -> Result<Self, Self::Error> {
        let descriptor = Self::new(raw.item_size, raw.shape, raw.strides, raw.offset)?;
        match raw.suboffsets {
            Some(suboffsets) => descriptor.with_suboffsets(suboffsets),
            None => Ok(descriptor),
        }
    }
}

impl ViewDescriptor {
    /// A strided view. `shape` and `strides` must have the same
    /// length, no greater than the configured dimension limit.
    pub fn new(
        item_size: usize,
        shape: Vec<usize>,
        strides: Vec<isize>,
        offset: isize,
    ) -> Result<Self, ViewError> {
        if shape.len() != strides.len() {
            return Err(ViewError::InvalidDims {
                expected: shape.len(),
                got: strides.len(),
            });
        }
        let max = config::global::get().max_ndim;
        if shape.len() > max {
            return Err(ViewError::TooManyDims {
                ndim: shape.len(),
                max,
            });
        }
        Ok(Self {
            item_size,
            shape,
            strides,
            suboffsets: None,
            offset,
        })
    }

    /// A zero-dimensional view of the single item at `offset`.
    pub fn scalar(item_size: usize, offset: isize) -> Self {
        Self {
            item_size,
            shape: Vec::new(),
            strides: Vec::new(),
            suboffsets: None,
            offset,
        }
    }

    /// A contiguous view starting at the beginning of the block.
    pub fn contiguous(item_size: usize, shape: Vec<usize>, order: Order) -> Result<Self, ViewError> {
        let strides = contiguous_strides(&shape, item_size, order)?;
        Self::new(item_size, shape, strides, 0)
    }

    /// Attaches per-dimension suboffsets. A non-negative entry marks a
    /// dimension that is reached through a pointer.
    pub fn with_suboffsets(mut self, suboffsets: Vec<isize>) -> Result<Self, ViewError> {
        if suboffsets.len() != self.ndim() {
            return Err(ViewError::InvalidDims {
                expected: self.ndim(),
                got: suboffsets.len(),
            });
        }
        self.suboffsets = Some(suboffsets);
        Ok(self)
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn suboffsets(&self) -> Option<&[isize]> {
        self.suboffsets.as_deref()
    }

    pub fn offset(&self) -> isize {
        self.offset
    }

    /// Whether any dimension is reached through a pointer.
    pub fn has_indirection(&self) -> bool {
        self.suboffsets()
            .is_some_and(|s| s.iter().any(|&suboffset| suboffset >= 0))
    }

    /// Number of items in the view: 1 for a scalar, otherwise the
    /// product of the shape. `None` if the count does not fit a
    /// `usize`, which broadcast views with zero strides can reach.
    pub fn len(&self) -> Option<usize> {
        if self.is_empty() {
            return Some(0);
        }
        self.shape
            .iter()
            .try_fold(1usize, |count, &size| count.checked_mul(size))
    }

    /// Whether some dimension has extent 0. Scalars hold one item.
    pub fn is_empty(&self) -> bool {
        self.shape.contains(&0)
    }

    /// Bytes the items would occupy if stored contiguously, or `None`
    /// on overflow.
    pub fn nbytes(&self) -> Option<usize> {
        self.len()?.checked_mul(self.item_size)
    }

    /// Whether the items are laid out back to back in `order`.
    ///
    /// Dimensions of extent 1 never move, so their strides are
    /// ignored. Empty views are contiguous; views with indirection
    /// never are.
    pub fn is_contiguous(&self, order: Order) -> bool {
        if self.has_indirection() {
            return false;
        }
        if self.is_empty() {
            return true;
        }
        let Ok(expected) = contiguous_strides(&self.shape, self.item_size, order) else {
            return false;
        };
        self.shape
            .iter()
            .zip(self.strides.iter().zip(&expected))
            .all(|(&size, (stride, want))| size == 1 || stride == want)
    }

    /// Checks that the view fits the block, in the order
    /// [`check_geometry`] applies its rules. Suboffsets, when present,
    /// must have one entry per dimension.
    ///
    /// Suboffsets are not followed: every dimension is checked as if
    /// it addressed this block.
    pub fn check_within<M: MemoryBlock + ?Sized>(&self, memory: &M) -> Result<(), ViewError> {
        let result = self.check_len(memory.len());
        if let Err(err) = &result {
            tracing::debug!(%err, descriptor = ?self, "rejected view geometry");
        }
        result
    }

    /// Returns whether the view fits the block.
    pub fn is_valid_for<M: MemoryBlock + ?Sized>(&self, memory: &M) -> bool {
        self.check_len(memory.len()).is_ok()
    }

    fn check_len(&self, memory_len: usize) -> Result<(), ViewError> {
        check_geometry(
            memory_len,
            self.item_size,
            self.ndim() as isize,
            &self.shape,
            &self.strides,
            self.offset,
        )?;
        match self.suboffsets() {
            Some(s) if s.len() != self.ndim() => Err(ViewError::InvalidDims {
                expected: self.ndim(),
                got: s.len(),
            }),
            _ => Ok(()),
        }
    }

    /// The bytes the view touches, measured from the start of the
    /// block. Empty views touch nothing and return `None`, as do
    /// views whose extent lies before the start of the block.
    pub fn byte_range(&self) -> Option<Range<usize>> {
        let (reach_min, reach_max) = reachable_extent(&self.shape, &self.strides)?;
        let low = self.offset as i128 + reach_min;
        let high = self.offset as i128 + reach_max + self.item_size as i128;
        Some(usize::try_from(low).ok()?..usize::try_from(high).ok()?)
    }

    /// The address of the item at `indices`, given that the view's
    /// block starts at `mem`.
    ///
    /// The descriptor must have passed [`Self::check_within`] for that
    /// block and every index must be in range; neither is checked.
    pub fn resolve<I: Indirection + ?Sized>(
        &self,
        mem: usize,
        indices: &[usize],
        indirection: &I,
    ) -> usize {
        resolve(
            mem.wrapping_add_signed(self.offset),
            self.ndim(),
            &self.strides,
            self.suboffsets(),
            indices,
            indirection,
        )
    }
}
