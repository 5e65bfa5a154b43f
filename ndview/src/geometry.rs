/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Bounds checking for strided view geometries.
//!
//! A view places an N-dimensional array over a flat memory block of
//! `memory_len` bytes. Its logical origin (`buf`) sits `offset` bytes
//! past the start of the block (`mem`), and the element at index
//! `(i₀, …, iₙ₋₁)` lives at
//!
//! ```text
//! offset + ∑ⱼ strides[j] × iⱼ
//! ```
//!
//! Strides are signed: a dimension may walk backwards through memory,
//! or stand still (a broadcast dimension with stride 0).
//!
//! # Reachable extent
//!
//! The index-to-offset map is affine and separable, so the lowest and
//! highest reachable displacements are attained at corner indices and
//! can be computed per dimension without visiting the index space:
//!
//! ```text
//! reach_min = ∑ { stride × (size − 1) | stride ≤ 0 }
//! reach_max = ∑ { stride × (size − 1) | stride > 0 }
//! ```
//!
//! A view is in bounds iff `0 ≤ offset + reach_min` and
//! `offset + reach_max + item_size ≤ memory_len`.
//!
//! Sums are carried in checked 128-bit arithmetic. A sum that
//! overflows even that range lies outside every addressable block, so
//! reporting it as invalid agrees with exact arithmetic.

use thiserror::Error;

/// Errors that arise when describing, validating, or indexing a view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ViewError {
    #[error("item size must be positive")]
    ZeroItemSize,

    #[error("offset {offset} is not a multiple of item size {item_size}")]
    MisalignedOffset { offset: isize, item_size: usize },

    #[error("offset {offset} leaves no room for an item of {item_size} bytes in {memory_len} bytes")]
    OffsetOutOfBounds {
        offset: isize,
        item_size: usize,
        memory_len: usize,
    },

    #[error("stride {stride} of dimension {dim} is not a multiple of item size {item_size}")]
    MisalignedStride {
        dim: usize,
        stride: isize,
        item_size: usize,
    },

    #[error("negative number of dimensions: {ndim}")]
    NegativeDims { ndim: isize },

    #[error("scalar view carries shape or strides")]
    ScalarWithGeometry,

    #[error("invalid dims: expected {expected}, got {got}")]
    InvalidDims { expected: usize, got: usize },

    #[error("{ndim} dimensions exceed the limit of {max}")]
    TooManyDims { ndim: usize, max: usize },

    #[error("extent arithmetic overflowed")]
    Overflow,

    #[error("reachable bytes [{low}, {high}) fall outside memory of {memory_len} bytes")]
    ExtentOutOfBounds {
        low: i128,
        high: i128,
        memory_len: usize,
    },

    #[error("index {index} out of range {size} in dimension {dim}")]
    IndexOutOfRange {
        dim: usize,
        index: usize,
        size: usize,
    },

    #[error("view dereferences suboffsets and cannot be read directly")]
    Indirect,
}

/// Returns whether the described view is well formed and every
/// element it can address lies within a block of `memory_len` bytes.
///
/// This is a pure predicate: malformed input of any kind yields
/// `false`. Use [`check_geometry`] to learn which rule failed.
///
/// ```
/// use ndview::validate;
///
/// // Ten contiguous bytes.
/// assert!(validate(10, 1, 1, &[10], &[1], 0));
/// // One element too many.
/// assert!(!validate(10, 1, 1, &[11], &[1], 0));
/// // Three 2-byte items walked backwards from offset 4.
/// assert!(validate(6, 2, 1, &[3], &[-2], 4));
/// ```
pub fn validate(
    memory_len: usize,
    item_size: usize,
    ndim: isize,
    shape: &[usize],
    strides: &[isize],
    offset: isize,
) -> bool {
    check_geometry(memory_len, item_size, ndim, shape, strides, offset).is_ok()
}

/// Like [`validate`], but reports the first rule the geometry breaks.
///
/// Rules are applied in a fixed order: offset alignment, origin
/// bounds, stride alignment, dimensionality, empty extents, and
/// finally the reachable extent.
pub fn check_geometry(
    memory_len: usize,
    item_size: usize,
    ndim: isize,
    shape: &[usize],
    strides: &[isize],
    offset: isize,
) -> Result<(), ViewError> {
    if item_size == 0 {
        return Err(ViewError::ZeroItemSize);
    }
    let item = item_size as i128;
    let origin = offset as i128;
    let memory = memory_len as i128;

    if origin % item != 0 {
        return Err(ViewError::MisalignedOffset { offset, item_size });
    }

    if origin < 0 || origin + item > memory {
        return Err(ViewError::OffsetOutOfBounds {
            offset,
            item_size,
            memory_len,
        });
    }

    if let Some((dim, &stride)) = strides
        .iter()
        .enumerate()
        .find(|&(_, &stride)| stride as i128 % item != 0)
    {
        return Err(ViewError::MisalignedStride {
            dim,
            stride,
            item_size,
        });
    }

    if ndim < 0 {
        return Err(ViewError::NegativeDims { ndim });
    }
    if ndim == 0 {
        return if shape.is_empty() && strides.is_empty() {
            Ok(())
        } else {
            Err(ViewError::ScalarWithGeometry)
        };
    }

    let expected = ndim as usize;
    for got in [shape.len(), strides.len()] {
        if got != expected {
            return Err(ViewError::InvalidDims { expected, got });
        }
    }

    let Some((reach_min, reach_max)) = reach(shape, strides)? else {
        // Some dimension is empty: no element is addressable.
        return Ok(());
    };

    let low = origin + reach_min;
    let high = origin
        .checked_add(reach_max)
        .and_then(|h| h.checked_add(item))
        .ok_or(ViewError::Overflow)?;
    if low < 0 || high > memory {
        return Err(ViewError::ExtentOutOfBounds {
            low,
            high,
            memory_len,
        });
    }
    Ok(())
}

/// The lowest and highest byte displacement from the origin that
/// any index tuple within `shape` can reach.
///
/// Returns `None` when some dimension has extent zero, or when the
/// displacement does not fit in 128 bits. `shape` and `strides` are
/// paired up to the shorter of the two.
pub fn reachable_extent(shape: &[usize], strides: &[isize]) -> Option<(i128, i128)> {
    reach(shape, strides).ok().flatten()
}

// `Ok(None)` for empty views.
fn reach(shape: &[usize], strides: &[isize]) -> Result<Option<(i128, i128)>, ViewError> {
    if shape.contains(&0) {
        return Ok(None);
    }

    let mut reach_min: i128 = 0;
    let mut reach_max: i128 = 0;
    for (&size, &stride) in shape.iter().zip(strides) {
        let span = (stride as i128)
            .checked_mul(size as i128 - 1)
            .ok_or(ViewError::Overflow)?;
        // A zero stride counts toward the minimum; it contributes 0
        // either way.
        let total = if stride <= 0 {
            &mut reach_min
        } else {
            &mut reach_max
        };
        *total = total.checked_add(span).ok_or(ViewError::Overflow)?;
    }
    Ok(Some((reach_min, reach_max)))
}
