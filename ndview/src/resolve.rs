/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Mapping index tuples to addresses.
//!
//! A strided view maps `(i₀, …, iₙ₋₁)` to `buf + ∑ⱼ strides[j] × iⱼ`.
//! PIL-style views may additionally reach a dimension through a
//! pointer: when `suboffsets[j] ≥ 0`, the address computed after
//! applying `strides[j]` holds the address of a sub-array, and
//! `suboffsets[j]` is added to that address before continuing.
//!
//! For example, `char v[2][2][3]` can be laid out as `char
//! (*v[2])[2][3]`: two pointers at the start of `buf`, each to a
//! `[2][3]` array that may live anywhere. Its descriptor has
//! `strides = [8, 3, 1]` (on 64-bit targets) and `suboffsets = [0, -1,
//! -1]`.
//!
//! Each dereference changes the base for every later dimension, so
//! dimensions are applied strictly in order.

/// Reads an address stored at an address.
///
/// This is the capability a view needs from whoever owns its memory
/// in order to follow suboffsets.
pub trait Indirection {
    fn follow(&self, address: usize) -> usize;
}

impl<F> Indirection for F
where
    F: Fn(usize) -> usize,
{
    fn follow(&self, address: usize) -> usize {
        self(address)
    }
}

/// Computes the address of the item at `indices`, starting from the
/// view origin `base` and following one indirection for every
/// dimension whose suboffset is non-negative.
///
/// This is the per-access path and checks nothing: the view must have
/// been validated and every `indices[i]` must lie in `[0, shape[i])`.
/// Address arithmetic wraps, as pointer arithmetic would.
///
/// ```
/// use ndview::resolve;
///
/// // A 2x2 array of pointers-to-rows: the table at 100 points to
/// // rows at 1000 and 2000.
/// let follow = |address: usize| match address {
///     100 => 1000,
///     108 => 2000,
///     _ => unreachable!(),
/// };
/// let at = |i, j| resolve(100, 2, &[8, 4], Some(&[0, -1][..]), &[i, j], &follow);
/// assert_eq!(at(0, 1), 1004);
/// assert_eq!(at(1, 0), 2000);
/// ```
pub fn resolve<I: Indirection + ?Sized>(
    base: usize,
    ndim: usize,
    strides: &[isize],
    suboffsets: Option<&[isize]>,
    indices: &[usize],
    indirection: &I,
) -> usize {
    debug_assert_eq!(strides.len(), ndim, "strides length");
    debug_assert_eq!(indices.len(), ndim, "indices length");
    debug_assert!(
        suboffsets.map_or(true, |s| s.len() == ndim),
        "suboffsets length"
    );

    let mut pointer = base;
    for dim in 0..ndim {
        pointer = pointer.wrapping_add_signed(strides[dim].wrapping_mul(indices[dim] as isize));
        if let Some(&suboffset) = suboffsets.and_then(|s| s.get(dim)) {
            if suboffset >= 0 {
                pointer = indirection.follow(pointer).wrapping_add_signed(suboffset);
            }
        }
    }
    pointer
}

/// [`resolve`] for views without suboffsets.
#[inline]
pub fn resolve_strided(base: usize, strides: &[isize], indices: &[usize]) -> usize {
    debug_assert_eq!(strides.len(), indices.len(), "indices length");
    strides
        .iter()
        .zip(indices)
        .fold(base, |pointer, (&stride, &index)| {
            pointer.wrapping_add_signed(stride.wrapping_mul(index as isize))
        })
}
