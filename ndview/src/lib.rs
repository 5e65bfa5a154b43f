/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Geometry validation and addressing for strided buffer views.
//!
//! A buffer view interprets a flat block of memory as an
//! N-dimensional array: an item size, a shape, signed byte strides,
//! an origin offset into the block, and optionally per-dimension
//! suboffsets that route a dimension through a pointer. This crate
//! answers two questions about such a view:
//!
//! - Is it well formed, and does every item it can address lie inside
//!   the block? See [`validate`] and [`check_geometry`]. The answer is
//!   computed from the corners of the index space, never by visiting
//!   it.
//! - Where does a given index tuple live? See [`resolve`], which
//!   follows suboffsets through an injected [`Indirection`].
//!
//! Both are pure functions. [`ViewDescriptor`] packages a geometry as
//! a value, and [`View`] offers checked item access over borrowed
//! bytes.
//!
//! ```
//! use ndview::Order;
//! use ndview::View;
//! use ndview::ViewDescriptor;
//!
//! let memory: Vec<u8> = (0..24).collect();
//! let matrix = ViewDescriptor::contiguous(4, vec![2, 3], Order::RowMajor).unwrap();
//! let view = View::new(&memory, matrix).unwrap();
//! assert_eq!(view.get(&[1, 0]).unwrap(), &[12, 13, 14, 15]);
//! ```

mod descriptor;
mod geometry;
mod memory;
mod resolve;
mod view;

/// Process-wide settings.
pub mod config;

pub use descriptor::Order;
pub use descriptor::ViewDescriptor;
pub use descriptor::contiguous_strides;
pub use geometry::ViewError;
pub use geometry::check_geometry;
pub use geometry::reachable_extent;
pub use geometry::validate;
pub use memory::AddressSpace;
pub use memory::MemoryBlock;
pub use resolve::Indirection;
pub use resolve::resolve;
pub use resolve::resolve_strided;
pub use view::IndexIterator;
pub use view::View;

/// Property-based generators for randomized test input.
#[cfg(test)]
pub mod strategy;
