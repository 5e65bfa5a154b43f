/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Checked access to validated views.
//!
//! [`View`] pairs a [`ViewDescriptor`] with the bytes it describes.
//! Construction runs the full geometry check once; afterwards every
//! in-range index maps to bytes inside the block, so item access only
//! has to check indices against the shape.

use std::fmt;

use crate::descriptor::Order;
use crate::descriptor::ViewDescriptor;
use crate::geometry::ViewError;
use crate::resolve::resolve_strided;

/// A validated strided view over borrowed bytes.
///
/// Views with indirection are rejected: their items live outside the
/// block, and reading them needs an
/// [`AddressSpace`](crate::AddressSpace).
#[derive(Clone)]
pub struct View<'a> {
    memory: &'a [u8],
    descriptor: ViewDescriptor,
}

impl<'a> View<'a> {
    pub fn new(memory: &'a [u8], descriptor: ViewDescriptor) -> Result<Self, ViewError> {
        if descriptor.has_indirection() {
            return Err(ViewError::Indirect);
        }
        descriptor.check_within(memory)?;
        Ok(Self { memory, descriptor })
    }

    pub fn descriptor(&self) -> &ViewDescriptor {
        &self.descriptor
    }

    pub fn memory(&self) -> &'a [u8] {
        self.memory
    }

    /// The bytes of the item at `indices`.
    pub fn get(&self, indices: &[usize]) -> Result<&'a [u8], ViewError> {
        let shape = self.descriptor.shape();
        if indices.len() != shape.len() {
            return Err(ViewError::InvalidDims {
                expected: shape.len(),
                got: indices.len(),
            });
        }
        if let Some((dim, (&index, &size))) = indices
            .iter()
            .zip(shape)
            .enumerate()
            .find(|(_, (index, size))| index >= size)
        {
            return Err(ViewError::IndexOutOfRange { dim, index, size });
        }
        Ok(self.item(indices))
    }

    // Indices must be in range.
    fn item(&self, indices: &[usize]) -> &'a [u8] {
        let start = resolve_strided(
            self.descriptor.offset() as usize,
            self.descriptor.strides(),
            indices,
        );
        let memory = self.memory;
        &memory[start..start + self.descriptor.item_size()]
    }

    /// Iterates over all index tuples in row-major order.
    pub fn indices(&self) -> IndexIterator {
        IndexIterator::new(self.descriptor.shape().to_vec())
    }

    /// Iterates over item bytes in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.indices().map(move |indices| self.item(&indices))
    }

    /// Copies the items into a new contiguous buffer laid out in
    /// `order`.
    pub fn to_vec(&self, order: Order) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.descriptor.nbytes().unwrap_or(0));
        match order {
            Order::RowMajor => self.iter().for_each(|item| out.extend_from_slice(item)),
            Order::ColumnMajor => {
                // Walk the reversed shape and flip each index back.
                let mut reversed = self.descriptor.shape().to_vec();
                reversed.reverse();
                for mut indices in IndexIterator::new(reversed) {
                    indices.reverse();
                    out.extend_from_slice(self.item(&indices));
                }
            }
        }
        out
    }
}

impl fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("memory_len", &self.memory.len())
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Iterates over every index tuple within a shape, last dimension
/// fastest. A zero-dimensional shape yields one empty tuple; a shape
/// with an empty dimension yields nothing.
#[derive(Debug, Clone)]
pub struct IndexIterator {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl IndexIterator {
    pub fn new(shape: Vec<usize>) -> Self {
        let next = (!shape.contains(&0)).then(|| vec![0; shape.len()]);
        Self { shape, next }
    }
}

impl Iterator for IndexIterator {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut successor = current.clone();
        for dim in (0..self.shape.len()).rev() {
            successor[dim] += 1;
            if successor[dim] < self.shape[dim] {
                self.next = Some(successor);
                break;
            }
            successor[dim] = 0;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::strategy::gen_view;

    fn bytes(n: u8) -> Vec<u8> {
        (0..n).collect()
    }

    #[test]
    fn test_index_iterator() {
        let all: Vec<_> = IndexIterator::new(vec![2, 3]).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
        assert_eq!(
            IndexIterator::new(vec![]).collect::<Vec<_>>(),
            vec![Vec::<usize>::new()]
        );
        assert_eq!(IndexIterator::new(vec![3, 0]).count(), 0);
    }

    #[test]
    fn test_rejects_out_of_bounds() {
        let mem = bytes(10);
        let desc = ViewDescriptor::new(1, vec![11], vec![1], 0).unwrap();
        assert!(matches!(
            View::new(&mem, desc),
            Err(ViewError::ExtentOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_indirection() {
        let mem = bytes(16);
        let desc = ViewDescriptor::new(8, vec![2], vec![8], 0)
            .unwrap()
            .with_suboffsets(vec![0])
            .unwrap();
        assert_eq!(View::new(&mem, desc).unwrap_err(), ViewError::Indirect);
    }

    #[test]
    fn test_get() {
        let mem = bytes(24);
        let desc = ViewDescriptor::contiguous(4, vec![2, 3], Order::RowMajor).unwrap();
        let view = View::new(&mem, desc).unwrap();
        assert_eq!(view.get(&[1, 2]).unwrap(), &[20, 21, 22, 23]);
        assert_eq!(
            view.get(&[2, 0]),
            Err(ViewError::IndexOutOfRange {
                dim: 0,
                index: 2,
                size: 2
            })
        );
        assert_eq!(
            view.get(&[0]),
            Err(ViewError::InvalidDims {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_reverse_view() {
        let mem = bytes(6);
        let desc = ViewDescriptor::new(2, vec![3], vec![-2], 4).unwrap();
        let view = View::new(&mem, desc).unwrap();
        let items: Vec<_> = view.iter().collect();
        assert_eq!(items, vec![&[4u8, 5][..], &[2, 3], &[0, 1]]);
        assert_eq!(view.to_vec(Order::RowMajor), vec![4, 5, 2, 3, 0, 1]);
    }

    #[test]
    fn test_scalar_view() {
        let mem = bytes(8);
        let view = View::new(&mem, ViewDescriptor::scalar(2, 6)).unwrap();
        assert_eq!(view.get(&[]).unwrap(), &[6, 7]);
        assert_eq!(view.to_vec(Order::ColumnMajor), vec![6, 7]);
    }

    #[test]
    fn test_broadcast_view() {
        let mem = bytes(3);
        // Each row repeats the same three bytes.
        let desc = ViewDescriptor::new(1, vec![2, 3], vec![0, 1], 0).unwrap();
        let view = View::new(&mem, desc).unwrap();
        assert_eq!(view.to_vec(Order::RowMajor), vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(view.to_vec(Order::ColumnMajor), vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_transpose_roundtrip() {
        let mem = bytes(6);
        let rows = View::new(
            &mem,
            ViewDescriptor::contiguous(1, vec![2, 3], Order::RowMajor).unwrap(),
        )
        .unwrap();
        let fortran = rows.to_vec(Order::ColumnMajor);
        assert_eq!(fortran, vec![0, 3, 1, 4, 2, 5]);
        let cols = View::new(
            &fortran,
            ViewDescriptor::contiguous(1, vec![2, 3], Order::ColumnMajor).unwrap(),
        )
        .unwrap();
        assert_eq!(cols.to_vec(Order::RowMajor), mem);
    }

    #[test]
    fn test_empty_view() {
        let mem = bytes(4);
        let desc = ViewDescriptor::new(4, vec![0, 5], vec![4, 4], 0).unwrap();
        let view = View::new(&mem, desc).unwrap();
        assert_eq!(view.iter().count(), 0);
        assert!(view.to_vec(Order::RowMajor).is_empty());
    }

    proptest! {
        #[test]
        fn items_match_byte_range((mem, desc) in gen_view()) {
            let range = desc.byte_range();
            let view = View::new(&mem, desc).unwrap();
            for item in view.iter() {
                let start = item.as_ptr() as usize - mem.as_ptr() as usize;
                let range = range.clone().unwrap();
                prop_assert!(range.start <= start);
                prop_assert!(start + item.len() <= range.end);
            }
        }

        #[test]
        fn contiguous_copy_is_contiguous((mem, desc) in gen_view()) {
            let view = View::new(&mem, desc.clone()).unwrap();
            let copy = view.to_vec(Order::RowMajor);
            prop_assert_eq!(Some(copy.len()), desc.nbytes());
            let packed = ViewDescriptor::contiguous(desc.item_size(), desc.shape().to_vec(), Order::RowMajor).unwrap();
            let repacked = View::new(&copy, packed);
            // A packed empty view has nowhere to put its origin item.
            if !copy.is_empty() {
                prop_assert_eq!(repacked.unwrap().to_vec(Order::RowMajor), copy);
            }
        }
    }
}
