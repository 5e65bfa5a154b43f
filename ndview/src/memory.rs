/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Backing memory as seen by the view engine.
//!
//! The engine never allocates, frees, or copies memory. It needs the
//! length of a block to validate a view ([`MemoryBlock`]) and, for
//! views with suboffsets, some way to read a stored address
//! ([`AddressSpace`]).

use std::collections::BTreeMap;

use crate::resolve::Indirection;

/// A contiguous, byte-addressable region of known length.
pub trait MemoryBlock {
    /// Length of the block in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MemoryBlock for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }
}

impl MemoryBlock for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }
}

impl<const N: usize> MemoryBlock for [u8; N] {
    fn len(&self) -> usize {
        N
    }
}

const POINTER_SIZE: usize = std::mem::size_of::<usize>();

// Leave unmapped space between blocks so that stray addresses don't
// silently land in a neighbor.
const FIRST_BASE: usize = 0x1000;
const GUARD: usize = 0x1000;

/// A set of byte blocks placed at distinct addresses.
///
/// Addresses are plain `usize` values in a private numbering, so a
/// block can store the address of another block (native-endian,
/// pointer sized) and views can follow it through suboffsets without
/// dereferencing raw pointers.
#[derive(Debug, Default, Clone)]
pub struct AddressSpace {
    blocks: BTreeMap<usize, Vec<u8>>,
    next_base: usize,
}

impl AddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `bytes` at a fresh address and returns that address.
    pub fn map(&mut self, bytes: Vec<u8>) -> usize {
        let base = self.next_base.max(FIRST_BASE);
        let end = base + bytes.len();
        self.next_base = (end + GUARD).next_multiple_of(GUARD);
        tracing::trace!(base, len = bytes.len(), "mapped block");
        self.blocks.insert(base, bytes);
        base
    }

    /// Maps a zero-filled block of `len` bytes.
    pub fn map_zeroed(&mut self, len: usize) -> usize {
        self.map(vec![0; len])
    }

    /// The block mapped at exactly `base`.
    pub fn block(&self, base: usize) -> Option<&[u8]> {
        self.blocks.get(&base).map(Vec::as_slice)
    }

    pub fn block_mut(&mut self, base: usize) -> Option<&mut [u8]> {
        self.blocks.get_mut(&base).map(Vec::as_mut_slice)
    }

    /// Finds the block containing `address`, returning its base and
    /// the offset of `address` within it.
    pub fn locate(&self, address: usize) -> Option<(usize, usize)> {
        let (&base, bytes) = self.blocks.range(..=address).next_back()?;
        let offset = address - base;
        (offset < bytes.len()).then_some((base, offset))
    }

    /// The `len` bytes at `address`, if they lie within one block.
    pub fn read(&self, address: usize, len: usize) -> Option<&[u8]> {
        let (base, offset) = self.locate(address)?;
        self.blocks[&base].get(offset..offset.checked_add(len)?)
    }

    /// Overwrites the bytes at `address`. Returns `None` when they do
    /// not lie within one block.
    pub fn write(&mut self, address: usize, data: &[u8]) -> Option<()> {
        let (base, offset) = self.locate(address)?;
        let block = self.blocks.get_mut(&base)?;
        block
            .get_mut(offset..offset.checked_add(data.len())?)?
            .copy_from_slice(data);
        Some(())
    }

    /// Reads a stored address.
    pub fn read_address(&self, address: usize) -> Option<usize> {
        let bytes = self.read(address, POINTER_SIZE)?;
        Some(usize::from_ne_bytes(bytes.try_into().ok()?))
    }

    /// Stores `target` at `address`.
    pub fn write_address(&mut self, address: usize, target: usize) -> Option<()> {
        self.write(address, &target.to_ne_bytes())
    }
}

impl Indirection for AddressSpace {
    /// # Panics
    ///
    /// Panics if no pointer is stored at `address`; following an
    /// unmapped address means the view was never valid.
    fn follow(&self, address: usize) -> usize {
        self.read_address(address)
            .unwrap_or_else(|| panic!("indirection through unmapped address {address:#x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_block_len() {
        let v = vec![0u8; 7];
        assert_eq!(MemoryBlock::len(&v), 7);
        assert_eq!(MemoryBlock::len(&v[2..]), 5);
        assert_eq!(MemoryBlock::len(&[0u8; 3]), 3);
        assert!(MemoryBlock::is_empty(&[0u8; 0]));
    }

    #[test]
    fn test_map_separates_blocks() {
        let mut space = AddressSpace::new();
        let a = space.map(vec![1; 10]);
        let b = space.map(vec![2; 10]);
        assert_eq!(a, FIRST_BASE);
        assert!(b >= a + 10 + GUARD);
        assert_eq!(space.locate(a + 9), Some((a, 9)));
        assert_eq!(space.locate(a + 10), None);
        assert_eq!(space.locate(b), Some((b, 0)));
        assert_eq!(space.locate(0), None);
        assert_eq!(space.block(b), Some(&[2u8; 10][..]));
    }

    #[test]
    fn test_read_write() {
        let mut space = AddressSpace::new();
        let a = space.map_zeroed(8);
        assert_eq!(space.write(a + 2, b"hi"), Some(()));
        assert_eq!(space.read(a + 2, 2), Some(&b"hi"[..]));
        // Straddles the end of the block.
        assert_eq!(space.write(a + 7, b"no"), None);
        assert_eq!(space.read(a + 7, 2), None);
        space.block_mut(a).unwrap()[0] = 9;
        assert_eq!(space.read(a, 1), Some(&[9u8][..]));
    }

    #[test]
    fn test_stored_addresses() {
        let mut space = AddressSpace::new();
        let table = space.map_zeroed(2 * POINTER_SIZE);
        let target = space.map_zeroed(1);
        space.write_address(table + POINTER_SIZE, target).unwrap();
        assert_eq!(space.read_address(table + POINTER_SIZE), Some(target));
        assert_eq!(space.follow(table + POINTER_SIZE), target);
        assert_eq!(space.read_address(target), None);
    }

    #[test]
    #[should_panic(expected = "unmapped address")]
    fn test_follow_unmapped_panics() {
        AddressSpace::new().follow(0x10);
    }
}
