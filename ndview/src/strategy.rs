/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Property-based generators for view geometries.
//!
//! Geometries are built around their reachable extent so that most
//! generated cases are valid, with some slack on either side so that
//! the boundary is exercised too.
//!
//! This module is only included in test builds (`#[cfg(test)]`).

use proptest::prelude::*;

use crate::descriptor::ViewDescriptor;
use crate::geometry::reachable_extent;
use crate::geometry::validate;

/// Raw geometry tuples `(memory_len, item_size, shape, strides,
/// offset)`: up to three dimensions of extent at most 4, aligned
/// strides of either sign, and an origin placed so that the view
/// starts at or after the beginning of the block. The block may be
/// one item too short.
pub fn gen_geometry() -> impl Strategy<Value = (usize, usize, Vec<usize>, Vec<isize>, isize)> {
    (prop::sample::select(vec![1usize, 2, 4, 8]), 0usize..=3)
        .prop_flat_map(|(item_size, ndim)| {
            (
                Just(item_size),
                prop::collection::vec(0usize..=4, ndim),
                prop::collection::vec(-6isize..=6, ndim),
                0isize..=3,
                -1isize..=3,
            )
        })
        .prop_map(|(item_size, shape, steps, lead, slack)| {
            let item = item_size as isize;
            let strides: Vec<isize> = steps.iter().map(|step| step * item).collect();
            let (reach_min, reach_max) = reachable_extent(&shape, &strides).unwrap_or((0, 0));
            let offset = lead * item - reach_min as isize;
            let memory_len = (offset + reach_max as isize + item + slack * item).max(0) as usize;
            (memory_len, item_size, shape, strides, offset)
        })
}

/// Valid views together with a block of distinct-ish bytes to read
/// them from.
pub fn gen_view() -> impl Strategy<Value = (Vec<u8>, ViewDescriptor)> {
    gen_geometry()
        .prop_filter("valid geometry", |(memory_len, item_size, shape, strides, offset)| {
            validate(
                *memory_len,
                *item_size,
                shape.len() as isize,
                shape,
                strides,
                *offset,
            )
        })
        .prop_map(|(memory_len, item_size, shape, strides, offset)| {
            let memory = (0..memory_len).map(|i| i as u8).collect();
            let descriptor = ViewDescriptor::new(item_size, shape, strides, offset).unwrap();
            (memory, descriptor)
        })
}

mod tests {
    use proptest::strategy::ValueTree;
    use proptest::test_runner::Config;
    use proptest::test_runner::TestRunner;

    use super::*;

    #[test]
    fn sample_many() {
        let mut runner = TestRunner::new(Config::default());

        let mut valid = 0;
        for _ in 0..256 {
            let (memory_len, item_size, shape, strides, offset) =
                gen_geometry().new_tree(&mut runner).unwrap().current();
            assert_eq!(shape.len(), strides.len());
            assert!(offset >= 0);
            if validate(memory_len, item_size, shape.len() as isize, &shape, &strides, offset) {
                valid += 1;
            }
        }
        // Only the short-block slack produces invalid cases.
        assert!(valid > 128, "only {valid} of 256 samples were valid");
    }
}
