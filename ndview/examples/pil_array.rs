/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Walks `char v[2][2][3]` stored PIL-style, as `char (*v[2])[2][3]`:
//! a table of two pointers, each to a `[2][3]` plane that lives in its
//! own block.

use anyhow::Context;
use anyhow::Result;
use ndview::AddressSpace;
use ndview::IndexIterator;
use ndview::Order;
use ndview::ViewDescriptor;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const POINTER: usize = std::mem::size_of::<usize>();

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut space = AddressSpace::new();
    let table = space.map_zeroed(2 * POINTER);
    let mut planes = Vec::new();
    for plane in 0..2u8 {
        let base = space.map((0..6).map(|i| b'a' + plane * 6 + i).collect());
        space
            .write_address(table + plane as usize * POINTER, base)
            .context("pointer table too small")?;
        planes.push(base);
    }

    // The pointer table is itself a contiguous view of addresses.
    let pointers = ViewDescriptor::contiguous(POINTER, vec![2], Order::RowMajor)?;
    pointers.check_within(space.block(table).context("table not mapped")?)?;

    let descriptor = ViewDescriptor::new(1, vec![2, 2, 3], vec![POINTER as isize, 3, 1], 0)?
        .with_suboffsets(vec![0, -1, -1])?;
    println!("{}", serde_json::to_string(&descriptor)?);

    let mut text = String::new();
    for index in IndexIterator::new(descriptor.shape().to_vec()) {
        let address = descriptor.resolve(table, &index, &space);
        let byte = space.read(address, 1).context("resolved outside memory")?[0];
        println!("v{:?} @ {:#x} = {}", index, address, byte as char);
        text.push(byte as char);
    }
    println!("{}", text);

    // Swapping the table entries swaps the planes and nothing else.
    space.write_address(table, planes[1]).context("table")?;
    space.write_address(table + POINTER, planes[0]).context("table")?;
    let swapped: String = IndexIterator::new(descriptor.shape().to_vec())
        .map(|index| {
            let address = descriptor.resolve(table, &index, &space);
            space.read(address, 1).map(|b| b[0] as char)
        })
        .collect::<Option<_>>()
        .context("resolved outside memory")?;
    println!("{}", swapped);

    Ok(())
}
