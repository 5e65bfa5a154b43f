/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap::ValueEnum;
use ndview::MemoryBlock;
use ndview::Order;
use ndview::ViewDescriptor;
use ndview::resolve_strided;
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Checks a view geometry against a block size
/// ```
///   cargo run -p ndview --example inspect -- --memory-len 6 --item-size 2 --shape 3 --strides=-2 --offset 4
/// ```
#[derive(Parser, Debug)]
#[command()]
struct Args {
    /// Length of the backing block in bytes
    #[arg(short, long)]
    memory_len: usize,

    /// Descriptor as JSON; replaces the geometry flags below
    #[arg(long, conflicts_with_all = ["shape", "strides", "offset"])]
    json: Option<String>,

    /// Item size in bytes
    #[arg(short, long, default_value_t = 1)]
    item_size: usize,

    /// Extent of each dimension; omit for a scalar
    #[arg(long, value_delimiter = ',')]
    shape: Vec<usize>,

    /// Byte stride of each dimension; contiguous when omitted
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    strides: Option<Vec<isize>>,

    /// Layout used when strides are omitted
    #[arg(long, value_enum, default_value_t = Layout::C)]
    layout: Layout,

    /// Byte offset of the view origin within the block
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    offset: isize,

    /// Index tuple to resolve to a byte offset
    #[arg(long, value_delimiter = ',')]
    index: Option<Vec<usize>>,

    /// Print the report as JSON
    #[arg(long)]
    report_json: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Layout {
    C,
    Fortran,
}

impl From<Layout> for Order {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::C => Order::RowMajor,
            Layout::Fortran => Order::ColumnMajor,
        }
    }
}

// Only the length of the block matters, so none is allocated.
struct Block(usize);

impl MemoryBlock for Block {
    fn len(&self) -> usize {
        self.0
    }
}

#[derive(Serialize, Debug)]
struct Report {
    descriptor: ViewDescriptor,
    memory_len: usize,
    valid: bool,
    reason: Option<String>,
    bytes: Option<(usize, usize)>,
    c_contiguous: bool,
    f_contiguous: bool,
    resolved: Option<usize>,
}

fn descriptor(args: &Args) -> Result<ViewDescriptor> {
    if let Some(json) = &args.json {
        return Ok(serde_json::from_str(json)?);
    }
    let strides = match &args.strides {
        Some(strides) => strides.clone(),
        None => ndview::contiguous_strides(&args.shape, args.item_size, args.layout.into())?,
    };
    Ok(ViewDescriptor::new(
        args.item_size,
        args.shape.clone(),
        strides,
        args.offset,
    )?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let descriptor = descriptor(&args)?;
    let check = descriptor.check_within(&Block(args.memory_len));

    let resolved = match &args.index {
        Some(index) => {
            if check.is_err() {
                bail!("refusing to resolve an index in an invalid view");
            }
            if index.len() != descriptor.ndim() || descriptor.has_indirection() {
                bail!(
                    "index must have {} entries and the view no suboffsets",
                    descriptor.ndim()
                );
            }
            if let Some((dim, _)) = index
                .iter()
                .zip(descriptor.shape())
                .enumerate()
                .find(|(_, (i, size))| i >= size)
            {
                bail!("index {:?} is out of range in dimension {}", index, dim);
            }
            Some(resolve_strided(
                descriptor.offset() as usize,
                descriptor.strides(),
                index,
            ))
        }
        None => None,
    };

    let report = Report {
        memory_len: args.memory_len,
        valid: check.is_ok(),
        reason: check.err().map(|err| err.to_string()),
        bytes: descriptor.byte_range().map(|r| (r.start, r.end)),
        c_contiguous: descriptor.is_contiguous(Order::RowMajor),
        f_contiguous: descriptor.is_contiguous(Order::ColumnMajor),
        resolved,
        descriptor,
    };

    if args.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match &report.reason {
        None => println!("valid view over {} bytes", report.memory_len),
        Some(reason) => println!("invalid view: {}", reason),
    }
    println!("  shape:   {:?}", report.descriptor.shape());
    println!("  strides: {:?}", report.descriptor.strides());
    println!("  offset:  {}", report.descriptor.offset());
    if let Some((start, end)) = report.bytes {
        println!("  touches: [{}, {})", start, end);
    }
    println!(
        "  contiguous: C={} Fortran={}",
        report.c_contiguous, report.f_contiguous
    );
    if let Some(offset) = report.resolved {
        println!("  item at {:?}: byte {}", args.index.unwrap_or_default(), offset);
    }

    Ok(())
}
