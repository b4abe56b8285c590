/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Compacts a disk chain: every record's head bucket is resized to exactly
//! its current out-degree, eliminating slack and tail buckets.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use markov_store::prelude::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Compact a chain file, sizing each record's head bucket exactly", long_about = None)]
struct Args {
    /// The chain file to read.
    #[arg(long = "in")]
    input: PathBuf,

    /// The compacted chain file to write. Must not already exist.
    #[arg(long = "out")]
    output: PathBuf,
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        let code = if e.downcast_ref::<StoreError>().is_some() { 2 } else { 1 };
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let src = DiskChain::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    optimize(&src, &args.output)
        .with_context(|| format!("optimizing into {}", args.output.display()))?;
    info!(
        "optimized {} -> {}",
        args.input.display(),
        args.output.display()
    );
    Ok(())
}
