/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Tokenizes a text file into overlapping n-grams of words and feeds them
//! into a chain, one atom per n-gram.
//!
//! Higher-order behavior is achieved entirely by this composition — the
//! chain itself stays strictly first-order (spec §1 Non-goals).

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use markov_store::prelude::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Build a Markov chain from a text file, one atom per n-gram of words", long_about = None)]
struct Args {
    /// The text file to read.
    #[arg(long)]
    source: PathBuf,

    /// The chain file to write.
    #[arg(long)]
    chain: PathBuf,

    /// Reopen an existing chain instead of truncating it.
    #[arg(long)]
    update: bool,

    /// Feed atoms directly into the disk chain instead of building in
    /// memory first and copying the result to disk.
    #[arg(long)]
    disk: bool,

    /// Number of words per n-gram atom.
    #[arg(long)]
    n: usize,
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
    if args.n == 0 {
        bail!("-n must be a positive integer");
    }
    let text = std::fs::read_to_string(&args.source)
        .with_context(|| format!("reading {}", args.source.display()))?;
    let words: Vec<&str> = text.split_whitespace().collect();
    let atoms: Vec<Atom> = words
        .windows(args.n)
        .map(|gram| Atom::Str(gram.join(" ")))
        .collect();

    if args.disk {
        let chain = open_disk_chain(&args)?;
        feed(&chain, vec![atoms])?;
    } else {
        let memory = MemoryChain::new();
        feed(&memory, vec![atoms])?;
        let disk = open_disk_chain(&args)?;
        copy(&memory, &disk)?;
    }

    info!("built {}-gram chain at {}", args.n, args.chain.display());
    Ok(())
}

fn open_disk_chain(args: &Args) -> Result<DiskChain> {
    let chain = if args.update {
        DiskChain::open(&args.chain).with_context(|| format!("opening {}", args.chain.display()))?
    } else {
        DiskChain::create(&args.chain)
            .with_context(|| format!("creating {}", args.chain.display()))?
    };
    Ok(chain)
}
