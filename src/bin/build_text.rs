/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Tokenizes a text file into whitespace-delimited words and feeds them
//! into a chain, one atom per word.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use markov_store::prelude::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Build a Markov chain from a text file, one atom per word", long_about = None)]
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
    let text = std::fs::read_to_string(&args.source)
        .with_context(|| format!("reading {}", args.source.display()))?;
    let words: Vec<Atom> = text
        .split_whitespace()
        .map(|w| Atom::Str(w.to_owned()))
        .collect();

    if args.disk {
        let chain = open_disk_chain(&args)?;
        feed(&chain, vec![words])?;
    } else {
        let memory = MemoryChain::new();
        feed(&memory, vec![words])?;
        let disk = open_disk_chain(&args)?;
        copy(&memory, &disk)?;
    }

    info!("built chain at {}", args.chain.display());
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
