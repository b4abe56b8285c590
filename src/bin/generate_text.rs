/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Walks a disk chain, printing the atoms it visits joined by a delimiter.

use anyhow::{Context, Result};
use clap::Parser;
use markov_store::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Generate text by taking a weighted random walk over a chain", long_about = None)]
struct Args {
    /// The chain file to read.
    #[arg(long)]
    chain: PathBuf,

    /// Number of steps to walk.
    #[arg(long)]
    count: usize,

    /// PRNG seed, for reproducible output.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// String to join walked atoms with.
    #[arg(long, default_value = " ")]
    delim: String,

    /// Atom to start the walk from. Must already be present in the chain.
    /// If omitted, a starting atom is chosen uniformly at random.
    #[arg(long)]
    start: Option<String>,
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
    let chain = DiskChain::open(&args.chain)
        .with_context(|| format!("opening {}", args.chain.display()))?;
    let mut rng = SmallRng::seed_from_u64(args.seed);

    let start = match &args.start {
        Some(s) => chain
            .find(&Atom::Str(s.clone()))
            .with_context(|| format!("atom {s:?} not found in chain"))?,
        None => random(&chain, &mut rng)?,
    };

    let mut words = vec![atom_to_string(&chain.get(start)?)];
    let mut walker = RandomWalker::new(&chain, start);
    for _ in 0..args.count {
        let id = walker.step(&mut rng)?;
        words.push(atom_to_string(&chain.get(id)?));
    }

    println!("{}", words.join(&args.delim));
    Ok(())
}

fn atom_to_string(atom: &Atom) -> String {
    match atom {
        Atom::Str(s) => s.clone(),
        Atom::U64(v) => v.to_string(),
        Atom::I64(v) => v.to_string(),
        Atom::Usize(v) => v.to_string(),
        Atom::Isize(v) => v.to_string(),
        Atom::U32(v) => v.to_string(),
        Atom::I32(v) => v.to_string(),
        Atom::F32(v) => v.to_string(),
        Atom::F64(v) => v.to_string(),
    }
}
