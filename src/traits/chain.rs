/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Capability-set abstraction over chain implementations.
//!
//! Grounded on the teacher's `SequentialGraph`/`RandomAccessGraph` split
//! (`traits/graph.rs`): rather than one monolithic `Chain` trait, algorithms
//! that only need a subset of the contract (Copy needs `ReadChain` +
//! `IterateInOrder`; the random walker needs `ReadChain`; `Feed` needs
//! `WriteChain`) are written generically over just that bound, so a future
//! chain implementation only has to provide the capabilities it can.

use crate::atom::Atom;
use crate::error::Result;
use rand::RngCore;

/// A link from some parent atom to a child atom, with the child's
/// transition probability already normalized against the parent's total
/// outgoing count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub child: u64,
    pub probability: f64,
}

/// Read-only access to a chain's atoms and their outgoing transitions.
pub trait ReadChain: Send + Sync {
    /// Look up the id of an atom equal to `value`.
    fn find(&self, value: &Atom) -> Result<u64>;

    /// Fetch the atom stored at `id`.
    fn get(&self, id: u64) -> Result<Atom>;

    /// The outgoing transitions of the atom at `id`, in insertion order, as
    /// raw `(child id, count)` pairs.
    ///
    /// This is what [`crate::copy::copy`] and `optimize` replay exactly;
    /// [`ReadChain::links`] is a normalized view built on top of it.
    fn raw_links(&self, id: u64) -> Result<Vec<(u64, u32)>>;

    /// The outgoing links of the atom at `id`, in insertion order, with
    /// counts normalized to probabilities.
    fn links(&self, id: u64) -> Result<Vec<Link>> {
        let raw = self.raw_links(id)?;
        let total: u64 = raw.iter().map(|&(_, count)| count as u64).sum();
        Ok(raw
            .into_iter()
            .map(|(child, count)| Link {
                child,
                probability: if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64
                },
            })
            .collect())
    }
}

/// Mutating access: add vocabulary and record transitions.
pub trait WriteChain: ReadChain {
    /// Insert `value` if absent, returning its id either way (idempotent).
    fn add(&self, value: Atom) -> Result<u64>;

    /// Bump the count of the transition `parent -> child` by `delta`,
    /// creating the transition if it does not exist yet.
    fn relate(&self, parent: u64, child: u64, delta: u32) -> Result<()>;
}

/// A chain that can enumerate its atoms in a fixed, chain-defined order
/// without revisiting any id.
pub trait IterateInOrder: ReadChain {
    /// The id of this chain's first atom, or [`crate::error::StoreError::BrokenChain`]
    /// if the chain is empty.
    ///
    /// This always returns the atom's real id — the same id `find`/`add`
    /// would hand back for it, and the same id that appears as a child in
    /// another atom's `raw_links` — never the `id == 0` "first atom" input
    /// sentinel some callers may pass elsewhere (spec §4.6): a memory chain's
    /// first atom genuinely has id 0, but a disk chain's first atom's real
    /// id is its file offset just past the magic header, which is never 0.
    /// Returning the sentinel here instead of the real id would leave
    /// [`crate::walkers::IterativeWalker`]'s output id space inconsistent
    /// with every other method's, and is also why this exists as its own
    /// method rather than folding into `next_id`: it lets the walker
    /// distinguish "empty chain" from "first atom's real id happens to be 0"
    /// without special-casing each implementation.
    fn first_id(&self) -> Result<u64>;

    /// The id of the atom that follows `id` in that order.
    fn next_id(&self, id: u64) -> Result<u64>;
}

/// A chain that can draw a uniformly random atom id without the generic
/// count-then-walk fallback in [`crate::walkers::random`].
pub trait RandomAtom: IterateInOrder {
    /// Pick an atom id uniformly at random.
    fn random_atom(&self, rng: &mut dyn RngCore) -> Result<u64>;
}
