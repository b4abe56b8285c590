/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Strategies for producing a sequence of atoms from a chain: visit every
//! atom once, or take a weighted random walk.
//!
//! The random walker takes an injected [`RngCore`] rather than relying on
//! process-wide PRNG seeding, per the distilled spec's "Global state"
//! redesign flag; the teacher already carries `rand` with the `small_rng`
//! feature for exactly this "fast, seedable, no OS entropy per step" case
//! (`graphs/random/er.rs`).

use crate::error::{Result, StoreError};
use crate::traits::{IterateInOrder, RandomAtom, ReadChain};
use rand::RngCore;
use std::collections::HashSet;

/// Visits every atom of a chain exactly once.
///
/// If the chain exposes a native [`IterateInOrder::next_id`] it is used
/// directly (both [`crate::stores::DiskChain`] and
/// [`crate::stores::MemoryChain`] do). A chain with no such ordering would
/// instead need a reachability-closure walk from id 0 using `links`,
/// keeping a visited set — see [`IterativeWalker::by_closure`] for that
/// fallback, kept available for a future chain implementation that cannot
/// offer a native order.
pub struct IterativeWalker<'a, C: IterateInOrder> {
    chain: &'a C,
    next: Option<u64>,
}

impl<'a, C: IterateInOrder> IterativeWalker<'a, C> {
    pub fn new(chain: &'a C) -> Self {
        let next = chain.first_id().ok();
        Self { chain, next }
    }

    /// Reachability-closure fallback for a chain without a native order:
    /// walk from id 0 using [`ReadChain::links`], tracking visited ids so
    /// each is yielded once. Order is unspecified.
    pub fn by_closure(chain: &'a C) -> Result<Vec<u64>> {
        let start = match chain.first_id() {
            Ok(id) => id,
            Err(StoreError::BrokenChain) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        let mut order = Vec::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            for link in chain.links(id)? {
                if !visited.contains(&link.child) {
                    stack.push(link.child);
                }
            }
        }
        Ok(order)
    }
}

impl<C: IterateInOrder> Iterator for IterativeWalker<'_, C> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        match self.chain.next_id(id) {
            Ok(next) => self.next = Some(next),
            Err(StoreError::BrokenChain) => self.next = None,
            Err(e) => return Some(Err(e)),
        }
        Some(Ok(id))
    }
}

/// A weighted random walk: each step draws a uniform `[0, 1)` sample and
/// picks the first link whose cumulative probability exceeds it.
pub struct RandomWalker<'a, C: ReadChain> {
    chain: &'a C,
    current: u64,
}

impl<'a, C: ReadChain> RandomWalker<'a, C> {
    pub fn new(chain: &'a C, start: u64) -> Self {
        Self {
            chain,
            current: start,
        }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    /// Advance one step, returning the id walked to.
    pub fn step(&mut self, rng: &mut dyn RngCore) -> Result<u64> {
        let links = self.chain.links(self.current)?;
        if links.is_empty() {
            return Err(StoreError::BrokenChain);
        }
        let sample = uniform_unit(rng);
        let mut cumulative = 0.0;
        let mut chosen = links.last().unwrap().child;
        for link in &links {
            cumulative += link.probability;
            if cumulative > sample {
                chosen = link.child;
                break;
            }
        }
        self.current = chosen;
        Ok(chosen)
    }
}

/// A uniform sample in `[0, 1)` drawn from an injected RNG.
fn uniform_unit(rng: &mut dyn RngCore) -> f64 {
    // 53 bits of mantissa precision, the same trick used throughout the
    // `rand` ecosystem for generating floats in [0, 1).
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Pick one atom uniformly at random.
///
/// Every chain implements [`RandomAtom`], but what that means differs per
/// implementation: [`crate::stores::MemoryChain`] answers in O(1) from its
/// dense id space, while [`crate::stores::DiskChain`] has no way to index
/// directly into its sparse offset-id space and falls back to
/// [`random_by_counting`] — counting the chain's length with an
/// [`IterativeWalker`], drawing a uniform index, and advancing that many
/// steps.
pub fn random<C: RandomAtom>(chain: &C, rng: &mut dyn RngCore) -> Result<u64> {
    chain.random_atom(rng)
}

/// The generic (non-`RandomAtom`) implementation of [`random`]: count the
/// chain's length, draw a uniform integer in `[0, len)`, then advance an
/// iterative walker that many steps.
pub fn random_by_counting<C: IterateInOrder>(chain: &C, rng: &mut dyn RngCore) -> Result<u64> {
    let mut walker = IterativeWalker::new(chain);
    let first = match walker.next() {
        Some(id) => id?,
        None => return Err(StoreError::BrokenChain),
    };
    let mut ids = vec![first];
    for id in walker {
        ids.push(id?);
    }
    let index = (rng.next_u64() % ids.len() as u64) as usize;
    Ok(ids[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::stores::MemoryChain;
    use crate::traits::WriteChain;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn build_ab_chain() -> MemoryChain {
        let chain = MemoryChain::new();
        let space = chain.add(Atom::Str(" ".into())).unwrap();
        let a = chain.add(Atom::Str("a".into())).unwrap();
        let b = chain.add(Atom::Str("b".into())).unwrap();
        chain.relate(space, a, 1).unwrap();
        chain.relate(a, b, 1).unwrap();
        chain.relate(b, a, 1).unwrap();
        chain
    }

    #[test]
    fn iterative_walker_visits_every_atom_once() {
        let chain = build_ab_chain();
        let ids: Vec<u64> = IterativeWalker::new(&chain).map(|r| r.unwrap()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn iterative_walker_on_empty_chain_yields_nothing() {
        let chain = MemoryChain::new();
        let ids: Vec<u64> = IterativeWalker::new(&chain).map(|r| r.unwrap()).collect();
        assert!(ids.is_empty());
    }

    #[test]
    fn random_walker_fails_on_dead_end() {
        let chain = build_ab_chain();
        let b = chain.find(&Atom::Str("b".into())).unwrap();
        // "b" only points back to "a"; walking from "a" -> "b" -> "a" -> "b" never
        // dead-ends, so instead check a deliberately disconnected atom.
        let dead = chain.add(Atom::Str("z".into())).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let mut walker = RandomWalker::new(&chain, dead);
        assert!(matches!(
            walker.step(&mut rng).unwrap_err(),
            StoreError::BrokenChain
        ));
        let mut walker = RandomWalker::new(&chain, b);
        assert!(walker.step(&mut rng).is_ok());
    }

    #[test]
    fn random_walker_weighting_converges() {
        let chain = MemoryChain::new();
        let p = chain.add(Atom::Str("p".into())).unwrap();
        let x = chain.add(Atom::Str("x".into())).unwrap();
        let y = chain.add(Atom::Str("y".into())).unwrap();
        chain.relate(p, x, 1).unwrap();
        chain.relate(p, y, 3).unwrap();

        let mut rng = SmallRng::seed_from_u64(7);
        let trials = 100_000;
        let mut x_count = 0u64;
        for _ in 0..trials {
            let mut walker = RandomWalker::new(&chain, p);
            if walker.step(&mut rng).unwrap() == x {
                x_count += 1;
            }
        }
        let freq = x_count as f64 / trials as f64;
        assert!((freq - 0.25).abs() < 0.025, "frequency was {freq}");
    }

    #[test]
    fn random_selection_uses_counting_fallback() {
        let chain = build_ab_chain();
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..50 {
            let id = random(&chain, &mut rng).unwrap();
            assert!(id < 3);
        }
    }
}
