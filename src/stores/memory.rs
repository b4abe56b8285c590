/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The in-memory chain: a dense vector of atoms and, in parallel, a vector
//! of per-atom link lists. Used as a high-throughput builder (a later pass
//! can `optimize`-copy it to disk) and as a test oracle for the disk chain.

use crate::atom::Atom;
use crate::error::{Result, StoreError};
use crate::traits::{IterateInOrder, RandomAtom, ReadChain, WriteChain};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::RwLock;

struct Inner {
    atoms: Vec<Atom>,
    /// Out-degree is typically small, so each atom's links are a flat
    /// `Vec` rather than a map, matching spec §4.7.
    links: Vec<Vec<(u64, u32)>>,
    index: HashMap<Atom, u64>,
}

/// An in-memory chain. Ids are dense: the `n`th atom added has id `n`.
pub struct MemoryChain {
    inner: RwLock<Inner>,
}

impl Default for MemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChain {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                atoms: Vec::new(),
                links: Vec::new(),
                index: HashMap::new(),
            }),
        }
    }

    /// Number of atoms currently stored.
    pub fn len(&self) -> u64 {
        self.inner.read().unwrap().atoms.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReadChain for MemoryChain {
    fn find(&self, value: &Atom) -> Result<u64> {
        self.inner
            .read()
            .unwrap()
            .index
            .get(value)
            .copied()
            .ok_or(StoreError::NotFound)
    }

    fn get(&self, id: u64) -> Result<Atom> {
        self.inner
            .read()
            .unwrap()
            .atoms
            .get(id as usize)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn raw_links(&self, id: u64) -> Result<Vec<(u64, u32)>> {
        self.inner
            .read()
            .unwrap()
            .links
            .get(id as usize)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

impl WriteChain for MemoryChain {
    fn add(&self, value: Atom) -> Result<u64> {
        let mut inner = self.inner.write().unwrap();
        if let Some(&id) = inner.index.get(&value) {
            return Ok(id);
        }
        let id = inner.atoms.len() as u64;
        inner.atoms.push(value.clone());
        inner.links.push(Vec::new());
        inner.index.insert(value, id);
        Ok(id)
    }

    fn relate(&self, parent: u64, child: u64, delta: u32) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let parent_links = inner
            .links
            .get_mut(parent as usize)
            .ok_or(StoreError::NotFound)?;
        if let Some(entry) = parent_links.iter_mut().find(|(c, _)| *c == child) {
            entry.1 = entry
                .1
                .checked_add(delta)
                .ok_or(StoreError::CountOverflow { parent })?;
        } else {
            parent_links.push((child, delta));
        }
        Ok(())
    }
}

impl IterateInOrder for MemoryChain {
    fn first_id(&self) -> Result<u64> {
        if self.inner.read().unwrap().atoms.is_empty() {
            Err(StoreError::BrokenChain)
        } else {
            Ok(0)
        }
    }

    fn next_id(&self, id: u64) -> Result<u64> {
        let len = self.inner.read().unwrap().atoms.len() as u64;
        if id + 1 < len {
            Ok(id + 1)
        } else {
            Err(StoreError::BrokenChain)
        }
    }
}

impl RandomAtom for MemoryChain {
    fn random_atom(&self, rng: &mut dyn RngCore) -> Result<u64> {
        let len = self.inner.read().unwrap().atoms.len() as u64;
        if len == 0 {
            return Err(StoreError::BrokenChain);
        }
        Ok(rng.next_u64() % len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_and_dense() {
        let chain = MemoryChain::new();
        let a = chain.add(Atom::Str("a".into())).unwrap();
        let b = chain.add(Atom::Str("b".into())).unwrap();
        let a_again = chain.add(Atom::Str("a".into())).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(a_again, a);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn relate_accumulates_and_normalizes() {
        let chain = MemoryChain::new();
        let a = chain.add(Atom::Str("a".into())).unwrap();
        let b = chain.add(Atom::Str("b".into())).unwrap();
        chain.relate(a, b, 3).unwrap();
        chain.relate(a, b, 2).unwrap();
        let links = chain.links(a).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].child, b);
        assert!((links[0].probability - 1.0).abs() < 1e-9);
        assert_eq!(chain.raw_links(a).unwrap(), vec![(b, 5)]);
    }

    #[test]
    fn next_id_breaks_at_end() {
        let chain = MemoryChain::new();
        let a = chain.add(Atom::Str("a".into())).unwrap();
        chain.add(Atom::Str("b".into())).unwrap();
        assert_eq!(chain.next_id(a).unwrap(), 1);
        assert!(matches!(chain.next_id(1).unwrap_err(), StoreError::BrokenChain));
    }
}
