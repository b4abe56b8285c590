/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The on-disk chain store: a single-file container of atoms plus their
//! outgoing-transition tables, with an in-memory value→offset index.
//!
//! Grounded on the teacher's `graphs/bvgraph/load.rs` (open-and-validate a
//! file, then build auxiliary structures by a sequential pass) and on the
//! reader/writer split in `utils/par_sort_graph.rs` for the locking shape.

use crate::atom::Atom;
use crate::backends::{ByteFile, FileBackend};
use crate::error::{Result, StoreError};
use crate::record::Record;
use crate::record_reader::RecordReader;
use crate::traits::{IterateInOrder, RandomAtom, ReadChain, WriteChain};
use log::{debug, trace};
use rand::RngCore;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

/// `M K V 0x01`.
pub const MAGIC: [u8; 4] = *b"MKV\x01";
const MAGIC_LEN: u64 = MAGIC.len() as u64;

/// `(u64 child id, u32 count)`, both big-endian: the fixed element encoding
/// used by every disk chain's transition lists.
pub const ELEMENT_SIZE: usize = 12;

/// Head-bucket capacity given to freshly `add`ed atoms. Chosen so the first
/// few transitions of a typical word or token fit without spilling to a
/// tail bucket; `optimize` later sizes each record's head bucket exactly.
pub const DEFAULT_HEAD_CAPACITY: usize = 4;

fn encode_link(child: u64, count: u32) -> [u8; ELEMENT_SIZE] {
    let mut out = [0u8; ELEMENT_SIZE];
    out[..8].copy_from_slice(&child.to_be_bytes());
    out[8..].copy_from_slice(&count.to_be_bytes());
    out
}

fn decode_link(bytes: &[u8]) -> (u64, u32) {
    let child = u64::from_be_bytes(bytes[..8].try_into().unwrap());
    let count = u32::from_be_bytes(bytes[8..].try_into().unwrap());
    (child, count)
}

/// A chain persisted in a single random-access file.
///
/// `find` and `get`/`links` take the index's read lock and can run
/// concurrently with each other; `add` takes the write lock for the
/// duration of its check-then-insert so two concurrent adds of the same new
/// value cannot create two records. `relate` additionally takes a single
/// global `write_lock` mutex for its read-modify-write of a parent's
/// transition list, per spec §4.6: the reference design does not attempt to
/// prove independence between relates to different parents, so all relates
/// are serialized.
pub struct DiskChain {
    file: Arc<dyn ByteFile>,
    index: RwLock<HashMap<Atom, u64>>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for DiskChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskChain").finish_non_exhaustive()
    }
}

impl DiskChain {
    /// Truncate (or create) the file at `path` and initialize an empty chain.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let file: Arc<dyn ByteFile> = Arc::new(FileBackend::new(file));
        file.append(&MAGIC)?;
        Ok(Self {
            file,
            index: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        })
    }

    /// Open an existing chain file, rebuilding the value→offset index by
    /// scanning every record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;
        let file: Arc<dyn ByteFile> = Arc::new(FileBackend::new(file));
        Self::open_on(file)
    }

    fn open_on(file: Arc<dyn ByteFile>) -> Result<Self> {
        let magic = file.read_at(0, MAGIC.len())?;
        if magic != MAGIC {
            return Err(StoreError::UnrecognizedFile);
        }
        let mut index = HashMap::new();
        for record in RecordReader::new(file.clone(), MAGIC_LEN, ELEMENT_SIZE) {
            let record = record?;
            let atom = Atom::unmarshal(record.value_bytes())?;
            index.insert(atom, record.offset());
        }
        debug!("opened disk chain with {} atoms", index.len());
        Ok(Self {
            file,
            index: RwLock::new(index),
            write_lock: Mutex::new(()),
        })
    }

    fn resolve_id(id: u64) -> u64 {
        if id == 0 {
            MAGIC_LEN
        } else {
            id
        }
    }

    fn read_record(&self, id: u64) -> Result<Record> {
        let offset = Self::resolve_id(id);
        Record::read(self.file.clone(), offset, ELEMENT_SIZE).map_err(|e| match e {
            StoreError::UnexpectedSectionType { .. } => StoreError::CorruptRecord {
                offset,
                reason: "id does not reference a record section".into(),
            },
            other => other,
        })
    }

    /// Append a fresh record whose head bucket has exactly `head_capacity`
    /// slots, bypassing the idempotent `find`-then-`add` path. Used by
    /// [`crate::copy::optimize`] to build a compacted destination chain.
    pub fn add_with_capacity(&self, value: &Atom, head_capacity: usize) -> Result<u64> {
        let mut index = self.index.write().unwrap();
        let atom_bytes = value.marshal()?;
        let offset = Record::append(self.file.clone(), &atom_bytes, ELEMENT_SIZE, head_capacity)?;
        index.insert(value.clone(), offset);
        Ok(offset)
    }
}

impl ReadChain for DiskChain {
    fn find(&self, value: &Atom) -> Result<u64> {
        self.index
            .read()
            .unwrap()
            .get(value)
            .copied()
            .ok_or(StoreError::NotFound)
    }

    fn get(&self, id: u64) -> Result<Atom> {
        let record = self.read_record(id)?;
        Atom::unmarshal(record.value_bytes())
    }

    fn raw_links(&self, id: u64) -> Result<Vec<(u64, u32)>> {
        let record = self.read_record(id)?;
        record
            .links()
            .iter()?
            .into_iter()
            .map(|bytes| Ok(decode_link(&bytes)))
            .collect()
    }
}

impl WriteChain for DiskChain {
    fn add(&self, value: Atom) -> Result<u64> {
        {
            let index = self.index.read().unwrap();
            if let Some(&id) = index.get(&value) {
                return Ok(id);
            }
        }
        let mut index = self.index.write().unwrap();
        // Re-check: another writer may have inserted the same value while we
        // waited for the write lock.
        if let Some(&id) = index.get(&value) {
            return Ok(id);
        }
        let atom_bytes = value.marshal()?;
        let offset = Record::append(self.file.clone(), &atom_bytes, ELEMENT_SIZE, DEFAULT_HEAD_CAPACITY)?;
        index.insert(value, offset);
        Ok(offset)
    }

    fn relate(&self, parent: u64, child: u64, delta: u32) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let parent_offset = Self::resolve_id(parent);
        let child_offset = Self::resolve_id(child);
        let record = self.read_record(parent_offset)?;
        let links = record.links();
        let existing = links.iter()?;
        for (i, bytes) in existing.iter().enumerate() {
            let (existing_child, existing_count) = decode_link(bytes);
            if existing_child == child_offset {
                let new_count = existing_count.checked_add(delta).ok_or(StoreError::CountOverflow {
                    parent: parent_offset,
                })?;
                links.set(i as u64, &encode_link(child_offset, new_count))?;
                trace!("relate {parent_offset} -> {child_offset}: {existing_count} -> {new_count}");
                return Ok(());
            }
        }
        links.append(&encode_link(child_offset, delta))?;
        trace!("relate {parent_offset} -> {child_offset}: new link, count {delta}");
        Ok(())
    }
}

impl IterateInOrder for DiskChain {
    fn first_id(&self) -> Result<u64> {
        if self.file.len()? <= MAGIC_LEN {
            return Err(StoreError::BrokenChain);
        }
        // The real offset of the first record, not the `id == 0` input
        // sentinel `resolve_id` accepts: every id this store *hands back*
        // (`find`, `add`, `next_id`, ...) is a real byte offset, and the
        // first record's offset is `MAGIC_LEN`, never 0. Returning the
        // sentinel here would hand callers (e.g. `raw_links`'s child ids,
        // which are never resolved) an id that doesn't match the id space
        // everything else uses for the same atom.
        Ok(MAGIC_LEN)
    }

    fn next_id(&self, id: u64) -> Result<u64> {
        let current = self.read_record(id)?;
        let next_pos = current.offset() + current.section_len();
        let mut reader = RecordReader::new(self.file.clone(), next_pos, ELEMENT_SIZE);
        match reader.next() {
            Some(Ok(next)) => Ok(next.offset()),
            Some(Err(e)) => Err(e),
            None => Err(StoreError::BrokenChain),
        }
    }
}

impl RandomAtom for DiskChain {
    fn random_atom(&self, rng: &mut dyn RngCore) -> Result<u64> {
        crate::walkers::random_by_counting(self, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn feed_ab(chain: &DiskChain) {
        let space = chain.add(Atom::Str(" ".into())).unwrap();
        let a = chain.add(Atom::Str("a".into())).unwrap();
        let b = chain.add(Atom::Str("b".into())).unwrap();
        for (p, c) in [(space, a), (a, b), (b, a), (a, b)] {
            chain.relate(p, c, 1).unwrap();
        }
    }

    #[test]
    fn s1_single_step_probabilities() {
        let dir = tempdir().unwrap();
        let chain = DiskChain::create(dir.path().join("s1.chain")).unwrap();
        feed_ab(&chain);

        let space = chain.find(&Atom::Str(" ".into())).unwrap();
        let a = chain.find(&Atom::Str("a".into())).unwrap();
        let b = chain.find(&Atom::Str("b".into())).unwrap();

        let space_links = chain.links(space).unwrap();
        assert_eq!(space_links.len(), 1);
        assert_eq!(space_links[0].child, a);
        assert!((space_links[0].probability - 1.0).abs() < 1e-9);

        let a_links = chain.links(a).unwrap();
        assert_eq!(a_links.len(), 1);
        assert_eq!(a_links[0].child, b);
        assert!((a_links[0].probability - 1.0).abs() < 1e-9);

        let b_links = chain.links(b).unwrap();
        assert_eq!(b_links.len(), 1);
        assert_eq!(b_links[0].child, a);
        assert!((b_links[0].probability - 1.0).abs() < 1e-9);
    }

    #[test]
    fn add_is_idempotent() {
        let dir = tempdir().unwrap();
        let chain = DiskChain::create(dir.path().join("idem.chain")).unwrap();
        let id1 = chain.add(Atom::Str("x".into())).unwrap();
        let id2 = chain.add(Atom::Str("x".into())).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn relate_accumulates_counts() {
        let dir = tempdir().unwrap();
        let chain = DiskChain::create(dir.path().join("rel.chain")).unwrap();
        let a = chain.add(Atom::Str("a".into())).unwrap();
        let b = chain.add(Atom::Str("b".into())).unwrap();
        chain.relate(a, b, 3).unwrap();
        chain.relate(a, b, 4).unwrap();
        let links = chain.raw_links(a).unwrap();
        assert_eq!(links, vec![(b, 7)]);
    }

    #[test]
    fn relate_reports_count_overflow() {
        let dir = tempdir().unwrap();
        let chain = DiskChain::create(dir.path().join("overflow.chain")).unwrap();
        let a = chain.add(Atom::Str("a".into())).unwrap();
        let b = chain.add(Atom::Str("b".into())).unwrap();
        chain.relate(a, b, u32::MAX).unwrap();
        let err = chain.relate(a, b, 1).unwrap_err();
        assert!(matches!(err, StoreError::CountOverflow { .. }));
    }

    #[test]
    fn get_unknown_id_is_corrupt_record() {
        let dir = tempdir().unwrap();
        let chain = DiskChain::create(dir.path().join("g.chain")).unwrap();
        chain.add(Atom::Str("a".into())).unwrap();
        // offset 2 lands inside the magic header, not on a section boundary.
        let err = chain.get(2).unwrap_err();
        assert!(matches!(err, StoreError::CorruptRecord { .. } | StoreError::Io(_)));
    }

    #[test]
    fn open_rejects_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.chain");
        std::fs::write(&path, b"nope").unwrap();
        let err = DiskChain::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::UnrecognizedFile));
    }

    #[test]
    fn next_id_walks_file_order_and_errors_at_eof() {
        let dir = tempdir().unwrap();
        let chain = DiskChain::create(dir.path().join("walk.chain")).unwrap();
        let a = chain.add(Atom::Str("a".into())).unwrap();
        let b = chain.add(Atom::Str("b".into())).unwrap();
        assert_eq!(chain.next_id(a).unwrap(), b);
        assert!(matches!(chain.next_id(b).unwrap_err(), StoreError::BrokenChain));
    }

    #[test]
    fn s9_reopen_preserves_atoms_links_and_counts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.chain");
        {
            let chain = DiskChain::create(&path).unwrap();
            feed_ab(&chain);
        }
        let chain = DiskChain::open(&path).unwrap();
        let a = chain.find(&Atom::Str("a".into())).unwrap();
        let b = chain.find(&Atom::Str("b".into())).unwrap();
        assert_eq!(chain.raw_links(a).unwrap(), vec![(b, 2)]);
        assert_eq!(chain.raw_links(b).unwrap(), vec![(a, 1)]);
    }
}
