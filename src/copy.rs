/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Cross-store copy, and the disk-specific "optimize" compaction pass.

use crate::error::Result;
use crate::stores::DiskChain;
use crate::traits::{IterateInOrder, ReadChain, WriteChain};
use log::info;
use std::collections::HashMap;
use std::path::Path;

/// Copy every atom and transition from `src` into `dst`.
///
/// Atom ids are not preserved across the copy (a memory chain's dense ids
/// and a disk chain's offsets never coincide): atoms are replayed in `src`'s
/// iteration order, and each transition's child id is translated through
/// the old-id → new-id map built along the way before being `relate`d into
/// `dst`. `dst` gets whatever head-bucket capacity its `add` implementation
/// defaults to; for an exactly-sized disk destination use [`optimize`].
pub fn copy<S, D>(src: &S, dst: &D) -> Result<()>
where
    S: ReadChain + IterateInOrder,
    D: WriteChain,
{
    let mut remap: HashMap<u64, u64> = HashMap::new();
    let order = ordered_ids(src)?;

    for &old_id in &order {
        let atom = src.get(old_id)?;
        let new_id = dst.add(atom)?;
        remap.insert(old_id, new_id);
    }
    for &old_id in &order {
        let new_parent = remap[&old_id];
        for (old_child, count) in src.raw_links(old_id)? {
            let new_child = remap[&old_child];
            dst.relate(new_parent, new_child, count)?;
        }
    }
    Ok(())
}

/// Compact-copy `src` into a fresh disk chain at `dst_path`: every record's
/// head bucket is sized to exactly that atom's current out-degree, so the
/// destination has no slack and no tail buckets (spec §4.6 "Compact copy").
pub fn optimize<S>(src: &S, dst_path: impl AsRef<Path>) -> Result<DiskChain>
where
    S: ReadChain + IterateInOrder,
{
    let dst = DiskChain::create(dst_path)?;
    let mut remap: HashMap<u64, u64> = HashMap::new();
    let order = ordered_ids(src)?;

    info!("optimize: sizing {} records", order.len());
    for (done, &old_id) in order.iter().enumerate() {
        let atom = src.get(old_id)?;
        let out_degree = src.raw_links(old_id)?.len();
        let new_id = dst.add_with_capacity(&atom, out_degree)?;
        remap.insert(old_id, new_id);
        if done % 10_000 == 0 && done > 0 {
            info!("optimize: sized {done}/{} records", order.len());
        }
    }
    for &old_id in &order {
        let new_parent = remap[&old_id];
        for (old_child, count) in src.raw_links(old_id)? {
            let new_child = remap[&old_child];
            dst.relate(new_parent, new_child, count)?;
        }
    }
    Ok(dst)
}

fn ordered_ids<S: ReadChain + IterateInOrder>(chain: &S) -> Result<Vec<u64>> {
    crate::walkers::IterativeWalker::new(chain).collect()
}
