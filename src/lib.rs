/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(trivial_casts)]

//! A persistent, random-access store for first-order Markov chains over a
//! heterogeneously-typed atom alphabet (strings, integers of several
//! widths, floats).
//!
//! The store lives in a single file: a 4-byte magic header followed by an
//! append-only sequence of records, each pairing an atom's encoded value
//! with a bucketed linked list of its outgoing transitions. See
//! [`stores::DiskChain`] for the file format and [`stores::MemoryChain`] for
//! the in-memory equivalent used as a fast builder and test oracle.

pub mod atom;
pub mod backends;
pub mod bucketed_list;
pub mod copy;
pub mod error;
pub mod feeder;
pub mod record;
pub mod record_reader;
pub mod section;
pub mod stores;
pub mod traits;
pub mod walkers;

/// Re-exports of the pieces most callers need.
pub mod prelude {
    pub use crate::atom::Atom;
    pub use crate::copy::{copy, optimize};
    pub use crate::error::{Result, StoreError};
    pub use crate::feeder::feed;
    pub use crate::stores::{DiskChain, MemoryChain};
    pub use crate::traits::{IterateInOrder, Link, RandomAtom, ReadChain, WriteChain};
    pub use crate::walkers::{random, IterativeWalker, RandomWalker};
}
