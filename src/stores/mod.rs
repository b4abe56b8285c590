/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The two chain implementations: a single-file disk store and a fast
//! in-memory builder.

mod disk;
mod memory;

pub use disk::{DiskChain, DEFAULT_HEAD_CAPACITY, ELEMENT_SIZE, MAGIC};
pub use memory::MemoryChain;
