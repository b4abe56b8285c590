/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Public chain contracts.

mod chain;

pub use chain::{IterateInOrder, Link, RandomAtom, ReadChain, WriteChain};
