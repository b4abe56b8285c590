/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Random-access byte storage backends.

mod byte_file;

pub use byte_file::{ByteFile, FileBackend, MemBackend};
