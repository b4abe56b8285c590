/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Forward iteration over every record in a chain file.
//!
//! Walks section headers rather than assuming records are contiguous:
//! bucket sections (externally-allocated transition-list tails) are skipped
//! transparently, so callers never need to know where a record's links
//! spilled to.

use crate::backends::ByteFile;
use crate::error::Result;
use crate::record::Record;
use crate::section::{self, SectionKind};
use std::sync::Arc;

/// Iterates over record sections in file order, starting at `offset`
/// (typically just past the magic header).
pub struct RecordReader {
    file: Arc<dyn ByteFile>,
    pos: u64,
    element_size: usize,
}

impl RecordReader {
    pub fn new(file: Arc<dyn ByteFile>, offset: u64, element_size: usize) -> Self {
        Self {
            file,
            pos: offset,
            element_size,
        }
    }
}

impl Iterator for RecordReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let len = match self.file.len() {
                Ok(len) => len,
                Err(e) => return Some(Err(e)),
            };
            if self.pos >= len {
                return None;
            }

            let header = match self.file.read_at(self.pos, 4) {
                Ok(h) => h,
                Err(e) => return Some(Err(e)),
            };
            let (kind, length) = match section::decode(&header.try_into().unwrap()) {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };

            match kind {
                SectionKind::Record => {
                    let record = match Record::read(self.file.clone(), self.pos, self.element_size) {
                        Ok(r) => r,
                        Err(e) => return Some(Err(e)),
                    };
                    self.pos += record.section_len();
                    return Some(Ok(record));
                }
                SectionKind::Bucket => {
                    self.pos += 4 + length as u64;
                    continue;
                }
            }
        }
    }
}
