/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A single on-disk entry: an atom's encoded value plus its transition
//! list's head bucket.
//!
//! A record's position, atom value, and head-bucket capacity are immutable
//! once written (spec §3 "Lifecycle"); the only thing that ever changes is
//! the transition list reachable through [`Record::links`], and those
//! mutations are written straight through the underlying
//! [`ByteFile`](crate::backends::ByteFile) by [`BucketedList`] rather than
//! buffered in the `Record` and flushed later — there is no window in which
//! an in-memory copy of a record's links can diverge from what is on disk,
//! which is simpler to reason about than the buffer-then-flush shape
//! described in the distilled design note and was one of this rewrite's
//! Open Question resolutions (see DESIGN.md).

use crate::backends::ByteFile;
use crate::bucketed_list::BucketedList;
use crate::error::{Result, StoreError};
use crate::section::{self, SectionKind};
use std::sync::Arc;

const RECORD_HEADER_LEN: u64 = 4; // value_len: u16, head_capacity: u16
const NEXT_OFFSET_LEN: u64 = 8;

/// A record read from or just written to a chain file.
pub struct Record {
    /// Offset of this record's section header.
    offset: u64,
    value: Vec<u8>,
    head_capacity: usize,
    element_size: usize,
    file: Arc<dyn ByteFile>,
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("offset", &self.offset)
            .field("value", &self.value)
            .field("head_capacity", &self.head_capacity)
            .field("element_size", &self.element_size)
            .finish_non_exhaustive()
    }
}

impl Record {
    /// Append a fully-formed record (with an empty head bucket of
    /// `head_capacity` slots of `element_size` bytes each) at the end of
    /// `file`. Returns the new record's offset.
    pub fn append(
        file: Arc<dyn ByteFile>,
        atom_bytes: &[u8],
        element_size: usize,
        head_capacity: usize,
    ) -> Result<u64> {
        if atom_bytes.len() > u16::MAX as usize || head_capacity > u16::MAX as usize {
            return Err(StoreError::CorruptRecord {
                offset: 0,
                reason: "atom value or head capacity too large for record header".into(),
            });
        }
        let head_bucket_len = NEXT_OFFSET_LEN as usize + head_capacity * element_size;
        let body_len = RECORD_HEADER_LEN as usize + atom_bytes.len() + head_bucket_len;
        let header = section::encode(SectionKind::Record, body_len as u32)?;

        let mut buf = Vec::with_capacity(4 + body_len);
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&(atom_bytes.len() as u16).to_be_bytes());
        buf.extend_from_slice(&(head_capacity as u16).to_be_bytes());
        buf.extend_from_slice(atom_bytes);
        buf.extend(std::iter::repeat(0u8).take(head_bucket_len));

        file.append(&buf)
    }

    /// Read the record section starting at `offset`.
    pub fn read(file: Arc<dyn ByteFile>, offset: u64, element_size: usize) -> Result<Record> {
        let header = file.read_at(offset, 4)?;
        let (kind, length) = section::decode(&header.try_into().unwrap())?;
        if kind != SectionKind::Record {
            return Err(StoreError::UnexpectedSectionType {
                wanted: "record",
                found: section_kind_nibble(kind),
            });
        }
        let body = file.read_at(offset + 4, length as usize)?;
        if body.len() < RECORD_HEADER_LEN as usize {
            return Err(StoreError::CorruptRecord {
                offset,
                reason: "record body shorter than its header".into(),
            });
        }
        let value_len = u16::from_be_bytes([body[0], body[1]]) as usize;
        let head_capacity = u16::from_be_bytes([body[2], body[3]]) as usize;
        let header_and_value = RECORD_HEADER_LEN as usize + value_len;
        if body.len() < header_and_value {
            return Err(StoreError::CorruptRecord {
                offset,
                reason: "record body shorter than its declared value length".into(),
            });
        }
        let value = body[RECORD_HEADER_LEN as usize..header_and_value].to_vec();

        Ok(Record {
            offset,
            value,
            head_capacity,
            element_size,
            file,
        })
    }

    /// The offset of this record's section header; this is the atom's id in
    /// a disk chain.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The total size in bytes of this record's section, including its own
    /// header, for callers that need to resume a [`RecordReader`](crate::record_reader::RecordReader) past it.
    pub fn section_len(&self) -> u64 {
        4 + RECORD_HEADER_LEN
            + self.value.len() as u64
            + NEXT_OFFSET_LEN
            + (self.head_capacity * self.element_size) as u64
    }

    /// The raw encoded atom bytes (tag + payload).
    pub fn value_bytes(&self) -> &[u8] {
        &self.value
    }

    /// The transition list rooted at this record's embedded head bucket.
    pub fn links(&self) -> BucketedList {
        let head_body_offset =
            self.offset + 4 + RECORD_HEADER_LEN + self.value.len() as u64;
        BucketedList::new(
            self.file.clone(),
            self.element_size,
            head_body_offset,
            self.head_capacity,
        )
    }
}

fn section_kind_nibble(kind: SectionKind) -> u8 {
    match kind {
        SectionKind::Record => 1,
        SectionKind::Bucket => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemBackend;

    #[test]
    fn append_then_read_roundtrips_value() {
        let file: Arc<dyn ByteFile> = Arc::new(MemBackend::new());
        let offset = Record::append(file.clone(), b"\x00hello", 12, 4).unwrap();
        let record = Record::read(file, offset, 12).unwrap();
        assert_eq!(record.value_bytes(), b"\x00hello");
        assert_eq!(record.links().len().unwrap(), 0);
    }

    #[test]
    fn read_rejects_bucket_section() {
        let file: Arc<dyn ByteFile> = Arc::new(MemBackend::new());
        let header = section::encode(SectionKind::Bucket, 8).unwrap();
        let mut buf = header.to_vec();
        buf.extend_from_slice(&0u64.to_be_bytes());
        let offset = file.append(&buf).unwrap();
        let err = Record::read(file, offset, 12).unwrap_err();
        assert!(matches!(err, StoreError::UnexpectedSectionType { .. }));
    }

    #[test]
    fn links_grow_past_head_capacity() {
        let file: Arc<dyn ByteFile> = Arc::new(MemBackend::new());
        let offset = Record::append(file.clone(), b"\x00v", 12, 1).unwrap();
        let record = Record::read(file, offset, 12).unwrap();
        let links = record.links();
        let mut elem = vec![0u8; 12];
        elem[7] = 1;
        elem[11] = 1;
        links.append(&elem).unwrap();
        let mut elem2 = vec![0u8; 12];
        elem2[7] = 2;
        elem2[11] = 1;
        links.append(&elem2).unwrap();
        assert_eq!(links.len().unwrap(), 2);
    }
}
