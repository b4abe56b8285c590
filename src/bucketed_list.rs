/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A linked list of fixed-capacity, fixed-slot-size buckets.
//!
//! The head bucket is embedded in its owning [`Record`](crate::record::Record)
//! and has no section header of its own (its capacity comes from the
//! record header); tail buckets are full-blown bucket *sections*, appended at
//! EOF and linked from the previous tail's next-offset field. A slot is
//! "empty" iff every byte in it is zero, which is why every element encoding
//! used with this list must guarantee a non-zero encoding for real entries
//! (the disk chain's `(child id, count)` link pairs a non-zero child offset
//! with a non-zero count, which pairs with them satisfying this).

use crate::backends::ByteFile;
use crate::error::{Result, StoreError};
use crate::section::{self, SectionKind};
use std::sync::Arc;

const NEXT_OFFSET_LEN: u64 = 8;

/// One bucket: its body offset (where the 8-byte next pointer starts), its
/// element capacity, and the offset it links to (0 means "no next bucket").
struct Bucket {
    body_offset: u64,
    capacity: usize,
    next_offset: u64,
}

/// A bucketed transition list living on a [`ByteFile`].
///
/// `element_size` is the fixed width of each slot in bytes. The head bucket's
/// body starts at `head_body_offset` with `head_capacity` slots; any
/// subsequent buckets are discovered by following next-offset pointers and
/// decoding each as a bucket section.
pub struct BucketedList {
    file: Arc<dyn ByteFile>,
    element_size: usize,
    head_body_offset: u64,
    head_capacity: usize,
}

impl BucketedList {
    pub fn new(
        file: Arc<dyn ByteFile>,
        element_size: usize,
        head_body_offset: u64,
        head_capacity: usize,
    ) -> Self {
        Self {
            file,
            element_size,
            head_body_offset,
            head_capacity,
        }
    }

    fn head(&self) -> Result<Bucket> {
        let next = self.read_next_offset(self.head_body_offset)?;
        Ok(Bucket {
            body_offset: self.head_body_offset,
            capacity: self.head_capacity,
            next_offset: next,
        })
    }

    fn read_next_offset(&self, body_offset: u64) -> Result<u64> {
        let bytes = self.file.read_at(body_offset, NEXT_OFFSET_LEN as usize)?;
        Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
    }

    /// Decode the bucket section whose section header starts at `section_offset`.
    fn read_tail_bucket(&self, section_offset: u64) -> Result<Bucket> {
        let header = self.file.read_at(section_offset, 4)?;
        let (kind, length) = section::decode(&header.try_into().unwrap())?;
        if kind != SectionKind::Bucket {
            return Err(StoreError::UnexpectedSectionType {
                wanted: "bucket",
                found: kind.as_nibble(),
            });
        }
        let body_offset = section_offset + 4;
        let capacity = (length as u64 - NEXT_OFFSET_LEN) as usize / self.element_size;
        let next = self.read_next_offset(body_offset)?;
        Ok(Bucket {
            body_offset,
            capacity,
            next_offset: next,
        })
    }

    fn slot_offset(&self, bucket: &Bucket, slot: usize) -> u64 {
        bucket.body_offset + NEXT_OFFSET_LEN + (slot * self.element_size) as u64
    }

    fn is_empty_slot(bytes: &[u8]) -> bool {
        bytes.iter().all(|&b| b == 0)
    }

    /// Walk the bucket chain, returning the last (tail) bucket.
    fn walk_to_tail(&self) -> Result<Bucket> {
        let mut bucket = self.head()?;
        while bucket.next_offset != 0 {
            bucket = self.read_tail_bucket(bucket.next_offset)?;
        }
        Ok(bucket)
    }

    /// Walk the bucket chain to find the bucket holding element `index`,
    /// returning it along with the slot within that bucket.
    ///
    /// Buckets are not assumed to share a uniform capacity: `optimize` can
    /// give a record a zero-capacity head (a sink atom has no links to size
    /// for), and growth past it allocates tail buckets with their own
    /// capacity, so the simple `index / head_capacity` arithmetic this used
    /// to do would divide by zero for such a record. Every bucket but the
    /// tail is always completely full (append only ever opens a new bucket
    /// once the current one is full), so summing capacities while walking
    /// is enough to locate the right one.
    fn locate(&self, index: u64) -> Result<(Bucket, usize)> {
        let mut bucket = self.head()?;
        let mut base = 0u64;
        loop {
            let capacity = bucket.capacity as u64;
            if index < base + capacity {
                return Ok((bucket, (index - base) as usize));
            }
            if bucket.next_offset == 0 {
                return Err(StoreError::OutOfBounds { index, len: base + capacity });
            }
            base += capacity;
            bucket = self.read_tail_bucket(bucket.next_offset)?;
        }
    }

    /// Number of elements currently stored: the sum of every full bucket's
    /// capacity plus the tail's scanned popcount.
    pub fn len(&self) -> Result<u64> {
        let mut bucket = self.head()?;
        let mut total = 0u64;
        loop {
            if bucket.next_offset == 0 {
                let popcount = self.tail_popcount(&bucket)?;
                return Ok(total + popcount as u64);
            }
            total += bucket.capacity as u64;
            bucket = self.read_tail_bucket(bucket.next_offset)?;
        }
    }

    /// Whether the list currently holds no elements.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn tail_popcount(&self, tail: &Bucket) -> Result<usize> {
        for slot in 0..tail.capacity {
            let bytes = self.file.read_at(self.slot_offset(tail, slot), self.element_size)?;
            if Self::is_empty_slot(&bytes) {
                return Ok(slot);
            }
        }
        Ok(tail.capacity)
    }

    /// Fetch element `i`. Fails with [`StoreError::OutOfBounds`] if `i >= len()`.
    pub fn get(&self, i: u64) -> Result<Vec<u8>> {
        let len = self.len()?;
        if i >= len {
            return Err(StoreError::OutOfBounds { index: i, len });
        }
        let (bucket, slot) = self.locate(i)?;
        self.file.read_at(self.slot_offset(&bucket, slot), self.element_size)
    }

    /// Overwrite element `i` in place. Used to bump a transition's count
    /// without growing the list.
    pub fn set(&self, i: u64, elem: &[u8]) -> Result<()> {
        debug_assert_eq!(elem.len(), self.element_size);
        let len = self.len()?;
        if i >= len {
            return Err(StoreError::OutOfBounds { index: i, len });
        }
        let (bucket, slot) = self.locate(i)?;
        self.file.write_at(self.slot_offset(&bucket, slot), elem)?;
        Ok(())
    }

    /// Append `elem` (must be exactly `element_size` bytes and non-zero) to
    /// the list, growing with a new bucket if the current tail is full.
    pub fn append(&self, elem: &[u8]) -> Result<()> {
        debug_assert_eq!(elem.len(), self.element_size);
        let mut tail = self.walk_to_tail()?;
        let mut free_slot = None;
        for slot in 0..tail.capacity {
            let bytes = self.file.read_at(self.slot_offset(&tail, slot), self.element_size)?;
            if Self::is_empty_slot(&bytes) {
                free_slot = Some(slot);
                break;
            }
        }
        let slot = match free_slot {
            Some(s) => s,
            None => {
                // A zero-capacity tail (e.g. an `optimize`d sink atom's
                // never-grown head) has no full slot to find above and
                // lands here on the very first append; propagating its
                // capacity forward would allocate another zero-capacity
                // bucket and repeat forever while silently dropping the
                // element, since a 0-slot bucket has nowhere to write it.
                let new_capacity = tail.capacity.max(1);
                let new_offset = self.allocate_bucket(new_capacity)?;
                self.file.write_at(tail.body_offset, &new_offset.to_be_bytes())?;
                tail = self.read_tail_bucket(new_offset)?;
                0
            }
        };
        self.file.write_at(self.slot_offset(&tail, slot), elem)?;
        Ok(())
    }

    /// Allocate a new, empty tail bucket with the given capacity and return
    /// its section offset.
    fn allocate_bucket(&self, capacity: usize) -> Result<u64> {
        let body_len = NEXT_OFFSET_LEN as usize + capacity * self.element_size;
        let header = section::encode(SectionKind::Bucket, body_len as u32)?;
        let mut buf = Vec::with_capacity(4 + body_len);
        buf.extend_from_slice(&header);
        buf.extend(std::iter::repeat(0u8).take(body_len));
        self.file.append(&buf)
    }

    /// Iterate over all non-empty elements in insertion order.
    pub fn iter(&self) -> Result<Vec<Vec<u8>>> {
        let len = self.len()?;
        let mut out = Vec::with_capacity(len as usize);
        for i in 0..len {
            out.push(self.get(i)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemBackend;

    fn elem(child: u64, count: u32) -> Vec<u8> {
        let mut v = Vec::with_capacity(12);
        v.extend_from_slice(&child.to_be_bytes());
        v.extend_from_slice(&count.to_be_bytes());
        v
    }

    fn fresh_list(head_capacity: usize) -> (Arc<dyn ByteFile>, BucketedList) {
        let file: Arc<dyn ByteFile> = Arc::new(MemBackend::new());
        let body_len = 8 + head_capacity * 12;
        file.append(&vec![0u8; body_len]).unwrap();
        let list = BucketedList::new(file.clone(), 12, 0, head_capacity);
        (file, list)
    }

    #[test]
    fn append_and_get_within_head_bucket() {
        let (_f, list) = fresh_list(4);
        list.append(&elem(1, 10)).unwrap();
        list.append(&elem(2, 20)).unwrap();
        assert_eq!(list.len().unwrap(), 2);
        assert_eq!(list.get(0).unwrap(), elem(1, 10));
        assert_eq!(list.get(1).unwrap(), elem(2, 20));
        assert!(list.get(2).is_err());
    }

    #[test]
    fn append_grows_into_new_bucket() {
        let (_f, list) = fresh_list(2);
        list.append(&elem(1, 1)).unwrap();
        list.append(&elem(2, 2)).unwrap();
        // head is full; this one must spill into a new tail bucket.
        list.append(&elem(3, 3)).unwrap();
        assert_eq!(list.len().unwrap(), 3);
        assert_eq!(list.get(2).unwrap(), elem(3, 3));
    }

    #[test]
    fn iter_returns_insertion_order() {
        let (_f, list) = fresh_list(2);
        for i in 1..=5u64 {
            list.append(&elem(i, i as u32)).unwrap();
        }
        let all = list.iter().unwrap();
        assert_eq!(all.len(), 5);
        for (i, e) in all.iter().enumerate() {
            assert_eq!(e, &elem(i as u64 + 1, i as u32 + 1));
        }
    }

    #[test]
    fn zero_capacity_head_reports_empty_and_accepts_a_later_append() {
        // What `optimize` builds for a sink atom: a head bucket sized for
        // the out-degree it had at optimize time, which can be 0.
        let (_f, list) = fresh_list(0);
        assert_eq!(list.len().unwrap(), 0);
        assert!(list.is_empty().unwrap());

        // A later `relate` into that record (e.g. reopening an optimized
        // chain with `--update`) must still be able to grow it.
        list.append(&elem(1, 1)).unwrap();
        assert_eq!(list.len().unwrap(), 1);
        assert_eq!(list.get(0).unwrap(), elem(1, 1));

        list.append(&elem(2, 1)).unwrap();
        assert_eq!(list.len().unwrap(), 2);
        assert_eq!(list.get(1).unwrap(), elem(2, 1));
    }

    #[test]
    fn mixed_bucket_capacities_index_correctly() {
        // Head capacity 1, so the first growth bucket also gets capacity 1
        // (propagated forward), exercising `locate`'s per-bucket walk
        // rather than any single uniform stride.
        let (_f, list) = fresh_list(1);
        for i in 1..=4u64 {
            list.append(&elem(i, i as u32)).unwrap();
        }
        assert_eq!(list.len().unwrap(), 4);
        for i in 0..4u64 {
            assert_eq!(list.get(i).unwrap(), elem(i + 1, i as u32 + 1));
        }
    }
}
