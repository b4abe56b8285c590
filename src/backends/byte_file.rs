/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A thin abstraction over a random-access byte medium.
//!
//! Grounded on the teacher's `FileBackend`/`WordStream` split
//! (`backends/file_backend.rs`), but positional rather than cursor-based:
//! records are read and written at arbitrary offsets by concurrent callers,
//! so every method here takes an explicit offset and a single mutex
//! serializes the underlying seek with its paired read or write.

use crate::error::Result;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

/// Random-access read/write over a seekable byte medium.
///
/// All methods are safe under concurrent callers: implementations serialize
/// the seek-then-read/write pair behind a single lock so positional
/// operations are atomic with respect to other operations on the same file.
pub trait ByteFile: Send + Sync {
    /// Current length of the medium in bytes.
    fn len(&self) -> Result<u64>;

    /// Read exactly `len` bytes starting at `offset`.
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Write `buf` at the absolute offset `offset`, returning `offset`.
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<u64>;

    /// Append `buf` at the current end of the medium, returning the offset
    /// it was written at.
    fn append(&self, buf: &[u8]) -> Result<u64>;
}

/// A [`ByteFile`] backed by a real [`std::fs::File`].
pub struct FileBackend {
    file: Mutex<std::fs::File>,
}

impl FileBackend {
    pub fn new(file: std::fs::File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }
}

impl ByteFile for FileBackend {
    fn len(&self) -> Result<u64> {
        let mut f = self.file.lock().unwrap();
        Ok(f.seek(SeekFrom::End(0))?)
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut f = self.file.lock().unwrap();
        f.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<u64> {
        let mut f = self.file.lock().unwrap();
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(buf)?;
        Ok(offset)
    }

    fn append(&self, buf: &[u8]) -> Result<u64> {
        let mut f = self.file.lock().unwrap();
        let offset = f.seek(SeekFrom::End(0))?;
        f.write_all(buf)?;
        Ok(offset)
    }
}

/// A [`ByteFile`] backed by an in-memory buffer, used by tests and by tools
/// that build a chain in memory before copying it to disk.
#[derive(Default)]
pub struct MemBackend {
    data: Mutex<Vec<u8>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteFile for MemBackend {
    fn len(&self) -> Result<u64> {
        Ok(self.data.lock().unwrap().len() as u64)
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let data = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + len;
        if end > data.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "read past end of in-memory buffer",
            )
            .into());
        }
        Ok(data[start..end].to_vec())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<u64> {
        let mut data = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(offset)
    }

    fn append(&self, buf: &[u8]) -> Result<u64> {
        let mut data = self.data.lock().unwrap();
        let offset = data.len() as u64;
        data.extend_from_slice(buf);
        Ok(offset)
    }
}
