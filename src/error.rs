/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The error taxonomy shared by every chain implementation.
//!
//! Byte-level failures surface immediately as [`StoreError::Io`]; the rest
//! are the "logical" kinds a caller is expected to match on (lookups that
//! miss, traversals that run off the end, and so on).

use std::io;

/// Every way a chain operation can fail.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Lookup of an absent id or value.
    #[error("not found")]
    NotFound,

    /// A traversal ran off the end of the chain.
    #[error("broken chain: no outgoing link from this atom")]
    BrokenChain,

    /// The codec cannot handle a value or a decoded tag.
    #[error("unsupported atom type: {0}")]
    UnsupportedType(String),

    /// A section header's kind did not match the context it was read in.
    #[error("unexpected section type: wanted {wanted}, found {found}")]
    UnexpectedSectionType { wanted: &'static str, found: u8 },

    /// A decoded record is internally inconsistent (e.g. truncated).
    #[error("corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    /// A bucketed-list index exceeded the list's length.
    #[error("index {index} out of bounds (len {len})")]
    OutOfBounds { index: u64, len: u64 },

    /// A link count would have exceeded `u32::MAX`.
    #[error("count overflow for parent {parent}: would exceed u32::MAX")]
    CountOverflow { parent: u64 },

    /// The file's magic bytes did not match on open.
    #[error("unrecognized file: bad magic bytes")]
    UnrecognizedFile,

    /// The underlying byte medium failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, StoreError>;
