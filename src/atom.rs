/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Tagged serialization of the chain's closed set of primitive values.
//!
//! An [`Atom`] is the unit of vocabulary a chain stores. Each variant round-trips
//! exactly through [`Atom::marshal`]/[`Atom::unmarshal`]: a one-byte tag followed
//! by a fixed or (for strings) externally-length-delimited payload, big-endian
//! throughout. See spec §4.2 / §6 for the wire tags.

use crate::error::{Result, StoreError};

/// A single value in a chain's alphabet.
///
/// `Isize`/`Usize` are the platform-native signed/unsigned integer variants;
/// they are always serialized as 64 bits so the on-disk format does not depend
/// on the writer's pointer width.
#[derive(Debug, Clone)]
pub enum Atom {
    Str(String),
    U64(u64),
    I64(i64),
    Usize(usize),
    Isize(isize),
    U32(u32),
    I32(i32),
    F32(f32),
    F64(f64),
}

const TAG_STR: u8 = 0;
const TAG_U64: u8 = 1;
const TAG_I64: u8 = 2;
const TAG_USIZE: u8 = 3;
const TAG_ISIZE: u8 = 4;
const TAG_U32: u8 = 5;
const TAG_I32: u8 = 6;
const TAG_F32: u8 = 7;
const TAG_F64: u8 = 8;

impl Atom {
    /// The one-byte tag this atom serializes with.
    pub fn tag(&self) -> u8 {
        match self {
            Atom::Str(_) => TAG_STR,
            Atom::U64(_) => TAG_U64,
            Atom::I64(_) => TAG_I64,
            Atom::Usize(_) => TAG_USIZE,
            Atom::Isize(_) => TAG_ISIZE,
            Atom::U32(_) => TAG_U32,
            Atom::I32(_) => TAG_I32,
            Atom::F32(_) => TAG_F32,
            Atom::F64(_) => TAG_F64,
        }
    }

    /// Encode this atom as tag byte + payload.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(1 + 8);
        out.push(self.tag());
        match self {
            Atom::Str(s) => out.extend_from_slice(s.as_bytes()),
            Atom::U64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Atom::I64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Atom::Usize(v) => out.extend_from_slice(&(*v as u64).to_be_bytes()),
            Atom::Isize(v) => out.extend_from_slice(&(*v as i64).to_be_bytes()),
            Atom::U32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Atom::I32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Atom::F32(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
            Atom::F64(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
        }
        Ok(out)
    }

    /// Decode a tag byte + payload previously produced by [`Atom::marshal`].
    pub fn unmarshal(buf: &[u8]) -> Result<Atom> {
        let (&tag, payload) = buf
            .split_first()
            .ok_or_else(|| StoreError::UnsupportedType("empty buffer".into()))?;

        let need = |n: usize| -> Result<&[u8]> {
            if payload.len() < n {
                return Err(StoreError::CorruptRecord {
                    offset: 0,
                    reason: format!("truncated atom payload: need {n}, have {}", payload.len()),
                });
            }
            Ok(&payload[..n])
        };

        Ok(match tag {
            TAG_STR => Atom::Str(
                std::str::from_utf8(payload)
                    .map_err(|e| StoreError::CorruptRecord {
                        offset: 0,
                        reason: format!("invalid utf-8: {e}"),
                    })?
                    .to_owned(),
            ),
            TAG_U64 => Atom::U64(u64::from_be_bytes(need(8)?.try_into().unwrap())),
            TAG_I64 => Atom::I64(i64::from_be_bytes(need(8)?.try_into().unwrap())),
            TAG_USIZE => Atom::Usize(u64::from_be_bytes(need(8)?.try_into().unwrap()) as usize),
            TAG_ISIZE => Atom::Isize(i64::from_be_bytes(need(8)?.try_into().unwrap()) as isize),
            TAG_U32 => Atom::U32(u32::from_be_bytes(need(4)?.try_into().unwrap())),
            TAG_I32 => Atom::I32(i32::from_be_bytes(need(4)?.try_into().unwrap())),
            TAG_F32 => Atom::F32(f32::from_bits(u32::from_be_bytes(
                need(4)?.try_into().unwrap(),
            ))),
            TAG_F64 => Atom::F64(f64::from_bits(u64::from_be_bytes(
                need(8)?.try_into().unwrap(),
            ))),
            other => return Err(StoreError::UnsupportedType(format!("tag {other}"))),
        })
    }
}

/// Hashing/equality must descend into tag + payload so `Atom` behaves like a
/// value type in the value→id index, the same way the teacher's `Successor`
/// wrapper (graph/vec_graph.rs) hand-rolls `Eq`/`Ord` to get set semantics for
/// a type whose natural derive would be wrong (floats have no total order;
/// here floats are keyed by bit pattern, which is exact and total).
impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        use Atom::*;
        match (self, other) {
            (Str(a), Str(b)) => a == b,
            (U64(a), U64(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (Usize(a), Usize(b)) => a == b,
            (Isize(a), Isize(b)) => a == b,
            (U32(a), U32(b)) => a == b,
            (I32(a), I32(b)) => a == b,
            (F32(a), F32(b)) => a.to_bits() == b.to_bits(),
            (F64(a), F64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Atom {}

impl std::hash::Hash for Atom {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use Atom::*;
        self.tag().hash(state);
        match self {
            Str(s) => s.hash(state),
            U64(v) => v.hash(state),
            I64(v) => v.hash(state),
            Usize(v) => v.hash(state),
            Isize(v) => v.hash(state),
            U32(v) => v.hash(state),
            I32(v) => v.hash(state),
            F32(v) => v.to_bits().hash(state),
            F64(v) => v.to_bits().hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(a: Atom) {
        let bytes = a.marshal().unwrap();
        let back = Atom::unmarshal(&bytes).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn roundtrips_every_variant() {
        roundtrip(Atom::Str("some words".into()));
        roundtrip(Atom::Str("∈💾".into()));
        roundtrip(Atom::U64(0));
        roundtrip(Atom::U64(1 << 32));
        roundtrip(Atom::I64(-1));
        roundtrip(Atom::I64(i64::MAX));
        roundtrip(Atom::I64(i64::MIN));
        roundtrip(Atom::Usize(1));
        roundtrip(Atom::Isize(-1));
        roundtrip(Atom::U32(0));
        roundtrip(Atom::U32(u32::MAX));
        roundtrip(Atom::I32(-1));
        roundtrip(Atom::F32(f32::MAX));
        roundtrip(Atom::F32(f32::MIN_POSITIVE));
        roundtrip(Atom::F64(f64::MIN_POSITIVE));
        roundtrip(Atom::F64(0.0));
    }

    #[test]
    fn unmarshal_rejects_unknown_tag() {
        let err = Atom::unmarshal(&[0xff]).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedType(_)));
    }

    #[test]
    fn unmarshal_rejects_truncated_payload() {
        let err = Atom::unmarshal(&[TAG_U64, 0, 0]).unwrap_err();
        assert!(matches!(err, StoreError::CorruptRecord { .. }));
    }

    #[test]
    fn equal_values_hash_equal() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Atom::Str("a".into()));
        assert!(!set.insert(Atom::Str("a".into())));
        assert!(set.insert(Atom::Str("b".into())));
    }
}
