//! Bit-packed boolean sequences.
//!
//! Wire form: the element count as a sequence prefix, then `ceil(n / 64)`
//! `u64` blocks. Element `i` lives in block `i / 64` at bit `i % 64`,
//! counting from the least significant bit. Bits past the end of the
//! sequence are zero.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::de::{self, DeserializeSeed, SeqAccess, Visitor};
use serde::ser::{self, SerializeTuple};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ser_de::consts::{SeqSizePrefix, BOOL_BLOCK_BITS, SEQ_LEN_TOKEN};

/// A sequence of booleans that encodes 64 elements per `u64` block.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BoolVec(Vec<bool>);

impl BoolVec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<bool> {
        self.0
    }
}

impl From<Vec<bool>> for BoolVec {
    fn from(v: Vec<bool>) -> Self {
        Self(v)
    }
}

impl FromIterator<bool> for BoolVec {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Deref for BoolVec {
    type Target = Vec<bool>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for BoolVec {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

// renders like a plain list: `[true, false]`
impl fmt::Debug for BoolVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// Pack booleans into blocks, least significant bit first.
pub fn pack_bools(xs: &[bool]) -> Vec<u64> {
    xs.chunks(BOOL_BLOCK_BITS)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .filter(|(_, set)| **set)
                .fold(0_u64, |block, (bit, _)| block | (1 << bit))
        })
        .collect()
}

/// Unpack `len` booleans from blocks.
///
/// Returns `None` if the block count does not match `len` or a padding bit is set.
pub fn unpack_bools(blocks: &[u64], len: usize) -> Option<Vec<bool>> {
    if blocks.len() != len.div_ceil(BOOL_BLOCK_BITS) {
        return None;
    }

    let tail = len % BOOL_BLOCK_BITS;
    if let (Some(last), true) = (blocks.last(), tail != 0) {
        if *last >> tail != 0 {
            return None;
        }
    }

    Some(
        (0..len)
            .map(|i| blocks[i / BOOL_BLOCK_BITS] & (1 << (i % BOOL_BLOCK_BITS)) != 0)
            .collect(),
    )
}

/// The element count, read under the decoder's sequence limits.
struct SeqLen(SeqSizePrefix);

impl Serialize for SeqLen {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SEQ_LEN_TOKEN, &self.0)
    }
}

impl<'de> Deserialize<'de> for SeqLen {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(SEQ_LEN_TOKEN, SeqLenVisitor)
    }
}

struct SeqLenVisitor;

impl<'de> Visitor<'de> for SeqLenVisitor {
    type Value = SeqLen;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "an element count")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        SeqSizePrefix::try_from(v)
            .map(SeqLen)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    // other formats see a plain newtype
    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Self::Value, D::Error> {
        SeqSizePrefix::deserialize(deserializer).map(SeqLen)
    }
}

/// Serializes a slice of blocks without a count; the count is implied by the element count.
struct Blocks<'a>(&'a [u64]);

impl<'a> Serialize for Blocks<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(self.0.len())?;
        for block in self.0 {
            tup.serialize_element(block)?;
        }
        tup.end()
    }
}

impl Serialize for BoolVec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = SeqSizePrefix::try_from(self.0.len())
            .map_err(|_| ser::Error::custom("boolean sequence exceeds the u32 frame limit"))?;
        let blocks = pack_bools(&self.0);

        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&SeqLen(len))?;
        tup.serialize_element(&Blocks(&blocks))?;
        tup.end()
    }
}

/// Reads exactly `.0` blocks.
struct BlocksSeed(usize);

impl<'de> DeserializeSeed<'de> for BlocksSeed {
    type Value = Vec<u64>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_tuple(self.0, self)
    }
}

impl<'de> Visitor<'de> for BlocksSeed {
    type Value = Vec<u64>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} boolean blocks", self.0)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        // the count comes off the wire, do not trust it for allocation
        let mut blocks = Vec::with_capacity(self.0.min(4096));
        for i in 0..self.0 {
            let block = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
            blocks.push(block);
        }
        Ok(blocks)
    }
}

struct BoolVecVisitor;

impl<'de> Visitor<'de> for BoolVecVisitor {
    type Value = BoolVec;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a packed boolean sequence")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let SeqLen(len) = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let len = len as usize;

        let blocks = seq
            .next_element_seed(BlocksSeed(len.div_ceil(BOOL_BLOCK_BITS)))?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;

        unpack_bools(&blocks, len)
            .map(BoolVec)
            .ok_or_else(|| de::Error::custom("boolean block has bits set past the sequence end"))
    }
}

impl<'de> Deserialize<'de> for BoolVec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(2, BoolVecVisitor)
    }
}
