//! Shared constants between serialization and deserialization logic.

/// Element counts of sequences, maps, strings and byte buffers are framed with this type.
pub type SeqSizePrefix = u32;

/// Variant indices of enums are written with this type.
pub type VariantPrefix = u32;

/// Newtype name marking a bare length prefix.
///
/// The decoder reads it like any other sequence count, so it is subject to
/// [DecodeLimits::max_sequence_len](super::DecodeLimits). Neither side counts
/// it as a nesting level.
pub const SEQ_LEN_TOKEN: &str = "$actor_wire::SeqLen";

pub const OPTION_NONE: u8 = 0;
pub const OPTION_SOME: u8 = 1;

pub const BOOL_FALSE: u8 = 0;
pub const BOOL_TRUE: u8 = 1;

/// Number of booleans packed into one block of a [crate::BoolVec].
pub const BOOL_BLOCK_BITS: usize = u64::BITS as usize;

/// Canonical quiet NaN written for every `f32` NaN.
pub const CANONICAL_NAN_F32: u32 = 0x7FC0_0000;

/// Canonical quiet NaN written for every `f64` NaN.
pub const CANONICAL_NAN_F64: u64 = 0x7FF8_0000_0000_0000;
