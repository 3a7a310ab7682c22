//! Implementation of [serde::de::Deserializer] for [Decoder]

use serde::de::{self, DeserializeSeed, EnumAccess, MapAccess, SeqAccess, VariantAccess};

use super::buf::ByteSource;
use super::consts::{self, SeqSizePrefix, VariantPrefix};
use super::err::{DecodeError, Error, InvariantViolation, SerDeResult};
use super::ieee754::Ieee754;
use super::limits::DecodeLimits;

/// Reads arbitrary data structures back from a [ByteSource].
///
/// Structs/enums to be decoded need to implement [serde::de::DeserializeOwned].
/// The format is not self-describing: the caller's type decides how the
/// bytes are interpreted.
pub struct Decoder<'s> {
    source: &'s mut dyn ByteSource,
    limits: DecodeLimits,
    depth: usize,
    open_sequences: usize,
}

/// Byte buffers are pulled from the source in chunks of this size,
/// so a bogus length prefix cannot force a huge allocation up front.
const READ_CHUNK: usize = 64 * 1024;

/// Impl deserialize for fixed-width numeric primitives
macro_rules! deserialize_numeric {
    ($fn_name: ident: $data_type: ty => $visitor_fn: ident) => {
        fn $fn_name<V>(self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: de::Visitor<'de>,
        {
            let bytes = self.next_bytes_fixed::<{ std::mem::size_of::<$data_type>() }>()?;
            visitor.$visitor_fn(<$data_type>::from_be_bytes(bytes))
        }
    };
}

impl<'s> Decoder<'s> {
    pub fn new(source: &'s mut dyn ByteSource) -> Self {
        Self::with_limits(source, DecodeLimits::default())
    }

    pub fn with_limits(source: &'s mut dyn ByteSource, limits: DecodeLimits) -> Self {
        Self {
            source,
            limits,
            depth: 0,
            open_sequences: 0,
        }
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Bytes left in the source, if known
    pub fn remaining(&self) -> Option<usize> {
        self.source.remaining()
    }

    /// Fill `buf` with raw bytes, bypassing any framing.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> SerDeResult<()> {
        self.source.read_bytes(buf)?;
        Ok(())
    }

    /// Read the element count of a sequence.
    ///
    /// The caller must consume exactly that many elements before calling
    /// [Decoder::end_sequence].
    pub fn begin_sequence(&mut self) -> SerDeResult<usize> {
        let len = self.pop_size()?;
        self.open_sequences += 1;
        Ok(len)
    }

    /// Close the innermost open sequence.
    pub fn end_sequence(&mut self) -> SerDeResult<()> {
        match self.open_sequences {
            0 => Err(InvariantViolation::UnbalancedSequence.into()),
            _ => {
                self.open_sequences -= 1;
                Ok(())
            }
        }
    }

    /// Number of sequences currently open
    pub fn open_sequences(&self) -> usize {
        self.open_sequences
    }

    /// Returns a copy of the next bytes as a fixed-size array.
    fn next_bytes_fixed<const ARR_SIZE: usize>(&mut self) -> SerDeResult<[u8; ARR_SIZE]> {
        let mut arr = [0_u8; ARR_SIZE];
        self.read_bytes(&mut arr)?;
        Ok(arr)
    }

    fn next_byte(&mut self) -> SerDeResult<u8> {
        let [b] = self.next_bytes_fixed::<1>()?;
        Ok(b)
    }

    /// Takes the next length prefix and checks it against the limits.
    fn pop_size(&mut self) -> SerDeResult<usize> {
        const NUM_BYTES: usize = std::mem::size_of::<SeqSizePrefix>();
        let size_bytes = self.next_bytes_fixed::<NUM_BYTES>()?;
        let len = SeqSizePrefix::from_be_bytes(size_bytes) as usize;

        match len > self.limits.max_sequence_len {
            true => Err(DecodeError::SequenceLimitExceeded {
                len,
                limit: self.limits.max_sequence_len,
            }
            .into()),
            false => Ok(len),
        }
    }

    /// Reads a length-prefixed byte buffer.
    fn next_owned_bytes(&mut self) -> SerDeResult<Vec<u8>> {
        let len = self.pop_size()?;

        if let Some(remaining) = self.source.remaining() {
            if len > remaining {
                return Err(DecodeError::UnexpectedEof {
                    needed: len,
                    remaining,
                }
                .into());
            }
        }

        let mut bytes = Vec::with_capacity(len.min(READ_CHUNK));
        while bytes.len() < len {
            let start = bytes.len();
            let chunk = (len - start).min(READ_CHUNK);
            bytes.resize(start + chunk, 0);
            self.read_bytes(&mut bytes[start..])?;
        }

        Ok(bytes)
    }

    fn next_string(&mut self) -> SerDeResult<String> {
        let bytes = self.next_owned_bytes()?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8.into())
    }

    /// Runs `f` inside a counted frame. The frame is closed even if `f` fails.
    fn framed<R>(&mut self, f: impl FnOnce(&mut Self, usize) -> SerDeResult<R>) -> SerDeResult<R> {
        let declared = self.begin_sequence()?;
        let res = f(self, declared);
        let end = self.end_sequence();

        let val = res?;
        end?;
        Ok(val)
    }

    /// Runs `f` one composite level deeper.
    fn nested<R>(&mut self, f: impl FnOnce(&mut Self) -> SerDeResult<R>) -> SerDeResult<R> {
        if self.depth >= self.limits.max_depth {
            return Err(DecodeError::DepthLimitExceeded(self.limits.max_depth).into());
        }

        self.depth += 1;
        let res = f(self);
        self.depth -= 1;

        res
    }
}

impl<'de, 'a, 's> de::Deserializer<'de> for &'a mut Decoder<'s> {
    type Error = Error;

    fn is_human_readable(&self) -> bool {
        false
    }

    // only the target type knows how to read the bytes
    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        Err(DecodeError::NotSelfDescribing.into())
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.next_byte()? {
            consts::BOOL_TRUE => visitor.visit_bool(true),
            consts::BOOL_FALSE => visitor.visit_bool(false),
            other => Err(DecodeError::InvalidBool(other).into()),
        }
    }

    deserialize_numeric! {deserialize_i8: i8 => visit_i8}
    deserialize_numeric! {deserialize_i16: i16 => visit_i16}
    deserialize_numeric! {deserialize_i32: i32 => visit_i32}
    deserialize_numeric! {deserialize_i64: i64 => visit_i64}
    deserialize_numeric! {deserialize_i128: i128 => visit_i128}

    deserialize_numeric! {deserialize_u8: u8 => visit_u8}
    deserialize_numeric! {deserialize_u16: u16 => visit_u16}
    deserialize_numeric! {deserialize_u32: u32 => visit_u32}
    deserialize_numeric! {deserialize_u64: u64 => visit_u64}
    deserialize_numeric! {deserialize_u128: u128 => visit_u128}

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let packed = u32::from_be_bytes(self.next_bytes_fixed::<4>()?);
        visitor.visit_f32(f32::unpack754(packed))
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let packed = u64::from_be_bytes(self.next_bytes_fixed::<8>()?);
        visitor.visit_f64(f64::unpack754(packed))
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let char_num = u32::from_be_bytes(self.next_bytes_fixed::<4>()?);
        match char::from_u32(char_num) {
            Some(c) => visitor.visit_char(c),
            None => Err(DecodeError::InvalidChar(char_num).into()),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_string(self.next_string()?)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_string(self.next_string()?)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_byte_buf(self.next_owned_bytes()?)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_byte_buf(self.next_owned_bytes()?)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.next_byte()? {
            consts::OPTION_NONE => visitor.visit_none(),
            consts::OPTION_SOME => self.nested(|des| visitor.visit_some(des)),
            other => Err(DecodeError::InvalidOptionTag(other).into()),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        // a bare length prefix, checked against the limits
        if name == consts::SEQ_LEN_TOKEN {
            let len = self.pop_size()?;
            return visitor.visit_u64(len as u64);
        }
        self.nested(|des| visitor.visit_newtype_struct(des))
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.nested(|des| {
            des.framed(|des, declared| {
                let mut accessor = CollectionsAccessor::new(des, declared);
                let val = visitor.visit_seq(&mut accessor)?;
                accessor.finish()?;
                Ok(val)
            })
        })
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.nested(|des| visitor.visit_seq(CollectionsAccessor::new(des, len)))
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.nested(|des| {
            des.framed(|des, declared| {
                let mut accessor = CollectionsAccessor::new(des, declared);
                let val = visitor.visit_map(&mut accessor)?;
                accessor.finish()?;
                Ok(val)
            })
        })
    }

    // structs are plain tuples of their fields
    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_tuple(fields.len(), visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.nested(|des| visitor.visit_enum(VariantAccessor { des }))
    }

    // identifiers only occur as enum variant indices
    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        const NUM_BYTES: usize = std::mem::size_of::<VariantPrefix>();
        let index = VariantPrefix::from_be_bytes(self.next_bytes_fixed::<NUM_BYTES>()?);
        visitor.visit_u32(index)
    }

    fn deserialize_ignored_any<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        Err(DecodeError::NotSelfDescribing.into())
    }
}

/// This wrapper hands out the elements of sequences, tuples and maps.
struct CollectionsAccessor<'a, 's: 'a> {
    des: &'a mut Decoder<'s>,
    declared: usize,
    remaining: usize,
}

impl<'a, 's> CollectionsAccessor<'a, 's> {
    fn new(des: &'a mut Decoder<'s>, len: usize) -> Self {
        Self {
            des,
            declared: len,
            remaining: len,
        }
    }

    /// Fails if the visitor stopped before the end of the frame.
    fn finish(&self) -> SerDeResult<()> {
        match self.remaining {
            0 => Ok(()),
            remaining => Err(DecodeError::SequenceLengthMismatch {
                declared: self.declared,
                consumed: self.declared - remaining,
            }
            .into()),
        }
    }
}

impl<'de, 'a, 's> SeqAccess<'de> for CollectionsAccessor<'a, 's> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        // stop at sequence boundary
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        seed.deserialize(&mut *self.des).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

impl<'de, 'a, 's> MapAccess<'de> for CollectionsAccessor<'a, 's> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        seed.deserialize(&mut *self.des).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.des)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

/// Reads the variant index, then the variant payload.
struct VariantAccessor<'a, 's: 'a> {
    des: &'a mut Decoder<'s>,
}

impl<'de, 'a, 's> EnumAccess<'de> for VariantAccessor<'a, 's> {
    type Error = Error;

    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let val = seed.deserialize(&mut *self.des)?;

        Ok((val, self))
    }
}

impl<'de, 'a, 's> VariantAccess<'de> for VariantAccessor<'a, 's> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.des)
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_tuple(self.des, len, visitor)
    }

    fn struct_variant<V>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_tuple(self.des, fields.len(), visitor)
    }
}
