//! Implementation of [serde::ser::Serializer] for [Encoder]

use serde::ser;
use serde::Serialize;

use super::buf::ByteSink;
use super::consts::{self, SeqSizePrefix, VariantPrefix};
use super::err::{EncodeError, Error, InvariantViolation, SerDeResult};
use super::ieee754::Ieee754;
use super::limits::DecodeLimits;

/// Writes the encoding of arbitrary data structures into a [ByteSink].
///
/// Structs/enums to be encoded need to implement [serde::Serialize].
/// The encoder keeps no state besides the currently open sequence frames and
/// the nesting depth, so one instance can write several values back to back.
///
/// Composites are counted against the same depth budget the [Decoder](super::Decoder)
/// applies, so a value that encodes also decodes under matching limits.
/// When an element fails, the enclosing composites unwind their frames. A
/// `Serialize` impl that fails on its own, outside of any element, can leave
/// frames open; call [Encoder::reset] before reusing the encoder.
pub struct Encoder<'s> {
    sink: &'s mut dyn ByteSink,
    frames: Vec<SeqFrame>,
    depth: usize,
    max_depth: usize,
}

/// A position in the encoder's state, see [Encoder::mark].
#[derive(Debug, Clone, Copy)]
pub(crate) struct EncoderMark {
    frames: usize,
    depth: usize,
}

/// An open sequence.
///
/// Frames opened through serde sequences and maps count their elements,
/// frames opened through [Encoder::begin_sequence] do not.
#[derive(Debug)]
struct SeqFrame {
    declared: usize,
    written: Option<usize>,
}

/// Impl serialize for primitives
macro_rules! serialize_numeric_primitive {
    ($fn_name: ident, $num_type: ty) => {
        fn $fn_name(self, v: $num_type) -> Result<Self::Ok, Self::Error> {
            self.write_bytes(&v.to_be_bytes())
        }
    };
}

impl<'s> Encoder<'s> {
    pub fn new(sink: &'s mut dyn ByteSink) -> Self {
        Self::with_max_depth(sink, DecodeLimits::DEFAULT_MAX_DEPTH)
    }

    /// Should match the decoding side's [DecodeLimits::max_depth].
    pub fn with_max_depth(sink: &'s mut dyn ByteSink, max_depth: usize) -> Self {
        Self {
            sink,
            frames: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Drop all open frames and return to the top level.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.depth = 0;
    }

    /// Current frame and depth position, for [Encoder::rewind].
    pub(crate) fn mark(&self) -> EncoderMark {
        EncoderMark {
            frames: self.frames.len(),
            depth: self.depth,
        }
    }

    /// Drop whatever was opened since `mark`. Bytes already written stay.
    pub(crate) fn rewind(&mut self, mark: EncoderMark) {
        self.frames.truncate(mark.frames);
        self.depth = mark.depth;
    }

    /// Writes raw bytes to the sink, bypassing any framing.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> SerDeResult<()> {
        self.sink.write_bytes(bytes)?;
        Ok(())
    }

    /// Open a sequence of `len` elements.
    ///
    /// Only the count is written. The caller is responsible for writing exactly
    /// `len` elements before calling [Encoder::end_sequence].
    pub fn begin_sequence(&mut self, len: usize) -> SerDeResult<()> {
        self.write_len(len)?;
        self.frames.push(SeqFrame {
            declared: len,
            written: None,
        });
        Ok(())
    }

    /// Close the innermost open sequence.
    pub fn end_sequence(&mut self) -> SerDeResult<()> {
        let frame = self
            .frames
            .pop()
            .ok_or(InvariantViolation::UnbalancedSequence)?;

        match frame.written {
            Some(written) if written != frame.declared => {
                Err(InvariantViolation::SequenceLengthMismatch {
                    declared: frame.declared,
                    written,
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Number of sequences currently open
    pub fn open_sequences(&self) -> usize {
        self.frames.len()
    }

    /// Writes a length prefix, shared by sequences, maps, strings and byte buffers.
    fn write_len(&mut self, len: usize) -> SerDeResult<()> {
        let prefix =
            SeqSizePrefix::try_from(len).map_err(|_| EncodeError::SequenceTooLong(len))?;
        self.write_bytes(&prefix.to_be_bytes())
    }

    fn write_variant(&mut self, variant_index: u32) -> SerDeResult<()> {
        self.write_bytes(&(variant_index as VariantPrefix).to_be_bytes())
    }

    fn begin_counted_sequence(&mut self, len: Option<usize>) -> SerDeResult<()> {
        let len = len.ok_or(EncodeError::UnknownSequenceLength)?;
        self.begin_sequence(len)?;
        if let Some(frame) = self.frames.last_mut() {
            frame.written = Some(0);
        }
        Ok(())
    }

    /// Enters one composite level.
    fn enter(&mut self) -> SerDeResult<()> {
        if self.depth >= self.max_depth {
            return Err(EncodeError::DepthLimitExceeded(self.max_depth).into());
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    /// Runs `f` one composite level deeper.
    fn nested(&mut self, f: impl FnOnce(&mut Self) -> SerDeResult<()>) -> SerDeResult<()> {
        self.enter()?;
        let res = f(self);
        self.leave(1);
        res
    }

    /// Writes one element of an open composite spanning `levels` depth levels
    /// and `frames` sequence frames.
    ///
    /// serde never calls `end()` after a failed element, so on failure the
    /// composite's state is unwound here.
    fn element<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
        levels: usize,
        frames: usize,
    ) -> SerDeResult<()> {
        let mark = self.mark();

        match value.serialize(&mut *self) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.rewind(EncoderMark {
                    frames: mark.frames.saturating_sub(frames),
                    depth: mark.depth.saturating_sub(levels),
                });
                Err(e)
            }
        }
    }

    /// Opens a tuple or struct variant: one level for the enum, one for the payload.
    fn begin_compound_variant(&mut self, variant_index: u32) -> SerDeResult<()> {
        self.enter()?;
        if let Err(e) = self.write_variant(variant_index).and_then(|()| self.enter()) {
            self.leave(1);
            return Err(e);
        }
        Ok(())
    }

    fn count_element(&mut self) {
        if let Some(SeqFrame {
            written: Some(written),
            ..
        }) = self.frames.last_mut()
        {
            *written += 1;
        }
    }
}

impl<'a, 's> ser::Serializer for &'a mut Encoder<'s> {
    type Ok = ();

    type Error = Error;

    type SerializeSeq = Self;

    type SerializeTuple = Self;

    type SerializeTupleStruct = Self;

    type SerializeTupleVariant = Self;

    type SerializeMap = Self;

    type SerializeStruct = Self;

    type SerializeStructVariant = Self;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        match v {
            true => self.write_bytes(&[consts::BOOL_TRUE]),
            false => self.write_bytes(&[consts::BOOL_FALSE]),
        }
    }

    serialize_numeric_primitive! {serialize_i8, i8}
    serialize_numeric_primitive! {serialize_i16, i16}
    serialize_numeric_primitive! {serialize_i32, i32}
    serialize_numeric_primitive! {serialize_i64, i64}
    serialize_numeric_primitive! {serialize_i128, i128}

    serialize_numeric_primitive! {serialize_u8, u8}
    serialize_numeric_primitive! {serialize_u16, u16}
    serialize_numeric_primitive! {serialize_u32, u32}
    serialize_numeric_primitive! {serialize_u64, u64}
    serialize_numeric_primitive! {serialize_u128, u128}

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.serialize_u32(v.pack754())
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        self.serialize_u64(v.pack754())
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.serialize_u32(v as u32)
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        self.serialize_bytes(v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        self.write_len(v.len())?;
        self.write_bytes(v)
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        self.write_bytes(&[consts::OPTION_NONE])
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize,
    {
        self.write_bytes(&[consts::OPTION_SOME])?;
        self.nested(|enc| value.serialize(enc))
    }

    // stateless values produce no bytes at all
    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<Self::Ok, Self::Error> {
        self.serialize_unit()
    }

    // serialize the index of a unit variant
    fn serialize_unit_variant(
        self,
        _: &'static str,
        variant_index: u32,
        _: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.nested(|enc| enc.write_variant(variant_index))
    }

    // serialize the inner value
    fn serialize_newtype_struct<T: ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize,
    {
        // a bare length prefix, not a composite
        if name == consts::SEQ_LEN_TOKEN {
            return value.serialize(self);
        }
        self.nested(|enc| value.serialize(enc))
    }

    // serialize the index, then the inner variant
    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _: &'static str,
        variant_index: u32,
        _: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize,
    {
        self.nested(|enc| {
            enc.write_variant(variant_index)?;
            value.serialize(enc)
        })
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        self.enter()?;
        if let Err(e) = self.begin_counted_sequence(len) {
            self.leave(1);
            return Err(e);
        }
        Ok(self)
    }

    // the arity of tuples is part of their type, no count is written
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.enter()?;
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        self.begin_compound_variant(variant_index)?;
        Ok(self)
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        self.enter()?;
        if let Err(e) = self.begin_counted_sequence(len) {
            self.leave(1);
            return Err(e);
        }
        Ok(self)
    }

    // fields are written in declaration order, without names
    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        self.enter()?;
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        self.begin_compound_variant(variant_index)?;
        Ok(self)
    }
}

impl<'a, 's> ser::SerializeSeq for &'a mut Encoder<'s> {
    type Ok = ();

    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.element(value, 1, 1)?;
        self.count_element();
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let res = self.end_sequence();
        self.leave(1);
        res
    }
}

impl<'a, 's> ser::SerializeTuple for &'a mut Encoder<'s> {
    type Ok = ();

    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.element(value, 1, 0)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.leave(1);
        Ok(())
    }
}

impl<'a, 's> ser::SerializeTupleStruct for &'a mut Encoder<'s> {
    type Ok = ();

    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.element(value, 1, 0)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.leave(1);
        Ok(())
    }
}

impl<'a, 's> ser::SerializeTupleVariant for &'a mut Encoder<'s> {
    type Ok = ();

    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.element(value, 2, 0)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.leave(2);
        Ok(())
    }
}

impl<'a, 's> ser::SerializeMap for &'a mut Encoder<'s> {
    type Ok = ();

    type Error = Error;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.element(key, 1, 1)
    }

    // an entry counts once its value is written
    fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.element(value, 1, 1)?;
        self.count_element();
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let res = self.end_sequence();
        self.leave(1);
        res
    }
}

impl<'a, 's> ser::SerializeStruct for &'a mut Encoder<'s> {
    type Ok = ();

    type Error = Error;

    fn serialize_field<T: ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.element(value, 1, 0)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.leave(1);
        Ok(())
    }
}

impl<'a, 's> ser::SerializeStructVariant for &'a mut Encoder<'s> {
    type Ok = ();

    type Error = Error;

    fn serialize_field<T: ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.element(value, 2, 0)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.leave(2);
        Ok(())
    }
}
