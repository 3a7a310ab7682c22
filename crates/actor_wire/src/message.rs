//! Heterogeneous, fixed-arity tuples of type-erased values.

use std::fmt;
use std::mem;

use serde::{Deserialize, Serialize};

use crate::erased::TypeErasedValue;
use crate::registry::{TypeNr, TypeRegistry};
use crate::ser_de::{DecodeError, Decoder, EncodeError, Encoder, SerDeResult};

/// An ordered list of type-erased values, handled as one payload.
///
/// The element list only changes through [Message::replace] or a
/// [Message::load_dynamic].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    elements: Vec<Box<dyn TypeErasedValue>>,
}

/// Build a [Message] from values, wrapping each one.
///
/// ```
/// use actor_wire::message;
///
/// let msg = message!["hello".to_string(), 42_i32];
/// assert_eq!(msg.to_string(), "(\"hello\", 42)");
/// ```
#[macro_export]
macro_rules! message {
    ($($x:expr),* $(,)?) => {
        $crate::Message::from_values(vec![$($crate::erase($x)),*])
    };
}

impl Message {
    /// The empty message
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(elements: Vec<Box<dyn TypeErasedValue>>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn TypeErasedValue> {
        self.elements.get(index).map(Box::as_ref)
    }

    /// The element at `index`, if it has type `T`.
    pub fn get_as<T: 'static>(&self, index: usize) -> Option<&T> {
        self.get(index)?.downcast_ref()
    }

    /// Returns `true` if the element at `index` has type `T`.
    pub fn match_element<T: 'static>(&self, index: usize) -> bool {
        self.get(index).is_some_and(|x| x.is::<T>())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn TypeErasedValue> {
        self.elements.iter().map(Box::as_ref)
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        self.iter().map(|x| x.type_name()).collect()
    }

    /// Swap in a new element, returning the old one.
    ///
    /// Returns `None` and drops `value` if `index` is out of range.
    pub fn replace(
        &mut self,
        index: usize,
        value: Box<dyn TypeErasedValue>,
    ) -> Option<Box<dyn TypeErasedValue>> {
        let slot = self.elements.get_mut(index)?;
        Some(mem::replace(slot, value))
    }

    /// Encode every element's payload in order, without type information.
    pub fn save(&self, encoder: &mut Encoder<'_>) -> SerDeResult<()> {
        self.elements.iter().try_for_each(|x| x.save(encoder))
    }

    /// Decode payloads into the existing elements, in order.
    ///
    /// Both sides must agree on the element types. Elements before a failing
    /// one keep their new values.
    pub fn load(&mut self, decoder: &mut Decoder<'_>) -> SerDeResult<()> {
        self.elements.iter_mut().try_for_each(|x| x.load(decoder))
    }

    /// Encode the element count, then each element's type number and payload.
    ///
    /// On failure the encoder's open sequences are as they were before the call.
    pub fn save_dynamic(
        &self,
        encoder: &mut Encoder<'_>,
        registry: &TypeRegistry,
    ) -> SerDeResult<()> {
        let mark = encoder.mark();

        let res = self.save_elements(encoder, registry);
        if res.is_err() {
            encoder.rewind(mark);
        }
        res
    }

    fn save_elements(&self, encoder: &mut Encoder<'_>, registry: &TypeRegistry) -> SerDeResult<()> {
        encoder.begin_sequence(self.len())?;

        for (i, x) in self.elements.iter().enumerate() {
            let nr = registry
                .type_nr_of(x.as_ref())
                .ok_or(EncodeError::UnregisteredType(x.type_name()))?;
            log::trace!("saving element {} as #{}", i, nr);

            nr.serialize(&mut *encoder)?;
            x.save(encoder)?;
        }

        encoder.end_sequence()
    }

    /// Decode a message written by [Message::save_dynamic].
    ///
    /// The current content is replaced only if the whole message decodes.
    pub fn load_dynamic(
        &mut self,
        decoder: &mut Decoder<'_>,
        registry: &TypeRegistry,
    ) -> SerDeResult<()> {
        let len = decoder.begin_sequence()?;
        let elements = Self::load_elements(decoder, registry, len);
        let end = decoder.end_sequence();

        self.elements = elements?;
        end
    }

    fn load_elements(
        decoder: &mut Decoder<'_>,
        registry: &TypeRegistry,
        len: usize,
    ) -> SerDeResult<Vec<Box<dyn TypeErasedValue>>> {
        // the count comes off the wire, do not trust it for allocation
        let mut elements = Vec::with_capacity(len.min(64));
        for i in 0..len {
            let nr = TypeNr::deserialize(&mut *decoder)?;
            let mut x = registry.make(nr).ok_or_else(|| {
                log::warn!("element {} has unknown type number {}", i, nr);
                DecodeError::UnknownTypeNr(nr)
            })?;
            log::trace!("loading element {} as #{}", i, nr);

            x.load(decoder)?;
            elements.push(x);
        }
        Ok(elements)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, x) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", x.render())?;
        }
        write!(f, ")")
    }
}
