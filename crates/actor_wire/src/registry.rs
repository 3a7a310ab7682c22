//! Type numbers for dynamically typed messages.
//!
//! A [TypeRegistry] assigns every traversable type a `u16` number, so a
//! decoder that does not know a message's element types ahead of time can
//! materialize the right [TypeErasedValue] before loading it.

use std::any::{self, TypeId};
use std::collections::HashMap;

use serde_bytes::ByteBuf;

use crate::config_value::ConfigValue;
use crate::erased::{erase_default, Traversable, TypeErasedValue};
use crate::message::Message;
use crate::ser_de::err::RegistryError;
use crate::ser_de::{ByteSource, DecodeError, Decoder, Encoder, SerDeResult, SliceSource};
use crate::types::{Atom, BoolVec, Duration, Timespan, Timestamp};

/// Wire identifier of a registered type
pub type TypeNr = u16;

/// Numbers below this one belong to the built-in types.
pub const FIRST_CUSTOM_TYPE_NR: TypeNr = 100;

type Factory = fn() -> Box<dyn TypeErasedValue>;

#[derive(Debug, Clone, Copy)]
struct Entry {
    name: &'static str,
    type_id: TypeId,
    factory: Factory,
}

/// Maps type numbers to types and back.
///
/// Built once, then shared by reference. There is no global instance.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_nr: HashMap<TypeNr, Entry>,
    by_type: HashMap<TypeId, TypeNr>,
}

impl TypeRegistry {
    /// A registry without any types, not even the built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in type under its fixed number.
    pub fn with_builtin_types() -> Self {
        let mut reg = Self::new();

        reg.insert::<bool>(1, "bool");
        reg.insert::<i8>(2, "i8");
        reg.insert::<u8>(3, "u8");
        reg.insert::<i16>(4, "i16");
        reg.insert::<u16>(5, "u16");
        reg.insert::<i32>(6, "i32");
        reg.insert::<u32>(7, "u32");
        reg.insert::<i64>(8, "i64");
        reg.insert::<u64>(9, "u64");
        reg.insert::<f32>(10, "f32");
        reg.insert::<f64>(11, "f64");
        reg.insert::<String>(12, "string");
        reg.insert::<Atom>(13, "atom");
        reg.insert::<Duration>(14, "duration");
        reg.insert::<Timestamp>(15, "timestamp");
        reg.insert::<Timespan>(16, "timespan");
        reg.insert::<BoolVec>(17, "bool_vec");
        reg.insert::<ConfigValue>(18, "config_value");
        reg.insert::<ByteBuf>(19, "bytes");
        reg.insert::<char>(20, "char");

        reg
    }

    /// Register a custom type.
    ///
    /// `nr` must be at least [FIRST_CUSTOM_TYPE_NR] and unused, and `T`
    /// must not be registered yet.
    pub fn add<T: Traversable + Default>(
        &mut self,
        nr: TypeNr,
        name: &'static str,
    ) -> Result<(), RegistryError> {
        if nr < FIRST_CUSTOM_TYPE_NR {
            return Err(RegistryError::ReservedTypeNr(nr));
        }
        if let Some(entry) = self.by_nr.get(&nr) {
            return Err(RegistryError::DuplicateTypeNr {
                nr,
                name: entry.name,
            });
        }
        if self.by_type.contains_key(&TypeId::of::<T>()) {
            return Err(RegistryError::DuplicateType(any::type_name::<T>()));
        }

        self.insert::<T>(nr, name);
        Ok(())
    }

    fn insert<T: Traversable + Default>(&mut self, nr: TypeNr, name: &'static str) {
        log::debug!("registering type `{}` as #{}", name, nr);

        let type_id = TypeId::of::<T>();
        self.by_nr.insert(
            nr,
            Entry {
                name,
                type_id,
                factory: erase_default::<T>,
            },
        );
        self.by_type.insert(type_id, nr);
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.by_nr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_nr.is_empty()
    }

    pub fn type_nr<T: 'static>(&self) -> Option<TypeNr> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Type number of the value wrapped by `value`
    pub fn type_nr_of(&self, value: &dyn TypeErasedValue) -> Option<TypeNr> {
        self.by_type.get(&value.value_type()).copied()
    }

    /// Registered name of a type number
    pub fn name(&self, nr: TypeNr) -> Option<&'static str> {
        self.by_nr.get(&nr).map(|entry| entry.name)
    }

    /// Returns `true` if `nr` is registered for the type `T`.
    pub fn is<T: 'static>(&self, nr: TypeNr) -> bool {
        self.by_nr
            .get(&nr)
            .is_some_and(|entry| entry.type_id == TypeId::of::<T>())
    }

    /// A default-valued instance of the type registered under `nr`.
    pub fn make(&self, nr: TypeNr) -> Option<Box<dyn TypeErasedValue>> {
        self.by_nr.get(&nr).map(|entry| (entry.factory)())
    }

    /// Encode a message in the dynamic form, with type numbers.
    pub fn serialize_message(&self, msg: &Message) -> SerDeResult<Vec<u8>> {
        let mut output = Vec::new();
        msg.save_dynamic(&mut Encoder::new(&mut output), self)?;

        Ok(output)
    }

    /// Decode a message in the dynamic form from a slice of bytes.
    ///
    /// The slice must contain exactly one message.
    pub fn deserialize_message(&self, bytes: &[u8]) -> SerDeResult<Message> {
        let mut source = SliceSource::from_slice(bytes);
        let mut msg = Message::new();
        msg.load_dynamic(&mut Decoder::new(&mut source), self)?;

        match source.remaining() {
            Some(0) | None => Ok(msg),
            Some(trailing) => Err(DecodeError::TrailingBytes(trailing).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erased::erase;
    use crate::ser_de::{DecodeError, EncodeError, Error};
    use crate::{message, types::atom};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, Default, PartialEq, Clone)]
    struct TestStruct {
        a: i32,
        b: Vec<String>,
    }

    #[test]
    fn test_builtin_numbers() {
        let reg = TypeRegistry::with_builtin_types();

        assert_eq!(reg.len(), 20);
        assert_eq!(reg.type_nr::<i32>(), Some(6));
        assert_eq!(reg.type_nr::<String>(), Some(12));
        assert_eq!(reg.type_nr::<ConfigValue>(), Some(18));
        assert_eq!(reg.name(13), Some("atom"));
        assert!(reg.is::<Atom>(13));
        assert!(!reg.is::<u64>(13));
        assert!(reg.type_nr::<TestStruct>().is_none());
        assert!(reg.name(99).is_none());

        let made = reg.make(14).unwrap();
        assert_eq!(made.downcast_ref::<Duration>(), Some(&Duration::default()));
    }

    #[test]
    fn test_add_custom() {
        let mut reg = TypeRegistry::with_builtin_types();

        assert_eq!(
            reg.add::<TestStruct>(42, "test_struct"),
            Err(RegistryError::ReservedTypeNr(42))
        );
        assert_eq!(reg.add::<TestStruct>(100, "test_struct"), Ok(()));
        assert_eq!(
            reg.add::<Vec<i32>>(100, "ints"),
            Err(RegistryError::DuplicateTypeNr {
                nr: 100,
                name: "test_struct"
            })
        );
        assert!(matches!(
            reg.add::<TestStruct>(101, "again"),
            Err(RegistryError::DuplicateType(_))
        ));
        assert_eq!(reg.type_nr_of(erase(TestStruct::default()).as_ref()), Some(100));
    }

    #[test]
    fn test_dynamic_layout() {
        let reg = TypeRegistry::with_builtin_types();
        let bytes = reg.serialize_message(&message![true, atom("ok")]).unwrap();

        let mut expected = vec![0, 0, 0, 2];
        expected.extend([0, 1, 1]);
        expected.extend([0, 13]);
        expected.extend(atom("ok").code().to_be_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let reg = TypeRegistry::with_builtin_types();
        let mut bytes = reg.serialize_message(&message![7_u16]).unwrap();
        assert_eq!(reg.deserialize_message(&bytes).unwrap(), message![7_u16]);

        bytes.push(0);
        let err = reg.deserialize_message(&bytes).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::TrailingBytes(1))));
    }

    #[test]
    fn test_unknown_type_nr() {
        let reg = TypeRegistry::with_builtin_types();

        // one element, type number 4242
        let bytes = [0, 0, 0, 1, 0x10, 0x92, 0, 0, 0, 0];
        let err = reg.deserialize_message(&bytes).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::UnknownTypeNr(4242))));
    }

    #[test]
    fn test_unregistered_type() {
        let reg = TypeRegistry::with_builtin_types();
        let err = reg
            .serialize_message(&message![1_i32, TestStruct::default()])
            .unwrap_err();
        assert!(matches!(err, Error::Encode(EncodeError::UnregisteredType(_))));
    }

    #[test]
    fn test_custom_type_roundtrip() {
        let mut reg = TypeRegistry::with_builtin_types();
        reg.add::<TestStruct>(100, "test_struct").unwrap();

        let value = TestStruct {
            a: -7,
            b: vec!["x".to_string(), String::new()],
        };
        let msg = message![value.clone(), 3.5_f64];
        let decoded = reg.deserialize_message(&reg.serialize_message(&msg).unwrap()).unwrap();

        assert_eq!(decoded, msg);
        assert_eq!(decoded.get_as::<TestStruct>(0), Some(&value));
    }
}
