//! Type-erased values.
//!
//! A [TypeErasedValue] owns exactly one value whose concrete type is hidden
//! behind a uniform load/save/compare/render interface. The concrete type is
//! fixed at construction and never changes afterwards.

use std::any::{self, Any, TypeId};
use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

use crate::ser_de::{Decoder, Encoder, SerDeResult};

/// Types that can be wrapped in a [TypeErasedValue].
///
/// Implemented for every type that meets the bounds.
pub trait Traversable:
    Serialize + DeserializeOwned + PartialEq + fmt::Debug + Clone + Send + Sync + 'static
{
}

impl<T> Traversable for T where
    T: Serialize + DeserializeOwned + PartialEq + fmt::Debug + Clone + Send + Sync + 'static
{
}

/// Runtime interface of a wrapped value.
pub trait TypeErasedValue: Any + Send + Sync {
    /// Encode the wrapped value.
    fn save(&self, encoder: &mut Encoder<'_>) -> SerDeResult<()>;

    /// Decode a value of the wrapped type and replace the current one.
    ///
    /// On failure the current value is kept.
    fn load(&mut self, decoder: &mut Decoder<'_>) -> SerDeResult<()>;

    /// [TypeId] of the wrapped type
    fn value_type(&self) -> TypeId;

    /// Name of the wrapped type, for diagnostics
    fn type_name(&self) -> &'static str;

    /// The wrapped value, for checked downcasts.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Untyped pointer to the wrapped value.
    ///
    /// The caller asserts the real type out-of-band. Prefer
    /// [downcast_ref](trait.TypeErasedValue.html#method.downcast_ref).
    fn raw_ptr(&self) -> *const ();

    fn raw_ptr_mut(&mut self) -> *mut ();

    /// `true` if `other` wraps an equal value of the same type.
    fn equals(&self, other: &dyn TypeErasedValue) -> bool;

    fn render(&self) -> String;

    /// Deep copy behind a fresh box.
    fn copy(&self) -> Box<dyn TypeErasedValue>;
}

impl dyn TypeErasedValue {
    /// Returns `true` if the wrapped value has type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

impl PartialEq for dyn TypeErasedValue {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Debug for dyn TypeErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Clone for Box<dyn TypeErasedValue> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

/// The one [TypeErasedValue] implementation, generic over the wrapped type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeErasedValueImpl<T> {
    value: T,
}

impl<T: Traversable> TypeErasedValueImpl<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Traversable> TypeErasedValue for TypeErasedValueImpl<T> {
    fn save(&self, encoder: &mut Encoder<'_>) -> SerDeResult<()> {
        self.value.serialize(encoder)
    }

    fn load(&mut self, decoder: &mut Decoder<'_>) -> SerDeResult<()> {
        self.value = T::deserialize(decoder)?;
        Ok(())
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        &self.value
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.value
    }

    fn raw_ptr(&self) -> *const () {
        &self.value as *const T as *const ()
    }

    fn raw_ptr_mut(&mut self) -> *mut () {
        &mut self.value as *mut T as *mut ()
    }

    fn equals(&self, other: &dyn TypeErasedValue) -> bool {
        other
            .downcast_ref::<T>()
            .map_or(false, |other| *other == self.value)
    }

    fn render(&self) -> String {
        format!("{:?}", self.value)
    }

    fn copy(&self) -> Box<dyn TypeErasedValue> {
        Box::new(self.clone())
    }
}

/// Wrap a value, erasing its static type.
pub fn erase<T: Traversable>(value: T) -> Box<dyn TypeErasedValue> {
    Box::new(TypeErasedValueImpl::new(value))
}

/// An empty wrapper for `T`, ready to [load](TypeErasedValue::load) into.
pub fn erase_default<T: Traversable + Default>() -> Box<dyn TypeErasedValue> {
    erase(T::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ser_de::{serialize, DecodeError, Error, SliceSource};

    #[test]
    fn test_load_from_string_bytes() {
        let s = "Lorem ipsum dolor sit amet.".to_string();
        let buf = serialize(&s).unwrap();

        let mut ptr = erase_default::<String>();
        let mut source = SliceSource::from_slice(&buf);
        ptr.load(&mut Decoder::new(&mut source)).unwrap();

        // SAFETY: constructed as a `String` above
        let raw = unsafe { &*(ptr.raw_ptr() as *const String) };
        assert_eq!(raw, &s);
        assert_eq!(ptr.downcast_ref::<String>(), Some(&s));
    }

    #[test]
    fn test_save_matches_typed_encoding() {
        let x = erase(-345_i32);

        let mut buf = Vec::new();
        x.save(&mut Encoder::new(&mut buf)).unwrap();

        assert_eq!(buf, serialize(&-345_i32).unwrap());
    }

    #[test]
    fn test_failed_load_keeps_value_and_type() {
        let mut x = erase(String::from("kept"));

        // declares 5 bytes, carries 1
        let bytes = [0, 0, 0, 5, b'a'];
        let mut source = SliceSource::from_slice(&bytes);
        let err = x.load(&mut Decoder::new(&mut source)).unwrap_err();

        assert!(matches!(err, Error::Decode(DecodeError::UnexpectedEof { .. })));
        assert!(x.is::<String>());
        assert_eq!(x.downcast_ref::<String>().map(String::as_str), Some("kept"));
    }

    #[test]
    fn test_equality_and_render() {
        let a = erase(42_u32);
        let b = erase(42_u32);
        let c = erase(42_i32);

        assert!(a.equals(b.as_ref()));
        assert!(!a.equals(c.as_ref()));
        assert_eq!(a.render(), "42");
        assert_eq!(erase("x".to_string()).render(), "\"x\"");
        assert_eq!(a.copy().as_ref(), b.as_ref());
    }

    /// Claims to wrap a `String` but holds a single byte.
    struct Impostor(u8);

    impl TypeErasedValue for Impostor {
        fn save(&self, encoder: &mut Encoder<'_>) -> SerDeResult<()> {
            self.0.serialize(encoder)
        }

        fn load(&mut self, _decoder: &mut Decoder<'_>) -> SerDeResult<()> {
            Ok(())
        }

        fn value_type(&self) -> TypeId {
            TypeId::of::<String>()
        }

        fn type_name(&self) -> &'static str {
            "alloc::string::String"
        }

        fn as_any(&self) -> &dyn Any {
            &self.0
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            &mut self.0
        }

        fn raw_ptr(&self) -> *const () {
            &self.0 as *const u8 as *const ()
        }

        fn raw_ptr_mut(&mut self) -> *mut () {
            &mut self.0 as *mut u8 as *mut ()
        }

        fn equals(&self, _other: &dyn TypeErasedValue) -> bool {
            false
        }

        fn render(&self) -> String {
            self.0.to_string()
        }

        fn copy(&self) -> Box<dyn TypeErasedValue> {
            Box::new(Impostor(self.0))
        }
    }

    #[test]
    fn test_downcast_ignores_reported_type() {
        let mut x: Box<dyn TypeErasedValue> = Box::new(Impostor(7));

        assert_eq!(x.value_type(), TypeId::of::<String>());
        assert!(!x.is::<String>());
        assert!(x.downcast_ref::<String>().is_none());
        assert!(x.downcast_mut::<String>().is_none());
        assert_eq!(x.downcast_ref::<u8>(), Some(&7));

        // a genuine `String` does not compare equal to it either
        assert!(!erase("7".to_string()).equals(x.as_ref()));
    }

    #[test]
    fn test_downcast_through_borrowed_element() {
        let values = [erase(1_i16), erase(String::from("x"))];
        let borrowed: Vec<&dyn TypeErasedValue> = values.iter().map(Box::as_ref).collect();

        assert_eq!(borrowed[0].downcast_ref::<i16>(), Some(&1));
        assert!(borrowed[1].is::<String>());
    }

    #[test]
    fn test_downcast_mut() {
        let mut v = erase(vec![1_u8]);
        v.downcast_mut::<Vec<u8>>().unwrap().push(2);

        assert_eq!(v.downcast_ref::<Vec<u8>>(), Some(&vec![1, 2]));
        assert!(v.downcast_ref::<Vec<i8>>().is_none());
        assert!(v.type_name().contains("Vec<u8>"));
    }
}
