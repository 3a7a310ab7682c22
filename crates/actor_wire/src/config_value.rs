//! Recursive configuration values.
//!
//! A [ConfigValue] is a scalar, a list of values or a dictionary of named
//! values. Dictionaries keep insertion order, on the wire as well as in
//! memory, so a round trip reproduces identical bytes. Decoding rejects a
//! dictionary that repeats a key.
//!
//! Nesting is bounded by the codec's depth limit. Every list or dictionary
//! level costs two (the variant and the collection) and the innermost scalar
//! one more, so the default limit of 256 fits 127 nested lists.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{Atom, Timespan};

/// Named values in insertion order
pub type Dictionary = IndexMap<String, ConfigValue>;

/// Separator for nested keys in [put] and [get]
pub const PATH_SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ConfigValue {
    #[default]
    None,
    Integer(i64),
    Boolean(bool),
    Real(f64),
    Atom(Atom),
    Timespan(Timespan),
    String(String),
    List(Vec<ConfigValue>),
    #[serde(deserialize_with = "unique_keys")]
    Dictionary(Dictionary),
}

fn unique_keys<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Dictionary, D::Error> {
    deserializer.deserialize_map(DictionaryVisitor)
}

struct DictionaryVisitor;

impl<'de> Visitor<'de> for DictionaryVisitor {
    type Value = Dictionary;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a dictionary with unique keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        // the count comes off the wire, do not trust it for allocation
        let mut dict = Dictionary::with_capacity(map.size_hint().unwrap_or(0).min(4096));
        while let Some((key, value)) = map.next_entry::<String, ConfigValue>()? {
            if dict.contains_key(&key) {
                return Err(de::Error::custom(format_args!("duplicate dictionary key `{}`", key)));
            }
            dict.insert(key, value);
        }
        Ok(dict)
    }
}

impl ConfigValue {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<Atom> {
        match self {
            Self::Atom(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::List(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Look up a dotted path, if this value is a dictionary.
    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        get(self.as_dictionary()?, path)
    }
}

/// Store `value` under a dotted path, creating intermediate dictionaries.
///
/// An intermediate key that holds a non-dictionary value is replaced by an
/// empty dictionary first.
pub fn put(dict: &mut Dictionary, path: &str, value: impl Into<ConfigValue>) {
    put_value(dict, path, value.into())
}

fn put_value(dict: &mut Dictionary, path: &str, value: ConfigValue) {
    let Some((key, rest)) = path.split_once(PATH_SEPARATOR) else {
        dict.insert(path.to_string(), value);
        return;
    };

    match dict.entry(key.to_string()).or_default() {
        ConfigValue::Dictionary(inner) => put_value(inner, rest, value),
        other => {
            let mut inner = Dictionary::new();
            put_value(&mut inner, rest, value);
            *other = ConfigValue::Dictionary(inner);
        }
    }
}

/// Look up a dotted path.
pub fn get<'a>(dict: &'a Dictionary, path: &str) -> Option<&'a ConfigValue> {
    let mut keys = path.split(PATH_SEPARATOR);
    let mut value = dict.get(keys.next()?)?;
    for key in keys {
        value = value.as_dictionary()?.get(key)?;
    }
    Some(value)
}

/// Build a [ConfigValue::List], converting every element with `From`.
#[macro_export]
macro_rules! config_value_list {
    ($($x:expr),* $(,)?) => {
        $crate::ConfigValue::List(vec![$($crate::ConfigValue::from($x)),*])
    };
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ConfigValue {
                fn from(x: $ty) -> Self {
                    Self::$variant(x.into())
                }
            }
        )*
    };
}

impl_from! {
    i64 => Integer,
    i32 => Integer,
    u32 => Integer,
    i16 => Integer,
    u16 => Integer,
    i8 => Integer,
    u8 => Integer,
    bool => Boolean,
    f64 => Real,
    f32 => Real,
    Atom => Atom,
    Timespan => Timespan,
    String => String,
    &str => String,
    Vec<ConfigValue> => List,
    Dictionary => Dictionary,
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "null"),
            Self::Integer(x) => write!(f, "{}", x),
            Self::Boolean(x) => write!(f, "{}", x),
            Self::Real(x) => write!(f, "{}", x),
            Self::Atom(x) => write!(f, "{:?}", x),
            Self::Timespan(x) => write!(f, "{}", x),
            Self::String(x) => write!(f, "{:?}", x),
            Self::List(xs) => {
                write!(f, "[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", x)?;
                }
                write!(f, "]")
            }
            Self::Dictionary(dict) => {
                write!(f, "{{")?;
                for (i, (key, x)) in dict.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", key, x)?;
                }
                write!(f, "}}")
            }
        }
    }
}
