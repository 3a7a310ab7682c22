//! Interned short symbols packed into a `u64`.
//!
//! Layout, from the most significant end: a 4-bit `0xF` marker, then one
//! 6-bit code per character. Unused high bits stay zero. Ten characters fill
//! all 64 bits.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Max number of characters in an atom.
pub const MAX_ATOM_LEN: usize = 10;

const MARKER: u64 = 0xF;
const CODE_BITS: u32 = 6;
const CODE_MASK: u64 = 0x3F;

/// Characters by 6-bit code.
const DECODING_TABLE: &[u8; 64] =
    b" 0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Failures constructing an [Atom].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AtomError {
    #[error("atom `{0}` is longer than {MAX_ATOM_LEN} characters")]
    TooLong(String),

    #[error("character {0:?} cannot appear in an atom")]
    InvalidChar(char),
}

/// A short symbol whose identity is its packed integer code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Atom(u64);

const fn encode_char(c: u8) -> Option<u64> {
    let code = match c {
        b' ' => 0,
        b'0'..=b'9' => c - b'0' + 1,
        b'A'..=b'Z' => c - b'A' + 11,
        b'_' => 37,
        b'a'..=b'z' => c - b'a' + 38,
        _ => return None,
    };
    Some(code as u64)
}

/// Const constructor for atoms known at compile time.
///
/// Panics on invalid input; inside a `const` item this is a compile error.
pub const fn atom(s: &str) -> Atom {
    let bytes = s.as_bytes();
    assert!(bytes.len() <= MAX_ATOM_LEN, "atom too long");

    let mut value = MARKER;
    let mut i = 0;
    while i < bytes.len() {
        let code = match encode_char(bytes[i]) {
            Some(code) => code,
            None => panic!("invalid atom character"),
        };
        value = (value << CODE_BITS) | code;
        i += 1;
    }

    Atom(value)
}

impl Atom {
    /// Pack a string into an atom.
    pub fn new(s: &str) -> Result<Self, AtomError> {
        if s.chars().count() > MAX_ATOM_LEN {
            return Err(AtomError::TooLong(s.to_string()));
        }

        let mut value = MARKER;
        for c in s.chars() {
            let code = u8::try_from(c)
                .ok()
                .and_then(encode_char)
                .ok_or(AtomError::InvalidChar(c))?;
            value = (value << CODE_BITS) | code;
        }

        Ok(Self(value))
    }

    /// The packed integer code
    pub fn code(self) -> u64 {
        self.0
    }

    /// Reinterpret a packed code.
    pub fn from_code(code: u64) -> Self {
        Self(code)
    }

    /// Unpack the characters.
    ///
    /// Codes without a marker decode to the empty string.
    pub fn as_string(self) -> String {
        let x = self.0;
        let mut out = String::with_capacity(MAX_ATOM_LEN);

        // a full ten-character atom keeps its marker in the top four bits
        let mut read_chars = (x >> 60) == MARKER;
        for idx in (0..MAX_ATOM_LEN as u32).rev() {
            let code = (x >> (idx * CODE_BITS)) & CODE_MASK;
            if read_chars {
                out.push(DECODING_TABLE[code as usize] as char);
            } else if code == MARKER {
                read_chars = true;
            }
        }

        out
    }
}

/// The empty atom
impl Default for Atom {
    fn default() -> Self {
        atom("")
    }
}

impl TryFrom<&str> for Atom {
    type Error = AtomError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.as_string())
    }
}
