//! Error implementations

use serde::{de, ser};
use thiserror::Error;

/// Result type returned by every encode/decode operation.
pub type SerDeResult<T> = Result<T, Error>;

/// Top-level error returned by the engine.
///
/// Encoding and decoding failures are ordinary, recoverable values.
/// [InvariantViolation]s indicate a defect in the calling code and should
/// never be observed with correct `Serialize` impls.
#[derive(Debug, Error)]
pub enum Error {
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// Failures while writing to a sink.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The sink cannot hold any more bytes
    #[error("sink exhausted: need {needed} bytes, {remaining} remaining")]
    SinkExhausted { needed: usize, remaining: usize },

    #[error("sink i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Sequence counts are framed as a `u32`
    #[error("sequence of {0} elements exceeds the u32 frame limit")]
    SequenceTooLong(usize),

    /// Sequences must know their length before the first element is written
    #[error("sequence length must be known up front")]
    UnknownSequenceLength,

    /// The value nests deeper than the decoder would accept
    #[error("nesting depth exceeds the limit of {0}")]
    DepthLimitExceeded(usize),

    /// A dynamic encode hit a value whose type has no type number
    #[error("type `{0}` is not registered")]
    UnregisteredType(&'static str),

    #[error("{0}")]
    Custom(String),
}

/// Failures while reading from a source.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of input: need {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("source i/o error: {0}")]
    Io(std::io::Error),

    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    #[error("invalid char scalar value {0:#x}")]
    InvalidChar(u32),

    #[error("string payload is not valid utf-8")]
    InvalidUtf8,

    #[error("invalid option tag {0:#04x}")]
    InvalidOptionTag(u8),

    /// The visitor stopped before consuming every declared element
    #[error("sequence declared {declared} elements, {consumed} consumed")]
    SequenceLengthMismatch { declared: usize, consumed: usize },

    #[error("sequence of {len} elements exceeds the limit of {limit}")]
    SequenceLimitExceeded { len: usize, limit: usize },

    #[error("nesting depth exceeds the limit of {0}")]
    DepthLimitExceeded(usize),

    #[error("unknown type number {0}")]
    UnknownTypeNr(u16),

    #[error("format is not self-describing")]
    NotSelfDescribing,

    #[error("{0} trailing bytes after the decoded value")]
    TrailingBytes(usize),

    #[error("{0}")]
    Custom(String),
}

/// Internal logic defects. These always abort the call.
#[derive(Debug, Error)]
pub enum InvariantViolation {
    /// `end_sequence()` called without a matching `begin_sequence()`
    #[error("end_sequence() without an open sequence")]
    UnbalancedSequence,

    #[error("sequence declared {declared} elements but {written} were written")]
    SequenceLengthMismatch { declared: usize, written: usize },
}

/// Errors raised while building a [crate::TypeRegistry].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("type number {0} is reserved for built-in types")]
    ReservedTypeNr(u16),

    #[error("type number {nr} is already taken by `{name}`")]
    DuplicateTypeNr { nr: u16, name: &'static str },

    #[error("type `{0}` is already registered")]
    DuplicateType(&'static str),
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        Self::Encode(EncodeError::Custom(msg.to_string()))
    }
}

impl de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        Self::Decode(DecodeError::Custom(msg.to_string()))
    }
}

impl Error {
    /// Returns `true` for errors that stem from a defect rather than bad input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}
