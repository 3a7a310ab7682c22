//! Resource limits applied while decoding untrusted input.

/// Decoder limits.
///
/// The defaults accept every sequence length the wire format can express and
/// bound recursion so that deeply nested payloads cannot exhaust the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest element count accepted in a sequence, map, string or byte buffer.
    pub max_sequence_len: usize,

    /// Deepest nesting of composites accepted.
    pub max_depth: usize,
}

impl DecodeLimits {
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    pub fn with_max_sequence_len(mut self, max_sequence_len: usize) -> Self {
        self.max_sequence_len = max_sequence_len;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_sequence_len: u32::MAX as usize,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
