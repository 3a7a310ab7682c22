//! Binary encoding for actor message payloads.
//!
//! Values are traversed through serde: anything that derives
//! `Serialize`/`Deserialize` can be written to a [ByteSink] with an
//! [Encoder] and read back from a [ByteSource] with a [Decoder]. The format
//! is compact, big-endian and deterministic, and it is not self-describing.
//!
//! Runtime-typed payloads are [Message]s: tuples of [TypeErasedValue]s.
//! A [TypeRegistry] supplies the type numbers needed to decode a message
//! whose element types are only known from the bytes.
//!
//! ```
//! use actor_wire::{message, TypeRegistry};
//!
//! let registry = TypeRegistry::with_builtin_types();
//! let msg = message!["ping".to_string(), 7_u32];
//!
//! let bytes = registry.serialize_message(&msg).unwrap();
//! assert_eq!(registry.deserialize_message(&bytes).unwrap(), msg);
//! ```

pub mod config_value;
mod erased;
mod message;
mod registry;
pub mod ser_de;
pub mod types;

pub use config_value::{ConfigValue, Dictionary};
pub use erased::{erase, erase_default, Traversable, TypeErasedValue, TypeErasedValueImpl};
pub use message::Message;
pub use registry::{TypeNr, TypeRegistry, FIRST_CUSTOM_TYPE_NR};
pub use ser_de::err::RegistryError;
pub use ser_de::{
    decode, decode_into, deserialize, encode, serialize, ByteSink, ByteSource, DecodeError,
    DecodeLimits, Decoder, EncodeError, Encoder, Error, InvariantViolation, SerDeResult,
    SliceSink, SliceSource, StreamSink, StreamSource,
};
pub use types::{atom, Atom, BoolVec, Duration, TimeUnit, Timespan, Timestamp};

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde::{Deserialize, Serialize};

    use super::*;

    fn init_logger() {
        let _ = pretty_env_logger::try_init();
    }

    #[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
    enum Request {
        #[default]
        Ping,
        Read { path: String, offset: Option<u64> },
        Write(String, serde_bytes::ByteBuf),
    }

    #[test]
    fn test_message_over_stream() {
        init_logger();

        let mut reg = TypeRegistry::with_builtin_types();
        reg.add::<Request>(FIRST_CUSTOM_TYPE_NR, "request").unwrap();

        let msg = message![
            Request::Read {
                path: "/tmp/a".to_string(),
                offset: Some(12)
            },
            atom("read"),
            Timespan::from_millis(250),
            BoolVec::from(vec![true, false, true]),
        ];

        let mut sink = StreamSink::new(Vec::new());
        msg.save_dynamic(&mut Encoder::new(&mut sink), &reg).unwrap();
        let bytes = sink.into_inner();
        println!("{:?}", bytes);

        let mut source = StreamSource::new(Cursor::new(bytes));
        let mut decoded = Message::new();
        decoded
            .load_dynamic(&mut Decoder::new(&mut source), &reg)
            .unwrap();

        println!("{}", decoded);
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_limits() {
        init_logger();

        let bytes = serialize(&vec![vec![1_u8; 4]; 4]).unwrap();
        let mut source = SliceSource::from_slice(&bytes);
        let limits = DecodeLimits::default().with_max_sequence_len(3);

        let err = Vec::<Vec<u8>>::deserialize(&mut Decoder::with_limits(&mut source, limits))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::SequenceLimitExceeded { len: 4, limit: 3 })
        ));
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeRegistry>();
        assert_send_sync::<Message>();
    }
}
