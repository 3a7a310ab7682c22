//! Serialization and deserialization module
//!
//! The traversal contract is serde's: a type lists its fields once (usually
//! through `#[derive(Serialize, Deserialize)]`) and the [Encoder]/[Decoder]
//! visit them in that declared order in both directions.

pub mod buf;
pub mod consts;
pub mod de;
pub mod err;
pub mod ieee754;
pub mod limits;
pub mod ser;

use serde::{de::DeserializeOwned, Serialize};

pub use buf::{ByteSink, ByteSource, SliceSink, SliceSource, StreamSink, StreamSource};
pub use de::Decoder;
pub use err::{DecodeError, EncodeError, Error, InvariantViolation, SerDeResult};
pub use ieee754::{pack754, unpack754, Ieee754};
pub use limits::DecodeLimits;
pub use ser::Encoder;

/// Encode a value into a sink.
///
/// On failure, bytes written before the error stay in the sink.
pub fn encode<T: Serialize + ?Sized>(value: &T, sink: &mut dyn ByteSink) -> SerDeResult<()> {
    let mut encoder = Encoder::new(sink);

    value.serialize(&mut encoder)
}

/// Serialize a data structure to a vector of bytes
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> SerDeResult<Vec<u8>> {
    let mut output = Vec::new();
    encode(value, &mut output)?;

    Ok(output)
}

/// Decode a value from a source. Bytes after the value are left unread.
pub fn decode<T: DeserializeOwned>(source: &mut dyn ByteSource) -> SerDeResult<T> {
    let mut decoder = Decoder::new(source);

    T::deserialize(&mut decoder)
}

/// Decode into an existing value, replacing its content entirely.
///
/// `target` is only touched if decoding succeeds.
pub fn decode_into<T: DeserializeOwned>(
    target: &mut T,
    source: &mut dyn ByteSource,
) -> SerDeResult<()> {
    *target = decode(source)?;
    Ok(())
}

/// Deserialize a data structure from a slice of bytes.
///
/// The slice must contain exactly one encoded value.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> SerDeResult<T> {
    let mut source = SliceSource::from_slice(bytes);
    let value = decode(&mut source)?;

    match source.remaining() {
        Some(0) | None => Ok(value),
        Some(trailing) => Err(DecodeError::TrailingBytes(trailing).into()),
    }
}

/// Serializing and deserializing tests
#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, fmt::Debug};

    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
    struct S {
        item: bool,
        number: i32,
        s: String,
    }

    /// Performs a ser-de process and checks the result
    fn ser_de_loop<T: Debug + PartialEq + Serialize + DeserializeOwned>(input: T) -> Vec<u8> {
        let ser = serialize(&input).unwrap();
        println!("bytes: {} - {:?}", ser.len(), ser);

        let des: T = deserialize(&ser).unwrap();
        assert_eq!(input, des);

        ser
    }

    #[test]
    fn test_ser_de_primitives() {
        ser_de_loop(-345_i32);
        ser_de_loop(-1234567890123456789_i64);
        ser_de_loop(u128::MAX);
        ser_de_loop(3.45_f32);
        ser_de_loop(54.3_f64);
        ser_de_loop('👏');
        ser_de_loop("Lorem ipsum dolor sit amet.".to_string());
        ser_de_loop(Some(10_u8));
        ser_de_loop(Option::<u8>::None);
    }

    #[test]
    fn test_ser_de_map() {
        let map: BTreeMap<String, i32> = BTreeMap::from([
            ("asd".to_string(), 10_000),
            ("how about that 👏👏👏".to_string(), 69),
        ]);

        ser_de_loop(map);
    }

    /// Testing ser_de of sequences, like vectors and tuples
    #[test]
    fn test_ser_de_seq() {
        let seq = vec![100, 200, 300, 400];
        ser_de_loop(seq);

        let tup = (12, 100, 20000);
        let bytes = ser_de_loop(tup);
        // tuples carry no count
        assert_eq!(bytes.len(), 3 * 4);
    }

    #[test]
    fn test_ser_de_arrays() {
        let ra = [1, 2, 3];
        assert_eq!(ser_de_loop(ra).len(), 3 * 4);

        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct TestArray {
            value: [i32; 4],
            value2: [[i32; 4]; 2],
        }

        ser_de_loop(TestArray {
            value: [0, 1, 2, 3],
            value2: [[0, 1, 2, 3], [4, 5, 6, 7]],
        });
    }

    /// Testing ser_de of structs
    #[test]
    fn test_ser_de_struct() {
        let s = S {
            item: false,
            number: 10000,
            s: "asd".to_string(),
        };
        let bytes = ser_de_loop(s);
        assert_eq!(bytes, [0, 0, 0, 0x27, 0x10, 0, 0, 0, 3, b'a', b's', b'd']);
    }

    #[test]
    fn test_ser_de_enum() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        enum E {
            This,
            That(bool),
            WhatEver((i32, bool)),
            IDontCare { a: bool, b: i8, c: String },
        }

        assert_eq!(ser_de_loop(E::This), [0, 0, 0, 0]);
        ser_de_loop(E::That(false));
        ser_de_loop(E::WhatEver((10, true)));
        ser_de_loop(E::IDontCare {
            a: true,
            b: i8::MAX,
            c: "Hello How are You".to_string(),
        });
    }

    #[test]
    fn test_ser_de_tagged_union() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        enum TestVariant {
            Int(i32),
            Double(f64),
            Str(String),
        }

        ser_de_loop(TestVariant::Int(42));
        ser_de_loop(TestVariant::Double(12.34));
        ser_de_loop(TestVariant::Str("foobar".to_string()));
    }

    #[test]
    fn test_empty_composite() {
        #[derive(Debug, Serialize, Deserialize, PartialEq, Default)]
        struct Empty;

        #[derive(Debug, Serialize, Deserialize, PartialEq, Default)]
        struct NoFields {}

        assert!(ser_de_loop(Empty).is_empty());
        assert!(ser_de_loop(NoFields {}).is_empty());

        let mut x = NoFields {};
        decode_into(&mut x, &mut SliceSource::from_slice(&[])).unwrap();
        assert_eq!(x, NoFields {});
    }

    #[test]
    fn test_determinism() {
        let a = S {
            item: true,
            number: -1,
            s: "same".to_string(),
        };
        let b = S {
            item: true,
            number: -1,
            s: ["sa", "me"].concat(),
        };

        assert_eq!(serialize(&a).unwrap(), serialize(&b).unwrap());
    }

    #[test]
    fn test_non_empty_vector_is_overwritten() {
        let foo = vec![1, 2, 3];
        let mut bar = vec![0];

        let buf = serialize(&foo).unwrap();
        decode_into(&mut bar, &mut SliceSource::from_slice(&buf)).unwrap();

        assert_eq!(foo, bar);
    }

    #[test]
    fn test_failed_decode_leaves_target() {
        let mut bar = vec![7_u8];
        let err = decode_into(&mut bar, &mut SliceSource::from_slice(&[0, 0, 0, 2, 1]));

        assert!(err.is_err());
        assert_eq!(bar, [7]);
    }

    #[test]
    fn test_long_sequences() {
        let n = u32::MAX as usize;

        let mut data = Vec::new();
        let mut sink = Encoder::new(&mut data);
        sink.begin_sequence(n).unwrap();
        sink.end_sequence().unwrap();

        let mut source = SliceSource::from_slice(&data);
        let mut source = Decoder::new(&mut source);
        let m = source.begin_sequence().unwrap();
        source.end_sequence().unwrap();

        assert_eq!(n, m);
    }

    #[test]
    fn test_sequence_too_long() {
        let mut data = Vec::new();
        let mut sink = Encoder::new(&mut data);

        let err = sink.begin_sequence(u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, Error::Encode(EncodeError::SequenceTooLong(_))));
        assert_eq!(sink.open_sequences(), 0);
    }

    #[test]
    fn test_trailing_bytes() {
        let err = deserialize::<u8>(&[1, 2]).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::TrailingBytes(1))));
    }

    #[test]
    fn test_byte_sequence() {
        let data = serde_bytes::ByteBuf::from(vec![0x2a_u8; 42]);
        let bytes = ser_de_loop(data.clone());

        // same wire form as a plain `Vec<u8>`
        assert_eq!(bytes, serialize(&vec![0x2a_u8; 42]).unwrap());
    }

    #[test]
    fn test_multiple_values_one_buffer() {
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf);
            42_u16.serialize(&mut enc).unwrap();
            "two".serialize(&mut enc).unwrap();
            (-3_i8).serialize(&mut enc).unwrap();
        }

        let mut source = SliceSource::from_slice(&buf);
        let mut dec = Decoder::new(&mut source);
        assert_eq!(u16::deserialize(&mut dec).unwrap(), 42);
        assert_eq!(String::deserialize(&mut dec).unwrap(), "two");
        assert_eq!(i8::deserialize(&mut dec).unwrap(), -3);
        assert!(source.is_end());
    }

    #[test]
    fn test_stream_buffers() {
        let data = "The quick brown fox jumps over the lazy dog".to_string();

        // owned stream buffer
        let mut sink = StreamSink::new(Vec::new());
        encode(&data, &mut sink).unwrap();
        let buf = sink.into_inner();

        let mut source = StreamSource::new(std::io::Cursor::new(buf.clone()));
        let target: String = decode(&mut source).unwrap();
        assert_eq!(data, target);

        // borrowed stream buffer
        let mut borrowed = Vec::new();
        let mut sink = StreamSink::new(&mut borrowed);
        encode(&data, &mut sink).unwrap();
        assert_eq!(borrowed, buf);

        let mut slice: &[u8] = &borrowed;
        let mut source = StreamSource::new(&mut slice);
        let target: String = decode(&mut source).unwrap();
        assert_eq!(data, target);
    }

    #[test]
    fn test_fixed_sink_keeps_partial_prefix() {
        let mut buf = [0_u8; 6];
        let mut sink = SliceSink::new(&mut buf);

        let err = encode(&(1_u32, 2_u32), &mut sink).unwrap_err();
        assert!(matches!(err, Error::Encode(EncodeError::SinkExhausted { .. })));
        assert_eq!(sink.position(), 4);
    }
}
