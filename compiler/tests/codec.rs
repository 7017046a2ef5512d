use structly_compiler::{Decoder, DecoderOptions, Encoder, EncoderOptions};
use structly_schema::*;

fn ints(values: &[i64]) -> Value {
    Value::Array(values.iter().copied().map(Value::Int).collect())
}

fn bitfield_schema() -> Schema {
    bitfield([("hello", 1), ("there", 7), ("how", 11), ("are", 8), ("you", 5)]).unwrap()
}

fn bitfield_value() -> Value {
    Value::object([
        ("hello", Value::Int(1)),
        ("there", Value::Int(2)),
        ("how", Value::Int(3)),
        ("are", Value::Int(4)),
        ("you", Value::Int(5)),
    ])
}

#[test]
fn test_numbers_by_byte_order() {
    let bytes = [0x01, 0x02, 0x03, 0x04];

    let decode = |schema: Schema| Decoder::new(&schema).unwrap().decode(&bytes).unwrap();

    assert_eq!(decode(uint16le()), Value::Int(0x0201));
    assert_eq!(decode(uint16be()), Value::Int(0x0102));
    assert_eq!(decode(int32le()), Value::Int(0x0403_0201));
    assert_eq!(decode(uint32be()), Value::Int(0x0102_0304));

    let native = if SYSTEM_LITTLE_ENDIAN { 0x0201 } else { 0x0102 };
    assert_eq!(decode(uint16()), Value::Int(native));
}

#[test]
fn test_integer_wraparound() {
    let encode = |schema: Schema, value: i64| {
        Encoder::new(&schema).unwrap().encode(&Value::Int(value)).unwrap()
    };

    assert_eq!(encode(uint8(), 256), [0]);
    assert_eq!(encode(uint8(), -1), [255]);
    assert_eq!(encode(int8(), 128), [0x80]);
    assert_eq!(encode(uint16be(), 65_537), [0, 1]);

    let decoded = Decoder::new(&int8()).unwrap().decode(&encode(int8(), 128)).unwrap();
    assert_eq!(decoded, Value::Int(-128));
}

#[test]
fn test_float_edge_values() {
    let encoder = Encoder::new(&float64le()).unwrap();
    let decoder = Decoder::new(&float64le()).unwrap();

    for value in [
        0.0,
        -0.0,
        1.5,
        f64::MAX,
        f64::MIN,
        f64::MIN_POSITIVE,
        -f64::MIN_POSITIVE,
        f64::INFINITY,
        f64::NEG_INFINITY,
    ] {
        let bytes = encoder.encode(&Value::Float(value)).unwrap();
        let decoded = decoder.decode(&bytes).unwrap().as_float();
        assert_eq!(decoded.to_bits(), value.to_bits(), "{}", value);
    }

    let encoder = Encoder::new(&float32be()).unwrap();
    let decoder = Decoder::new(&float32be()).unwrap();
    for value in [
        0.0f32,
        -0.0,
        f32::MAX,
        f32::MIN,
        f32::MIN_POSITIVE,
        -f32::MIN_POSITIVE,
        f32::INFINITY,
        f32::NEG_INFINITY,
    ] {
        let bytes = encoder.encode(&Value::Float(value as f64)).unwrap();
        assert_eq!(bytes, value.to_be_bytes());
        let decoded = decoder.decode(&bytes).unwrap().as_float() as f32;
        assert_eq!(decoded.to_bits(), value.to_bits(), "{}", value);
    }

    let nan = encoder.encode(&Value::Float(f64::NAN)).unwrap();
    assert!(decoder.decode(&nan).unwrap().as_float().is_nan());

    // float32 rounds to single precision
    let bytes = Encoder::new(&float32le()).unwrap().encode(&Value::Float(0.1)).unwrap();
    let value = Decoder::new(&float32le()).unwrap().decode(&bytes).unwrap();
    assert_eq!(value, Value::Float(0.1f32 as f64));

    // Integers written to float fields come back equal.
    let bytes = Encoder::new(&float32le()).unwrap().encode(&Value::Int(3)).unwrap();
    assert_eq!(Decoder::new(&float32le()).unwrap().decode(&bytes).unwrap(), Value::Int(3));
}

#[test]
fn test_floats_wrap_into_int_fields() {
    let encoder = Encoder::new(&uint32le()).unwrap();
    let bytes = encoder.encode(&Value::Float(1e20)).unwrap();
    assert_eq!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 1_661_992_960);

    let bytes = encoder.encode(&Value::Float(-1.9)).unwrap();
    assert_eq!(bytes, [0xff; 4]);

    let bytes = Encoder::new(&int8()).unwrap().encode(&Value::Float(300.7)).unwrap();
    assert_eq!(bytes, [44]);
}

#[test]
fn test_bool() {
    let decoder = Decoder::new(&boolean()).unwrap();
    assert_eq!(decoder.decode(&[1]).unwrap(), Value::Bool(true));
    assert_eq!(decoder.decode(&[0]).unwrap(), Value::Bool(false));
    assert_eq!(decoder.decode(&[7]).unwrap(), Value::Bool(true));

    let encoder = Encoder::new(&boolean()).unwrap();
    assert_eq!(encoder.encode(&Value::Bool(true)).unwrap(), [1]);
}

#[test]
fn test_strings() {
    let schema = string(6);
    let encoder = Encoder::new(&schema).unwrap();
    let decoder = Decoder::new(&schema).unwrap();

    let bytes = encoder.encode(&Value::from("héllo")).unwrap();
    assert_eq!(bytes, [b'h', 0xc3, 0xa9, b'l', b'l', b'o']);
    assert_eq!(decoder.decode(&bytes).unwrap(), Value::from("héllo"));

    let bytes = encoder.encode(&Value::from("abc")).unwrap();
    assert_eq!(bytes, [b'a', b'b', b'c', 0, 0, 0]);
    assert_eq!(decoder.decode(&bytes).unwrap(), Value::from("abc"));

    // Truncated to the field, never past it.
    let mut dest = [0xffu8; 8];
    encoder.encode_into(&Value::from("abcdefgh"), &mut dest, 1).unwrap();
    assert_eq!(dest, [0xff, b'a', b'b', b'c', b'd', b'e', b'f', 0xff]);
}

#[test]
fn test_ascii_strings() {
    let schema = string_with_encoding(4, Encoding::Ascii);
    let bytes = Encoder::new(&schema).unwrap().encode(&Value::from("ab")).unwrap();
    assert_eq!(bytes, [b'a', b'b', 0, 0]);

    let decoded = Decoder::new(&schema).unwrap().decode(&[0xc1, 0x42, 0, 0x43]).unwrap();
    assert_eq!(decoded, Value::from("AB"));
}

#[test]
fn test_struct_round_trip() {
    let schema = structure([
        ("a", uint8()),
        ("b", int16le()),
        ("c", int32le()),
        ("d", uint8()),
    ])
    .unwrap();

    let value = Value::object([
        ("a", Value::Int(1)),
        ("b", Value::Int(-2)),
        ("c", Value::Int(3)),
        ("d", Value::Int(4)),
    ]);

    let bytes = Encoder::new(&schema).unwrap().encode(&value).unwrap();
    assert_eq!(bytes, [1, 0, 0xfe, 0xff, 3, 0, 0, 0, 4]);
    assert_eq!(Decoder::new(&schema).unwrap().decode(&bytes).unwrap(), value);
}

#[test]
fn test_reordered_struct_writes_reordered_layout() {
    let schema = structure_with(
        [("a", uint8()), ("b", uint32le()), ("c", uint8())],
        StructOptions::default().reorder(),
    )
    .unwrap();

    let value = Value::object([("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))]);
    let bytes = Encoder::new(&schema).unwrap().encode(&value).unwrap();
    assert_eq!(bytes, [1, 3, 0, 0, 2, 0, 0, 0]);
}

#[test]
fn test_arrays_and_tuples() {
    let schema = array(&int16le(), 3);
    let bytes = Encoder::new(&schema).unwrap().encode(&ints(&[1, -1, 256])).unwrap();
    assert_eq!(bytes, [1, 0, 0xff, 0xff, 0, 1]);
    assert_eq!(Decoder::new(&schema).unwrap().decode(&bytes).unwrap(), ints(&[1, -1, 256]));

    let element = structure([("a", float64le()), ("b", uint8())]).unwrap();
    let packed = array_with(&element, 2, ArrayOptions::pack(2)).unwrap();
    let value = Value::Array(vec![
        Value::object([("a", Value::Float(1.0)), ("b", Value::Int(2))]),
        Value::object([("a", Value::Float(3.0)), ("b", Value::Int(4))]),
    ]);
    let bytes = Encoder::new(&packed).unwrap().encode(&value).unwrap();
    assert_eq!(bytes.len(), 19);
    assert_eq!(bytes[8], 2);
    assert_eq!(bytes[18], 4);
    assert_eq!(Decoder::new(&packed).unwrap().decode(&bytes).unwrap(), value);

    let pair = tuple([uint8(), float32le()]);
    let value = Value::Array(vec![Value::Int(7), Value::Float(0.5)]);
    let bytes = Encoder::new(&pair).unwrap().encode(&value).unwrap();
    assert_eq!(bytes, [7, 0, 0, 0, 0, 0, 0, 0x3f]);
    assert_eq!(Decoder::new(&pair).unwrap().decode(&bytes).unwrap(), value);
}

#[test]
fn test_bitfields() {
    let schema = bitfield_schema();
    let storage = 673_186_565u32;

    let bytes = Encoder::new(&schema).unwrap().encode(&bitfield_value()).unwrap();
    assert_eq!(bytes, storage.to_ne_bytes());

    let decoded = Decoder::new(&schema).unwrap().decode(&storage.to_ne_bytes()).unwrap();
    assert_eq!(decoded, bitfield_value());

    // Members keep only their own bits.
    let small = bitfield_with([("a", 2), ("b", 3)], &uint8()).unwrap();
    let value = Value::object([("a", Value::Int(7)), ("b", Value::Int(1))]);
    assert_eq!(Encoder::new(&small).unwrap().encode(&value).unwrap(), [0b0000_0111]);
}

#[test]
fn test_buffers() {
    let schema = buffer(4);
    let data = vec![1, 2, 3, 4];
    let bytes = Encoder::new(&schema).unwrap().encode(&Value::Bytes(data.clone())).unwrap();
    assert_eq!(bytes, data);
    assert_eq!(Decoder::new(&schema).unwrap().decode(&bytes).unwrap(), Value::Bytes(data));
}

#[test]
fn test_offsets() {
    let schema = structure([("x", uint16le()), ("y", uint16le())]).unwrap();
    let value = Value::object([("x", Value::Int(1)), ("y", Value::Int(2))]);

    let mut dest = vec![0xaa; 7];
    Encoder::new(&schema).unwrap().encode_into(&value, &mut dest, 3).unwrap();
    assert_eq!(dest, [0xaa, 0xaa, 0xaa, 1, 0, 2, 0]);

    let decoded = Decoder::new(&schema).unwrap().decode_at(&dest, 3).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_buffer_too_small() {
    let decoder = Decoder::new(&float64()).unwrap();
    match decoder.decode(&[0; 4]) {
        Err(StructlyError::BufferTooSmall { needed, available }) => {
            assert_eq!((needed, available), (8, 4));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(decoder.decode_at(&[0; 8], 1).is_err());

    let encoder = Encoder::new(&uint32()).unwrap();
    let mut dest = [0xeeu8; 5];
    assert!(matches!(
        encoder.encode_into(&Value::Int(1), &mut dest, 2),
        Err(StructlyError::BufferTooSmall { needed: 6, available: 5 })
    ));
    assert_eq!(dest, [0xee; 5]);
    assert!(encoder.encode_into(&Value::Int(1), &mut dest, 1).is_ok());
}

#[test]
fn test_unvalidated_encoder_checks_size() {
    let encoder = Encoder::with_options(&uint32(), EncoderOptions { validate: false }).unwrap();

    let mut dest = [0xeeu8; 2];
    assert!(matches!(
        encoder.encode_into(&Value::Int(1), &mut dest, 0),
        Err(StructlyError::BufferTooSmall { needed: 4, available: 2 })
    ));
    assert_eq!(dest, [0xee; 2]);

    let mut dest = [0xeeu8; 6];
    assert!(matches!(
        encoder.encode_into(&Value::Int(1), &mut dest, 3),
        Err(StructlyError::BufferTooSmall { needed: 7, available: 6 })
    ));
    assert_eq!(dest, [0xee; 6]);
}

#[test]
fn test_encoder_validates() {
    let schema = structure([("a", uint8()), ("b", boolean())]).unwrap();
    let encoder = Encoder::new(&schema).unwrap();

    match encoder.encode(&Value::object([("a", Value::from("x")), ("b", Value::Bool(true))])) {
        Err(StructlyError::Mismatch(mismatch)) => {
            assert_eq!(
                mismatch.field("a").and_then(Mismatch::message),
                Some("Invalid type: string, should be number")
            );
            assert!(mismatch.field("b").is_none());
        }
        other => panic!("unexpected {:?}", other),
    }

    // A rejected value leaves the destination untouched.
    let mut dest = [0xeeu8; 2];
    let bad = Value::object([("a", Value::Int(1)), ("b", Value::Int(1))]);
    assert!(matches!(
        encoder.encode_into(&bad, &mut dest, 0),
        Err(StructlyError::Mismatch(_))
    ));
    assert_eq!(dest, [0xee; 2]);

    // Without validation the value is coerced instead.
    let lenient = Encoder::with_options(&schema, EncoderOptions { validate: false }).unwrap();
    let bytes = lenient.encode(&Value::object([("a", Value::Float(3.7))])).unwrap();
    assert_eq!(bytes, [3, 0]);
}

#[test]
fn test_unvalidated_decoder_reads_in_range() {
    let decoder = Decoder::with_options(&uint8(), DecoderOptions { validate: false }).unwrap();
    assert_eq!(decoder.decode_at(&[1, 2], 1).unwrap(), Value::Int(2));
}

#[test]
fn test_decode_into_reuses_containers() {
    let schema = structure([
        ("name", string(8)),
        ("list", array(&uint8(), 3)),
        ("flags", bitfield_schema()),
        ("raw", buffer(2)),
    ])
    .unwrap();
    let decoder = Decoder::new(&schema).unwrap();
    let encoder = Encoder::new(&schema).unwrap();

    let first = Value::object([
        ("name", Value::from("one")),
        ("list", ints(&[1, 2, 3])),
        ("flags", bitfield_value()),
        ("raw", Value::Bytes(vec![1, 2])),
    ]);
    let second = Value::object([
        ("name", Value::from("two")),
        ("list", ints(&[4, 5, 6])),
        ("flags", bitfield_value()),
        ("raw", Value::Bytes(vec![3, 4])),
    ]);

    let mut target = decoder.decode(&encoder.encode(&first).unwrap()).unwrap();
    target.set("extra", Value::Bool(true));

    let list_ptr = target.get("list").unwrap().as_array().as_ptr();
    decoder
        .decode_into(&encoder.encode(&second).unwrap(), &mut target, 0)
        .unwrap();

    assert_eq!(target.get("list").unwrap().as_array().as_ptr(), list_ptr);
    assert_eq!(target.get("list"), second.get("list"));
    assert_eq!(target.get("name"), second.get("name"));
    assert_eq!(target.get("raw"), second.get("raw"));
    assert_eq!(target.get("extra"), Some(&Value::Bool(true)));
}

#[test]
fn test_decode_into_replaces_wrong_shapes() {
    let decoder = Decoder::new(&array(&uint8(), 2)).unwrap();

    let mut target = Value::from("not an array");
    decoder.decode_into(&[1, 2], &mut target, 0).unwrap();
    assert_eq!(target, ints(&[1, 2]));

    let mut longer = ints(&[9, 9, 9, 9]);
    decoder.decode_into(&[3, 4], &mut longer, 0).unwrap();
    assert_eq!(longer, ints(&[3, 4]));
}

#[test]
fn test_stale_schema_is_rejected() {
    let schema = parse_schema(r#"{ "version": 4, "schema": "uint8" }"#).unwrap();
    assert!(matches!(
        Decoder::new(&schema),
        Err(StructlyError::VersionMismatch { found: 4, .. })
    ));
    assert!(Encoder::new(&schema).is_err());
}
