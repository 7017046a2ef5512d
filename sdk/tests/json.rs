use structly::*;

const PLAYER: &str = r#"{
    "version": 6,
    "schema": {
        "struct": [
            ["health", "uint32le"],
            ["jumping", "bool"],
            ["position", { "array": "int16le", "length": 3 }],
            ["attributes", { "struct": [["str", "uint8"], ["agi", "uint8"], ["int", "uint8"]] }],
            ["avatar", { "buffer": 2 }]
        ]
    }
}"#;

#[test]
fn test_json_round_trip() {
    let schema = parse_schema(PLAYER).unwrap();
    let input = r#"{
        "health": 4000,
        "jumping": true,
        "position": [1, -2, 3],
        "attributes": { "str": 10, "agi": 20, "int": 30 },
        "avatar": [255, 0]
    }"#;

    let bytes = encode_from_json(&schema, input).unwrap();
    assert_eq!(bytes.len(), 17);
    assert_eq!(&bytes[..5], &[0xa0, 0x0f, 0, 0, 1]);
    assert_eq!(&bytes[15..], &[255, 0]);

    let json: serde_json::Value = serde_json::from_str(&decode_to_json(&schema, &bytes).unwrap()).unwrap();
    let expected: serde_json::Value = serde_json::from_str(input).unwrap();
    assert_eq!(json, expected);
}

#[test]
fn test_json_validation_errors() {
    let schema = parse_schema(PLAYER).unwrap();
    let input = r#"{
        "health": "lots",
        "jumping": true,
        "position": [1, 2],
        "attributes": { "str": 10, "agi": 20, "int": 30 },
        "avatar": [1, 2]
    }"#;

    match encode_from_json(&schema, input) {
        Err(StructlyError::Mismatch(mismatch)) => {
            assert_eq!(
                mismatch.to_string(),
                r#"{"health":"Invalid type: string, should be number","position":"Invalid length: 2, should be 3"}"#
            );
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_typed_values() {
    #[derive(Debug, PartialEq)]
    struct Attributes {
        strength: u8,
        agility:  u8,
    }

    impl FromValue for Attributes {
        fn from_value(value: &Value) -> error::Result<Attributes> {
            Ok(Attributes {
                strength: field(value, "str")?,
                agility:  field(value, "agi")?,
            })
        }
    }

    let schema = parse_schema(PLAYER).unwrap();
    let bytes = View::new(&schema).unwrap().to_bytes();
    let value = decode(&schema, &bytes).unwrap();

    let attributes: Attributes = field(&value, "attributes").unwrap();
    assert_eq!(attributes, Attributes { strength: 0, agility: 0 });
    let position: [i16; 3] = field(&value, "position").unwrap();
    assert_eq!(position, [0, 0, 0]);
    assert!(field::<u8>(&value, "missing").is_err());
}

#[test]
fn test_shared_schemas_share_codecs() {
    let cache = CodecCache::new();
    let a = Decoder::with_cache(&uint16le(), DecoderOptions::default(), &cache).unwrap();
    let b = Encoder::with_cache(&uint16le(), EncoderOptions::default(), &cache).unwrap();
    assert!(a.schema().ptr_eq(b.schema()));
    assert_eq!(cache.len(), 1);
}
