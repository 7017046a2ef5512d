// example/src/main.rs

use structly::error::StructlyError;
use structly::traits::{field, FromValue};
use structly::*;

/// Typed mirror of the `attributes` struct.
#[derive(Debug)]
struct Attributes {
    str: u8,
    agi: u8,
    int: u8,
}

impl FromValue for Attributes {
    fn from_value(value: &Value) -> Result<Self, StructlyError> {
        Ok(Attributes {
            str: field(value, "str")?,
            agi: field(value, "agi")?,
            int: field(value, "int")?,
        })
    }
}

#[derive(Debug)]
struct Player {
    health:     u32,
    jumping:    bool,
    position:   [i16; 3],
    attributes: Attributes,
}

impl FromValue for Player {
    fn from_value(value: &Value) -> Result<Self, StructlyError> {
        Ok(Player {
            health:     field(value, "health")?,
            jumping:    field(value, "jumping")?,
            position:   field(value, "position")?,
            attributes: field(value, "attributes")?,
        })
    }
}

fn main() -> Result<(), StructlyError> {
    let attributes = structure([("str", uint8()), ("agi", uint8()), ("int", uint8())])?;
    let player = structure([
        ("health", uint32()),
        ("jumping", boolean()),
        ("position", array(&int16(), 3)),
        ("attributes", attributes),
    ])?;

    println!("player: {} bytes, aligned to {}", player.byte_length(), player.byte_alignment());

    // 1) Encode a plain value and decode it back into typed data.
    let converter = Converter::new(&player)?;
    let value = Value::object([
        ("health", Value::Int(4000)),
        ("jumping", Value::Bool(false)),
        ("position", Value::from(vec![Value::Int(-1), Value::Int(10), Value::Int(4)])),
        (
            "attributes",
            Value::object([
                ("str", Value::Int(10)),
                ("agi", Value::Int(5)),
                ("int", Value::Int(8)),
            ]),
        ),
    ]);

    let bytes = converter.encode(&value)?;
    let decoded: Player = Player::from_value(&converter.decode(&bytes)?)?;
    println!("decoded = {:?}", decoded);

    // 2) Invalid data is reported per field.
    let broken = Value::object([("health", Value::from("lots"))]);
    if let Err(err) = converter.encode(&broken) {
        println!("rejected: {}", err);
    }

    // 3) Edit the same bytes in place through a view.
    let mut buffer = bytes.clone();
    {
        let view = View::over(&player, &mut buffer, 0)?;
        if let Some(fields) = view.value().as_struct() {
            fields.set("jumping", &Value::Bool(true));
            if let Some(position) = fields.get("position").and_then(|access| access.as_array()) {
                position.set(1, &Value::Int(12));
            }
            println!("view    = {:?}", view.get());
        }
    }

    let edited = Player::from_value(&converter.decode(&buffer)?)?;
    println!(
        "edited: jumping={} y={} (health still {}, int {})",
        edited.jumping, edited.position[1], edited.health, edited.attributes.int
    );

    // 4) The same layout described as JSON.
    let described = parse_schema(
        r#"{
            "schema": {
                "struct": [
                    ["health", "uint32"],
                    ["jumping", "bool"],
                    ["position", { "array": "int16", "length": 3 }],
                    ["attributes", { "struct": [["str", "uint8"], ["agi", "uint8"], ["int", "uint8"]] }]
                ]
            }
        }"#,
    )?;
    assert_eq!(described, player);
    println!("{}", decode_to_json(&described, &buffer)?);

    Ok(())
}
