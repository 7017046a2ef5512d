use std::collections::BTreeMap;

use structly_schema::{Schema, SchemaKind, Value};

use crate::{
    error::{Mismatch, Result},
    verifier::verify_schema,
};

/// Checks that `value` has the shape `schema` expects.
///
/// Returns `Ok(None)` when it does. Otherwise the [Mismatch] names only the
/// parts that failed. Values are not range-checked: any number is accepted
/// for any number schema, and strings may be longer than the field.
pub fn validate_data(schema: &Schema, value: &Value) -> Result<Option<Mismatch>> {
    verify_schema(schema)?;
    Ok(check(schema, Some(value)))
}

/// `typeof` style name, where every composite reports as an object.
fn kind_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Int(_)) | Some(Value::Float(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Bytes(_)) | Some(Value::Array(_)) | Some(Value::Object(_)) => "object",
    }
}

fn check_type(expected: &str, value: Option<&Value>) -> Option<Mismatch> {
    let actual = kind_name(value);
    if actual == expected {
        None
    } else {
        Some(Mismatch::Message(format!(
            "Invalid type: {}, should be {}",
            actual, expected
        )))
    }
}

fn check_equal(name: &str, expected: usize, actual: usize) -> Option<Mismatch> {
    if expected == actual {
        None
    } else {
        Some(Mismatch::Message(format!(
            "Invalid {}: {}, should be {}",
            name, actual, expected
        )))
    }
}

fn elements<I>(failures: I) -> Option<Mismatch>
where
    I: Iterator<Item = (usize, Option<Mismatch>)>,
{
    let map: BTreeMap<usize, Mismatch> = failures
        .filter_map(|(i, failure)| failure.map(|failure| (i, failure)))
        .collect();
    if map.is_empty() {
        None
    } else {
        Some(Mismatch::Elements(map))
    }
}

fn fields<'a, I>(failures: I) -> Option<Mismatch>
where
    I: Iterator<Item = (&'a str, Option<Mismatch>)>,
{
    let map: BTreeMap<String, Mismatch> = failures
        .filter_map(|(name, failure)| failure.map(|failure| (name.to_owned(), failure)))
        .collect();
    if map.is_empty() {
        None
    } else {
        Some(Mismatch::Fields(map))
    }
}

fn check(schema: &Schema, value: Option<&Value>) -> Option<Mismatch> {
    match schema.kind() {
        SchemaKind::Number { .. } => check_type("number", value),
        SchemaKind::Bool => check_type("boolean", value),
        SchemaKind::String { .. } => check_type("string", value),

        SchemaKind::Array {
            element, length, ..
        } => check_type("object", value).or_else(|| match value {
            Some(Value::Array(values)) => check_equal("length", *length, values.len())
                .or_else(|| {
                    elements(
                        values
                            .iter()
                            .enumerate()
                            .map(|(i, value)| (i, check(element, Some(value)))),
                    )
                }),
            _ => Some(Mismatch::Message("Data is not an array".to_owned())),
        }),

        SchemaKind::Tuple { fields: members } => {
            check_type("object", value).or_else(|| match value {
                Some(Value::Array(values)) => check_equal("length", members.len(), values.len())
                    .or_else(|| {
                        elements(
                            members
                                .iter()
                                .enumerate()
                                .map(|(i, field)| (i, check(&field.schema, values.get(i)))),
                        )
                    }),
                _ => Some(Mismatch::Message("Data is not an array".to_owned())),
            })
        }

        SchemaKind::Struct { fields: members } => check_type("object", value).or_else(|| {
            let value = value?;
            fields(members.iter().map(|field| {
                (
                    field.name.as_str(),
                    check(&field.schema, value.get(&field.name)),
                )
            }))
        }),

        SchemaKind::Bitfield { members, .. } => check_type("object", value).or_else(|| {
            let value = value?;
            fields(members.iter().map(|member| {
                (
                    member.name.as_str(),
                    check_type("number", value.get(&member.name)),
                )
            }))
        }),

        SchemaKind::Buffer => check_type("object", value).or_else(|| match value {
            Some(Value::Bytes(bytes)) => check_equal("byteLength", schema.byte_length(), bytes.len()),
            _ => Some(Mismatch::Message("Data is not a Buffer".to_owned())),
        }),
    }
}
