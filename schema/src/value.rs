use crate::{
    error::{Result, StructlyError},
    schema::{Schema, SchemaKind},
};

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

/// This type holds dynamic structly data.
///
/// A Value mirrors the shape of a [Schema]: numbers decode to
/// [Int](#variant.Int) or [Float](#variant.Float), strings to
/// [String](#variant.String), buffers to [Bytes](#variant.Bytes), arrays and
/// tuples to [Array](#variant.Array), and structs and bitfields to
/// [Object](#variant.Object).
///
/// Equality compares numbers by value, so `Int(3) == Float(3.0)`. A number
/// written to a float field and decoded again still compares equal.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl Value {
    /// Builds an [Object](#variant.Object) from name/value pairs.
    pub fn object<I, K>(fields: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// The name validation messages use for this kind of value.
    pub fn type_name(&self) -> &'static str {
        match *self {
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "buffer",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// Returns the value of an [Int](#variant.Int), or the truncated value of
    /// a [Float](#variant.Float). Returns `0` for other value kinds.
    pub fn as_int(&self) -> i64 {
        match *self {
            Value::Int(value) => value,
            Value::Float(value) => value as i64,
            _ => 0,
        }
    }

    /// Returns the value of a [Float](#variant.Float) or an
    /// [Int](#variant.Int). Returns `0.0` for other value kinds.
    pub fn as_float(&self) -> f64 {
        match *self {
            Value::Float(value) => value,
            Value::Int(value) => value as f64,
            _ => 0.0,
        }
    }

    /// A convenience method to extract the value out of a [String](#variant.String).
    /// Returns `""` for other value kinds.
    pub fn as_str(&self) -> &str {
        match *self {
            Value::String(ref value) => value.as_str(),
            _ => "",
        }
    }

    /// Returns `&[]` for anything but [Bytes](#variant.Bytes).
    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            Value::Bytes(ref value) => value.as_slice(),
            _ => &[],
        }
    }

    /// A convenience method to get an array of values out of an [Array](#variant.Array).
    /// Returns an empty array for other value kinds.
    pub fn as_array(&self) -> &[Value] {
        match *self {
            Value::Array(ref values) => values.as_slice(),
            _ => &[],
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match *self {
            Value::Object(ref fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(*self, Value::Int(_) | Value::Float(_))
    }

    /// A convenience method to extract the length out of an [Array](#variant.Array).
    /// Returns `0` for other value kinds.
    pub fn len(&self) -> usize {
        match *self {
            Value::Array(ref values) => values.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A convenience method to append to an [Array](#variant.Array). Does
    /// nothing for other value kinds.
    pub fn push(&mut self, value: Value) {
        if let Value::Array(ref mut values) = *self {
            values.push(value);
        }
    }

    /// A convenience method to extract a field out of an [Object](#variant.Object).
    /// Returns `None` for other value kinds or if the field isn't present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match *self {
            Value::Object(ref fields) => fields.get(name),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        match *self {
            Value::Object(ref mut fields) => fields.get_mut(name),
            _ => None,
        }
    }

    /// A convenience method to update a field on an [Object](#variant.Object).
    /// Does nothing for other value kinds.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Value::Object(ref mut fields) = *self {
            fields.insert(name.to_owned(), value);
        }
    }

    /// A convenience method to remove a field on an [Object](#variant.Object).
    /// Does nothing for other value kinds.
    pub fn remove(&mut self, name: &str) {
        if let Value::Object(ref mut fields) = *self {
            fields.remove(name);
        }
    }

    /// Converts parsed JSON into a value without schema guidance. JSON arrays
    /// always become [Array](#variant.Array), and `null` object members are
    /// dropped.
    pub fn from_json(json: &serde_json::Value) -> Result<Value> {
        match *json {
            serde_json::Value::Null => Err(StructlyError::UnexpectedValue {
                expected: "value",
                found:    "null",
            }),
            serde_json::Value::Bool(value) => Ok(Value::Bool(value)),
            serde_json::Value::Number(ref number) => Ok(match number.as_i64() {
                Some(value) => Value::Int(value),
                None => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
            }),
            serde_json::Value::String(ref value) => Ok(Value::String(value.clone())),
            serde_json::Value::Array(ref values) => Ok(Value::Array(
                values.iter().map(Value::from_json).collect::<Result<_>>()?,
            )),
            serde_json::Value::Object(ref fields) => {
                let mut map = HashMap::with_capacity(fields.len());
                for (name, value) in fields {
                    if !value.is_null() {
                        map.insert(name.clone(), Value::from_json(value)?);
                    }
                }
                Ok(Value::Object(map))
            }
        }
    }

    /// Converts parsed JSON into a value shaped by `schema`. Buffer fields
    /// accept a JSON array of byte values.
    pub fn from_json_with_schema(json: &serde_json::Value, schema: &Schema) -> Result<Value> {
        match (schema.kind(), json) {
            (SchemaKind::Buffer, serde_json::Value::Array(values)) => {
                let mut bytes = Vec::with_capacity(values.len());
                for value in values {
                    match value.as_u64() {
                        Some(byte) if byte <= u8::MAX as u64 => bytes.push(byte as u8),
                        _ => {
                            return Err(StructlyError::UnexpectedValue {
                                expected: "byte",
                                found:    json_type_name(value),
                            })
                        }
                    }
                }
                Ok(Value::Bytes(bytes))
            }

            (SchemaKind::Array { element, .. }, serde_json::Value::Array(values)) => Ok(
                Value::Array(
                    values
                        .iter()
                        .map(|value| Value::from_json_with_schema(value, element))
                        .collect::<Result<_>>()?,
                ),
            ),

            (SchemaKind::Tuple { fields }, serde_json::Value::Array(values)) => {
                let mut elements = Vec::with_capacity(values.len());
                for (i, value) in values.iter().enumerate() {
                    elements.push(match fields.get(i) {
                        Some(field) => Value::from_json_with_schema(value, &field.schema)?,
                        None => Value::from_json(value)?,
                    });
                }
                Ok(Value::Array(elements))
            }

            (SchemaKind::Struct { .. }, serde_json::Value::Object(fields)) => {
                let mut map = HashMap::with_capacity(fields.len());
                for (name, value) in fields {
                    if value.is_null() {
                        continue;
                    }
                    let value = match schema.field(name) {
                        Some(field) => Value::from_json_with_schema(value, &field.schema)?,
                        None => Value::from_json(value)?,
                    };
                    map.insert(name.clone(), value);
                }
                Ok(Value::Object(map))
            }

            _ => Value::from_json(json),
        }
    }

    /// Converts this value to JSON. [Bytes](#variant.Bytes) become arrays of
    /// numbers and non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match *self {
            Value::Bool(value) => serde_json::Value::Bool(value),
            Value::Int(value) => serde_json::Value::from(value),
            Value::Float(value) => serde_json::Number::from_f64(value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(ref value) => serde_json::Value::String(value.clone()),
            Value::Bytes(ref value) => {
                serde_json::Value::Array(value.iter().map(|byte| (*byte).into()).collect())
            }
            Value::Array(ref values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
            Value::Object(ref fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

fn json_type_name(json: &serde_json::Value) -> &'static str {
    match *json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Value {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int,
    u8 => Int,
    i16 => Int,
    u16 => Int,
    i32 => Int,
    u32 => Int,
    i64 => Int,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    Vec<Value> => Array,
    HashMap<String, Value> => Object,
}

impl Index<usize> for Value {
    type Output = Value;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't an [Array](#variant.Array) or if the
    /// provided index is out of bounds.
    fn index(&self, index: usize) -> &Value {
        match *self {
            Value::Array(ref values) => &values[index],
            _ => panic!("cannot index a {} value", self.type_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> std::result::Result<(), fmt::Error> {
        match *self {
            Value::Bool(value) => value.fmt(f),
            Value::Int(value) => value.fmt(f),
            Value::Float(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
            Value::Bytes(ref value) => write!(f, "<Buffer {:02x?}>", value),
            Value::Array(ref values) => values.fmt(f),

            Value::Object(ref fields) => {
                let mut keys: Vec<_> = fields.keys().collect();
                let mut first = true;
                keys.sort();
                write!(f, "{{")?;

                for key in keys {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, fields[key])?;
                }

                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{array, buffer, structure, uint8};

    #[test]
    fn value_basic() {
        let value = Value::Array(vec![
            Value::Bool(true),
            Value::Int(-1),
            Value::Float(0.5),
            Value::String("abc".to_owned()),
            Value::Bytes(vec![1, 2]),
            Value::object([
                ("key1", Value::from("value1")),
                ("key2", Value::from("value2")),
            ]),
        ]);

        assert_eq!(value.len(), 6);

        assert_eq!(value[0], Value::Bool(true));
        assert_eq!(value[1], Value::Int(-1));
        assert_eq!(value[2], Value::Float(0.5));
        assert_eq!(value[3], Value::String("abc".to_owned()));
        assert_eq!(value[4].as_bytes(), &[1, 2]);
        assert_eq!(value[5].get("key1"), Some(&Value::from("value1")));
        assert_eq!(value[5].get("key3"), None);

        assert_eq!(value[0].as_bool(), true);
        assert_eq!(value[1].as_int(), -1);
        assert_eq!(value[1].as_float(), -1.0);
        assert_eq!(value[2].as_float(), 0.5);
        assert_eq!(value[2].as_int(), 0);
        assert_eq!(value[3].as_str(), "abc");
        assert_eq!(value[3].as_int(), 0);
    }

    #[test]
    fn value_mutation() {
        let mut value = Value::object([("a", Value::Int(1))]);
        value.set("b", Value::Int(2));
        assert_eq!(value.get("b"), Some(&Value::Int(2)));
        value.remove("a");
        assert_eq!(value.get("a"), None);

        let mut array = Value::Array(vec![]);
        array.push(Value::Bool(false));
        assert_eq!(array.len(), 1);

        let mut number = Value::Int(3);
        number.push(Value::Bool(false));
        number.set("x", Value::Int(1));
        assert_eq!(number, Value::Int(3));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
        assert_eq!(Value::Float(-2.0), Value::Int(-2));
        assert_ne!(Value::Int(3), Value::Float(3.5));
        assert_ne!(Value::Int(1), Value::Bool(true));
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(
            Value::object([("x", Value::Int(0))]),
            Value::object([("x", Value::Float(0.0))])
        );
        assert_ne!(Value::Bytes(vec![1]), Value::Array(vec![Value::Int(1)]));
    }

    #[test]
    fn value_debug_sorts_keys() {
        let value = Value::object([
            ("b", Value::Array(vec![Value::Int(1), Value::Float(2.5)])),
            ("a", Value::Bool(true)),
        ]);
        assert_eq!(format!("{:?}", value), "{a: true, b: [1, 2.5]}");
        assert_eq!(format!("{:?}", Value::Bytes(vec![0, 255])), "<Buffer [00, ff]>");
    }

    #[test]
    fn value_type_names() {
        assert_eq!(Value::Int(1).type_name(), "number");
        assert_eq!(Value::Float(1.0).type_name(), "number");
        assert_eq!(Value::Bytes(vec![]).type_name(), "buffer");
        assert_eq!(Value::object(Vec::<(String, Value)>::new()).type_name(), "object");
    }

    #[test]
    fn json_conversion() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"a": 1, "b": [true, 2.5, "x"], "c": null}"#).unwrap();
        let value = Value::from_json(&json).unwrap();

        assert_eq!(value.get("a"), Some(&Value::Int(1)));
        assert_eq!(value.get("b").unwrap()[1], Value::Float(2.5));
        assert_eq!(value.get("c"), None);
        assert!(Value::from_json(&serde_json::Value::Null).is_err());

        let back = value.to_json();
        assert_eq!(back["a"], serde_json::json!(1));
        assert_eq!(back["b"], serde_json::json!([true, 2.5, "x"]));
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn json_buffers_follow_schema() {
        let schema = structure([("raw", buffer(3)), ("list", array(&uint8(), 3))]).unwrap();
        let json = serde_json::json!({"raw": [1, 2, 3], "list": [1, 2, 3]});
        let value = Value::from_json_with_schema(&json, &schema).unwrap();

        assert_eq!(value.get("raw"), Some(&Value::Bytes(vec![1, 2, 3])));
        assert_eq!(value.get("list").unwrap().len(), 3);

        let bad = serde_json::json!({"raw": [1, 256]});
        assert!(Value::from_json_with_schema(&bad, &schema).is_err());
    }
}
