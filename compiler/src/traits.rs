use std::collections::HashMap;

use structly_schema::Value;

use crate::error::{Result, StructlyError};

/// Conversion from decoded [Value]s into typed Rust data.
///
/// Integer conversions wrap the way the codec does, so a field decoded from
/// a `uint8` always fits a `u8`.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn unexpected(expected: &'static str, value: &Value) -> StructlyError {
    StructlyError::UnexpectedValue {
        expected,
        found: value.type_name(),
    }
}

/// Reads a required field out of a decoded struct.
pub fn field<T: FromValue>(value: &Value, name: &str) -> Result<T> {
    match value.get(name) {
        Some(field) => T::from_value(field),
        None => Err(StructlyError::MissingField(name.to_owned())),
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Value> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<bool> {
        match *value {
            Value::Bool(value) => Ok(value),
            _ => Err(unexpected("boolean", value)),
        }
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<$ty> {
                    match *value {
                        Value::Int(int) => Ok(int as $ty),
                        _ => Err(unexpected("integer", value)),
                    }
                }
            }
        )*
    };
}

from_int!(i8, u8, i16, u16, i32, u32, i64);

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<f32> {
        f64::from_value(value).map(|float| float as f32)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<f64> {
        match *value {
            Value::Float(float) => Ok(float),
            Value::Int(int) => Ok(int as f64),
            _ => Err(unexpected("number", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<String> {
        match *value {
            Value::String(ref string) => Ok(string.clone()),
            _ => Err(unexpected("string", value)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Vec<T>> {
        match *value {
            Value::Array(ref values) => values.iter().map(T::from_value).collect(),
            Value::Bytes(ref bytes) => bytes
                .iter()
                .map(|byte| T::from_value(&Value::Int(*byte as i64)))
                .collect(),
            _ => Err(unexpected("array", value)),
        }
    }
}

impl<T: FromValue, const N: usize> FromValue for [T; N] {
    fn from_value(value: &Value) -> Result<[T; N]> {
        let values = Vec::<T>::from_value(value)?;
        values
            .try_into()
            .map_err(|_| unexpected("fixed-length array", value))
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: &Value) -> Result<HashMap<String, T>> {
        match *value {
            Value::Object(ref fields) => fields
                .iter()
                .map(|(name, value)| T::from_value(value).map(|value| (name.clone(), value)))
                .collect(),
            _ => Err(unexpected("object", value)),
        }
    }
}
