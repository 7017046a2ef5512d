use structly_schema::{truncate_float, write_float, write_int, write_string, ByteSink, Value};

use crate::compiler::Op;

/// Writes `value` at `base` following `op`.
///
/// Values are coerced rather than checked: integers wrap to the field width,
/// floats truncate when written to integer fields, and a non-number written
/// to a float field becomes NaN. Struct fields and array or tuple elements
/// missing from `value` leave their bytes untouched.
pub fn write<W: ByteSink + ?Sized>(op: &Op, value: &Value, sink: &mut W, base: usize) {
    match *op {
        Op::Number {
            offset,
            kind,
            endian,
        } => {
            if kind.is_float() {
                write_float(sink, base + offset, kind, endian, to_float(value));
            } else {
                write_int(sink, base + offset, kind, endian, to_int(value));
            }
        }

        Op::Bool { offset } => sink.write_bytes(base + offset, &[is_truthy(value) as u8]),

        Op::String {
            offset,
            max_length,
            encoding,
        } => write_string(sink, base + offset, max_length, encoding, value.as_str()),

        Op::Buffer { offset, length } => {
            let bytes = value.as_bytes();
            sink.write_bytes(base + offset, &bytes[..bytes.len().min(length)]);
        }

        Op::Array {
            offset,
            length,
            stride,
            ref element,
        } => {
            for (i, value) in value.as_array().iter().take(length).enumerate() {
                write(element, value, sink, base + offset + i * stride);
            }
        }

        Op::Tuple { ref elements } => {
            for (element, value) in elements.iter().zip(value.as_array()) {
                write(element, value, sink, base);
            }
        }

        Op::Struct { ref fields } => {
            for (name, field) in fields {
                if let Some(value) = value.get(name) {
                    write(field, value, sink, base);
                }
            }
        }

        Op::Bitfield {
            offset,
            kind,
            endian,
            ref members,
        } => {
            let storage = members.iter().fold(0u32, |storage, member| {
                let bits = value.get(&member.name).map(to_int).unwrap_or(0) as u32;
                member.insert(storage, bits)
            });
            write_int(sink, base + offset, kind, endian, storage as i64);
        }
    }
}

/// Integer coercion: floats truncate toward zero and wrap, booleans become
/// 0 or 1, anything else is 0.
pub fn to_int(value: &Value) -> i64 {
    match *value {
        Value::Int(value) => value,
        Value::Float(value) => truncate_float(value),
        Value::Bool(value) => value as i64,
        _ => 0,
    }
}

pub fn to_float(value: &Value) -> f64 {
    match *value {
        Value::Int(value) => value as f64,
        Value::Float(value) => value,
        Value::Bool(value) => value as u8 as f64,
        _ => f64::NAN,
    }
}

fn is_truthy(value: &Value) -> bool {
    match *value {
        Value::Bool(value) => value,
        Value::Int(value) => value != 0,
        Value::Float(value) => value != 0.0 && !value.is_nan(),
        Value::String(ref value) => !value.is_empty(),
        Value::Bytes(_) | Value::Array(_) | Value::Object(_) => true,
    }
}
