use std::collections::HashMap;

use structly_schema::{read_float, read_int, read_string, read_string_into, ByteSource, Value};

use crate::compiler::Op;

/// Reads the value described by `op` at `base`.
pub fn read<S: ByteSource + ?Sized>(op: &Op, source: &S, base: usize) -> Value {
    let mut value = Value::Bool(false);
    read_into(op, source, base, &mut value);
    value
}

/// Reads the value described by `op` at `base` into `target`.
///
/// When `target` already has the right shape its allocations are reused:
/// arrays are resized in place, objects keep their maps (and any extra keys),
/// and strings and byte buffers keep their storage.
pub fn read_into<S: ByteSource + ?Sized>(op: &Op, source: &S, base: usize, target: &mut Value) {
    match *op {
        Op::Number {
            offset,
            kind,
            endian,
        } => {
            *target = if kind.is_float() {
                Value::Float(read_float(source, base + offset, kind, endian))
            } else {
                Value::Int(read_int(source, base + offset, kind, endian))
            };
        }

        Op::Bool { offset } => *target = Value::Bool(source.byte_at(base + offset) != 0),

        Op::String {
            offset,
            max_length,
            encoding,
        } => match *target {
            Value::String(ref mut out) => {
                read_string_into(source, base + offset, max_length, encoding, out)
            }
            _ => *target = Value::String(read_string(source, base + offset, max_length, encoding)),
        },

        Op::Buffer { offset, length } => {
            if !matches!(*target, Value::Bytes(_)) {
                *target = Value::Bytes(Vec::with_capacity(length));
            }
            if let Value::Bytes(ref mut bytes) = *target {
                bytes.resize(length, 0);
                source.copy_to(base + offset, bytes);
            }
        }

        Op::Array {
            offset,
            length,
            stride,
            ref element,
        } => {
            let values = array_target(target, length);
            for i in 0..length {
                let element_base = base + offset + i * stride;
                match values.get_mut(i) {
                    Some(value) => read_into(element, source, element_base, value),
                    None => values.push(read(element, source, element_base)),
                }
            }
        }

        Op::Tuple { ref elements } => {
            let values = array_target(target, elements.len());
            for (i, element) in elements.iter().enumerate() {
                match values.get_mut(i) {
                    Some(value) => read_into(element, source, base, value),
                    None => values.push(read(element, source, base)),
                }
            }
        }

        Op::Struct { ref fields } => {
            let map = object_target(target, fields.len());
            for (name, field) in fields {
                match map.get_mut(&**name) {
                    Some(value) => read_into(field, source, base, value),
                    None => {
                        map.insert(name.to_string(), read(field, source, base));
                    }
                }
            }
        }

        Op::Bitfield {
            offset,
            kind,
            endian,
            ref members,
        } => {
            let storage = read_int(source, base + offset, kind, endian) as u32;
            let map = object_target(target, members.len());
            for member in members {
                let value = Value::Int(member.extract(storage) as i64);
                match map.get_mut(&*member.name) {
                    Some(slot) => *slot = value,
                    None => {
                        map.insert(member.name.to_string(), value);
                    }
                }
            }
        }
    }
}

fn array_target(target: &mut Value, length: usize) -> &mut Vec<Value> {
    if !matches!(*target, Value::Array(_)) {
        *target = Value::Array(Vec::with_capacity(length));
    }
    match *target {
        Value::Array(ref mut values) => {
            values.truncate(length);
            values
        }
        _ => unreachable!(),
    }
}

fn object_target(target: &mut Value, capacity: usize) -> &mut HashMap<String, Value> {
    if !matches!(*target, Value::Object(_)) {
        *target = Value::Object(HashMap::with_capacity(capacity));
    }
    match *target {
        Value::Object(ref mut map) => map,
        _ => unreachable!(),
    }
}
