use std::sync::Arc;

use structly_schema::{create_mask, Encoding, Endian, NumberKind, Schema, SchemaKind};
use tracing::trace;

use crate::{error::Result, verifier::verify_schema};

/// One step of a compiled codec.
///
/// Offsets are relative to the base address the op is run at. Struct and
/// tuple members are compiled against their parent's base, so a whole
/// non-array subtree shares one base. Array elements are compiled at offset
/// zero and run at `base + offset + i * stride`.
#[derive(Debug)]
pub enum Op {
    Number {
        offset: usize,
        kind:   NumberKind,
        endian: Endian,
    },
    Bool {
        offset: usize,
    },
    String {
        offset:     usize,
        max_length: usize,
        encoding:   Encoding,
    },
    Array {
        offset:  usize,
        length:  usize,
        stride:  usize,
        element: Arc<Op>,
    },
    Tuple {
        elements: Vec<Arc<Op>>,
    },
    Struct {
        fields: Vec<(Arc<str>, Arc<Op>)>,
    },
    Bitfield {
        offset:  usize,
        kind:    NumberKind,
        endian:  Endian,
        members: Vec<BitSlot>,
    },
    Buffer {
        offset: usize,
        length: usize,
    },
}

/// Position of one bitfield member inside its storage integer.
#[derive(Debug, Clone)]
pub struct BitSlot {
    pub name:  Arc<str>,
    pub bits:  u32,
    pub shift: u32,
    pub mask:  u32,
}

impl BitSlot {
    #[inline]
    pub fn extract(&self, storage: u32) -> u32 {
        storage.checked_shr(self.shift).unwrap_or(0) & self.mask
    }

    /// Replaces this member's bits in `storage` with the low bits of `value`.
    #[inline]
    pub fn insert(&self, storage: u32, value: u32) -> u32 {
        let clear = !self.mask.checked_shl(self.shift).unwrap_or(0);
        (storage & clear) | (value & self.mask).checked_shl(self.shift).unwrap_or(0)
    }
}

impl Op {
    /// Whether views need a cached child node for this op.
    pub fn is_composite(&self) -> bool {
        matches!(
            *self,
            Op::Array { .. } | Op::Tuple { .. } | Op::Struct { .. } | Op::Bitfield { .. }
        )
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        match *self {
            Op::Struct { ref fields } => fields.iter().position(|(field, _)| &**field == name),
            Op::Bitfield { ref members, .. } => {
                members.iter().position(|member| &*member.name == name)
            }
            _ => None,
        }
    }
}

/// A schema compiled into an op tree, ready to encode and decode.
///
/// A codec holds no reference to its schema, so caching one never keeps a
/// schema alive.
#[derive(Debug)]
pub struct Codec {
    root:           Arc<Op>,
    byte_length:    usize,
    byte_alignment: usize,
}

impl Codec {
    pub fn root(&self) -> &Arc<Op> {
        &self.root
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    pub fn byte_alignment(&self) -> usize {
        self.byte_alignment
    }
}

/// Compiles `schema` into a [Codec]. Fails if any part of the schema was
/// built for a different layout version.
pub fn compile(schema: &Schema) -> Result<Codec> {
    verify_schema(schema)?;
    trace!("Compiling {:?} schema of {} bytes", schema.tag(), schema.byte_length());

    Ok(Codec {
        root:           compile_op(schema, 0),
        byte_length:    schema.byte_length(),
        byte_alignment: schema.byte_alignment(),
    })
}

fn compile_op(schema: &Schema, offset: usize) -> Arc<Op> {
    let op = match *schema.kind() {
        SchemaKind::Number { kind, endian } => Op::Number {
            offset,
            kind,
            endian: endian.unwrap_or(Endian::NATIVE),
        },

        SchemaKind::Bool => Op::Bool { offset },

        SchemaKind::String { encoding } => Op::String {
            offset,
            max_length: schema.byte_length(),
            encoding,
        },

        SchemaKind::Array {
            ref element,
            length,
            stride,
        } => Op::Array {
            offset,
            length,
            stride,
            element: compile_op(element, 0),
        },

        SchemaKind::Tuple { ref fields } => Op::Tuple {
            elements: fields
                .iter()
                .map(|field| compile_op(&field.schema, offset + field.byte_offset))
                .collect(),
        },

        SchemaKind::Struct { ref fields } => Op::Struct {
            fields: fields
                .iter()
                .map(|field| {
                    (
                        Arc::from(field.name.as_str()),
                        compile_op(&field.schema, offset + field.byte_offset),
                    )
                })
                .collect(),
        },

        SchemaKind::Bitfield {
            ref storage,
            ref members,
        } => {
            let (kind, endian) = match *storage.kind() {
                SchemaKind::Number { kind, endian } => (kind, endian.unwrap_or(Endian::NATIVE)),
                // Bitfield constructors only accept number storage.
                _ => (NumberKind::UInt32, Endian::NATIVE),
            };

            let mut shift = 0;
            let members = members
                .iter()
                .map(|member| {
                    let slot = BitSlot {
                        name: Arc::from(member.name.as_str()),
                        bits: member.bits,
                        shift,
                        mask: create_mask(member.bits),
                    };
                    shift += member.bits;
                    slot
                })
                .collect();

            Op::Bitfield {
                offset,
                kind,
                endian,
                members,
            }
        }

        SchemaKind::Buffer => Op::Buffer {
            offset,
            length: schema.byte_length(),
        },
    };

    Arc::new(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use structly_schema::*;

    #[test]
    fn struct_fields_share_the_parent_base() {
        let inner = structure([("x", uint8()), ("y", uint16())]).unwrap();
        let outer = structure([("a", uint32()), ("inner", inner)]).unwrap();
        let codec = compile(&outer).unwrap();

        assert_eq!(codec.byte_length(), 8);
        match &**codec.root() {
            Op::Struct { fields } => match &*fields[1].1 {
                Op::Struct { fields } => match &*fields[1].1 {
                    Op::Number { offset, .. } => assert_eq!(*offset, 6),
                    other => panic!("unexpected {:?}", other),
                },
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn array_elements_start_at_zero() {
        let schema = structure([("pad", uint8()), ("list", array(&uint16le(), 3))]).unwrap();
        let codec = compile(&schema).unwrap();
        match &**codec.root() {
            Op::Struct { fields } => match &*fields[1].1 {
                Op::Array {
                    offset,
                    stride,
                    element,
                    ..
                } => {
                    assert_eq!((*offset, *stride), (2, 2));
                    assert!(matches!(**element, Op::Number { offset: 0, .. }));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bit_slots() {
        let schema = bitfield([("a", 1), ("b", 7), ("c", 11)]).unwrap();
        let codec = compile(&schema).unwrap();
        let members = match &**codec.root() {
            Op::Bitfield { members, .. } => members.clone(),
            other => panic!("unexpected {:?}", other),
        };

        let shifts: Vec<u32> = members.iter().map(|m| m.shift).collect();
        assert_eq!(shifts, vec![0, 1, 8]);
        assert_eq!(members[2].mask, 0x7ff);

        let storage = members[1].insert(0xffff_ffff, 0);
        assert_eq!(storage, 0xffff_ff01);
        assert_eq!(members[1].extract(storage), 0);
        assert_eq!(members[2].extract(members[2].insert(0, 0xfff)), 0x7ff);
    }

    #[test]
    fn stale_schema_is_rejected() {
        let schema = parse_schema(r#"{ "version": 1, "schema": "uint8" }"#).unwrap();
        assert!(compile(&schema).is_err());
    }
}
