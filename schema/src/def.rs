//! JSON descriptions of schemas.
//!
//! A description names primitives by string and spells composites as small
//! objects keyed by their kind:
//!
//! ```json
//! {
//!   "version": 6,
//!   "schema": {
//!     "struct": [
//!       ["health", "uint32le"],
//!       ["name", { "string": 16 }],
//!       ["position", { "array": "int16", "length": 3, "pack": true }],
//!       ["flags", { "bitfield": [["jumping", 1], ["crouching", 1]], "storage": "uint8" }]
//!     ],
//!     "reorder": true
//!   }
//! }
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, StructlyError},
    schema::{self, ArrayOptions, Encoding, Endian, NumberKind, Schema, StructOptions, SCHEMA_VERSION},
};

lazy_static! {
    static ref NUMBER_NAME: Regex = Regex::new(r"^(u?int)(8|16|32)(le|be)?$|^float(32|64)(le|be)?$").unwrap();
}

/// Alignment override: `true` packs to 1 byte, a number packs to that many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackDef {
    Flag(bool),
    Bytes(usize),
}

impl PackDef {
    pub fn byte_alignment(self) -> Option<usize> {
        match self {
            PackDef::Flag(true) => Some(1),
            PackDef::Flag(false) => None,
            PackDef::Bytes(bytes) => Some(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaDef {
    /// `"bool"` or a number name such as `"int8"`, `"uint16le"`, `"float64be"`.
    Named(String),
    String {
        string:   usize,
        #[serde(default)]
        encoding: Encoding,
    },
    Array {
        array:  Box<SchemaDef>,
        length: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pack:   Option<PackDef>,
    },
    Tuple {
        tuple: Vec<SchemaDef>,
    },
    Struct {
        #[serde(rename = "struct")]
        fields:  Vec<(String, SchemaDef)>,
        #[serde(default)]
        reorder: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pack:    Option<PackDef>,
    },
    Bitfield {
        bitfield: Vec<(String, u32)>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        storage:  Option<Box<SchemaDef>>,
    },
    Buffer {
        buffer:    usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alignment: Option<usize>,
    },
}

impl SchemaDef {
    /// Builds the schema this description names. Named numbers resolve to
    /// the shared instances.
    pub fn build(&self) -> Result<Schema> {
        match *self {
            SchemaDef::Named(ref name) => named_schema(name),

            SchemaDef::String { string, encoding } => {
                Ok(schema::string_with_encoding(string, encoding))
            }

            SchemaDef::Array {
                ref array,
                length,
                pack,
            } => schema::array_with(
                &array.build()?,
                length,
                ArrayOptions {
                    pack: pack.and_then(PackDef::byte_alignment),
                },
            ),

            SchemaDef::Tuple { ref tuple } => Ok(schema::tuple(
                tuple.iter().map(SchemaDef::build).collect::<Result<Vec<_>>>()?,
            )),

            SchemaDef::Struct {
                ref fields,
                reorder,
                pack,
            } => {
                let fields = fields
                    .iter()
                    .map(|(name, def)| def.build().map(|schema| (name.clone(), schema)))
                    .collect::<Result<Vec<_>>>()?;
                schema::structure_with(
                    fields,
                    StructOptions {
                        reorder,
                        pack: pack.and_then(PackDef::byte_alignment),
                    },
                )
            }

            SchemaDef::Bitfield {
                ref bitfield,
                ref storage,
            } => {
                let storage = match storage {
                    Some(storage) => storage.build()?,
                    None => schema::uint32(),
                };
                schema::bitfield_with(bitfield.iter().cloned(), &storage)
            }

            SchemaDef::Buffer { buffer, alignment } => {
                schema::buffer_aligned(buffer, alignment.unwrap_or(1))
            }
        }
    }
}

fn named_schema(name: &str) -> Result<Schema> {
    if name == "bool" {
        return Ok(schema::boolean());
    }

    let unknown = || StructlyError::Description(format!("Unknown type name \"{}\"", name));
    let captures = NUMBER_NAME.captures(name).ok_or_else(unknown)?;

    let (kind, endian) = match (captures.get(1), captures.get(2)) {
        (Some(sign), Some(bits)) => {
            let signed = sign.as_str() == "int";
            let kind = match (signed, bits.as_str()) {
                (true, "8") => NumberKind::Int8,
                (false, "8") => NumberKind::UInt8,
                (true, "16") => NumberKind::Int16,
                (false, "16") => NumberKind::UInt16,
                (true, _) => NumberKind::Int32,
                (false, _) => NumberKind::UInt32,
            };
            (kind, captures.get(3))
        }
        _ => {
            let kind = match captures.get(4).map(|bits| bits.as_str()) {
                Some("32") => NumberKind::Float32,
                _ => NumberKind::Float64,
            };
            (kind, captures.get(5))
        }
    };

    let endian = match endian.map(|suffix| suffix.as_str()) {
        // Single bytes have no byte order.
        Some(_) if kind.byte_length() == 1 => return Err(unknown()),
        Some("le") => Some(Endian::Little),
        Some(_) => Some(Endian::Big),
        None => None,
    };

    Ok(shared_number(kind, endian))
}

fn shared_number(kind: NumberKind, endian: Option<Endian>) -> Schema {
    use NumberKind::*;

    match (kind, endian) {
        (Int8, _) => schema::int8(),
        (UInt8, _) => schema::uint8(),
        (Int16, None) => schema::int16(),
        (Int16, Some(Endian::Little)) => schema::int16le(),
        (Int16, Some(Endian::Big)) => schema::int16be(),
        (UInt16, None) => schema::uint16(),
        (UInt16, Some(Endian::Little)) => schema::uint16le(),
        (UInt16, Some(Endian::Big)) => schema::uint16be(),
        (Int32, None) => schema::int32(),
        (Int32, Some(Endian::Little)) => schema::int32le(),
        (Int32, Some(Endian::Big)) => schema::int32be(),
        (UInt32, None) => schema::uint32(),
        (UInt32, Some(Endian::Little)) => schema::uint32le(),
        (UInt32, Some(Endian::Big)) => schema::uint32be(),
        (Float32, None) => schema::float32(),
        (Float32, Some(Endian::Little)) => schema::float32le(),
        (Float32, Some(Endian::Big)) => schema::float32be(),
        (Float64, None) => schema::float64(),
        (Float64, Some(Endian::Little)) => schema::float64le(),
        (Float64, Some(Endian::Big)) => schema::float64be(),
    }
}

fn current_version() -> u32 {
    SCHEMA_VERSION
}

/// A schema description together with the layout version it was written for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default = "current_version")]
    pub version: u32,
    pub schema:  SchemaDef,
}

impl SchemaDocument {
    pub fn from_json(text: &str) -> Result<SchemaDocument> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the schema, stamped with the document's version. Codecs refuse
    /// schemas whose version differs from [SCHEMA_VERSION].
    pub fn build(&self) -> Result<Schema> {
        let schema = self.schema.build()?;
        if self.version == SCHEMA_VERSION {
            Ok(schema)
        } else {
            Ok(schema.restamp(self.version))
        }
    }
}

/// Parses a JSON schema document and builds its schema.
pub fn parse_schema(text: &str) -> Result<Schema> {
    SchemaDocument::from_json(text)?.build()
}
