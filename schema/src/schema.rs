use std::fmt;
use std::sync::{Arc, Weak};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StructlyError};
use crate::layout::{array_byte_length, layout_members, strideof_aligned};

/// Version of the layout rules. Codecs refuse schemas stamped with any other
/// version, since offsets could have been computed differently.
pub const SCHEMA_VERSION: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaTag {
    Number,
    Bool,
    String,
    Array,
    Tuple,
    Struct,
    Bitfield,
    Buffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl NumberKind {
    pub fn byte_length(self) -> usize {
        match self {
            NumberKind::Int8 | NumberKind::UInt8 => 1,
            NumberKind::Int16 | NumberKind::UInt16 => 2,
            NumberKind::Int32 | NumberKind::UInt32 | NumberKind::Float32 => 4,
            NumberKind::Float64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, NumberKind::Float32 | NumberKind::Float64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            NumberKind::Int8 | NumberKind::Int16 | NumberKind::Int32
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            NumberKind::Int8 => "int8",
            NumberKind::UInt8 => "uint8",
            NumberKind::Int16 => "int16",
            NumberKind::UInt16 => "uint16",
            NumberKind::Int32 => "int32",
            NumberKind::UInt32 => "uint32",
            NumberKind::Float32 => "float32",
            NumberKind::Float64 => "float64",
        }
    }
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub const NATIVE: Endian = if cfg!(target_endian = "little") {
        Endian::Little
    } else {
        Endian::Big
    };

    #[inline]
    pub fn is_little(self) -> bool {
        self == Endian::Little
    }
}

/// Character encoding of a fixed-length string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    Ascii,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleField {
    pub schema:      Schema,
    pub byte_offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name:        String,
    pub schema:      Schema,
    pub byte_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitfieldMember {
    pub name: String,
    pub bits: u32,
}

/// Kind-specific part of a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// `endian` of `None` means the system byte order.
    Number {
        kind:   NumberKind,
        endian: Option<Endian>,
    },
    Bool,
    /// The maximum byte length is the schema's `byte_length`.
    String {
        encoding: Encoding,
    },
    Array {
        element: Schema,
        length:  usize,
        stride:  usize,
    },
    Tuple {
        fields: Vec<TupleField>,
    },
    /// Fields are kept in offset order, which is the reordered order when
    /// the struct was built with `reorder`.
    Struct {
        fields: Vec<StructField>,
    },
    /// Members are packed from bit 0 upwards in declaration order.
    Bitfield {
        storage: Schema,
        members: Vec<BitfieldMember>,
    },
    Buffer,
}

#[derive(Debug, PartialEq)]
struct SchemaNode {
    version:        u32,
    byte_length:    usize,
    byte_alignment: usize,
    kind:           SchemaKind,
}

/// An immutable, cheaply clonable schema descriptor.
///
/// Clones share one allocation, and that allocation is the schema's
/// identity: caches key on [Schema::id], while `==` compares structure.
#[derive(Clone)]
pub struct Schema(Arc<SchemaNode>);

/// Identity of a schema allocation, stable for as long as any clone (or a
/// [WeakSchema]) of it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

/// A non-owning handle to a schema.
#[derive(Clone)]
pub struct WeakSchema(Weak<SchemaNode>);

impl WeakSchema {
    pub fn upgrade(&self) -> Option<Schema> {
        self.0.upgrade().map(Schema)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Schema {
    fn from_parts(byte_length: usize, byte_alignment: usize, kind: SchemaKind) -> Schema {
        debug_assert!(byte_alignment.is_power_of_two());
        Schema(Arc::new(SchemaNode {
            version: SCHEMA_VERSION,
            byte_length,
            byte_alignment,
            kind,
        }))
    }

    pub fn tag(&self) -> SchemaTag {
        match self.0.kind {
            SchemaKind::Number { .. } => SchemaTag::Number,
            SchemaKind::Bool => SchemaTag::Bool,
            SchemaKind::String { .. } => SchemaTag::String,
            SchemaKind::Array { .. } => SchemaTag::Array,
            SchemaKind::Tuple { .. } => SchemaTag::Tuple,
            SchemaKind::Struct { .. } => SchemaTag::Struct,
            SchemaKind::Bitfield { .. } => SchemaTag::Bitfield,
            SchemaKind::Buffer => SchemaTag::Buffer,
        }
    }

    pub fn version(&self) -> u32 {
        self.0.version
    }

    /// Size in bytes, excluding trailing padding.
    pub fn byte_length(&self) -> usize {
        self.0.byte_length
    }

    pub fn byte_alignment(&self) -> usize {
        self.0.byte_alignment
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.0.kind
    }

    pub fn id(&self) -> SchemaId {
        SchemaId(Arc::as_ptr(&self.0) as usize)
    }

    /// Whether both handles refer to the same schema allocation.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakSchema {
        WeakSchema(Arc::downgrade(&self.0))
    }

    /// Looks up a struct field by name. Returns `None` for other kinds.
    pub fn field(&self, name: &str) -> Option<&StructField> {
        match self.0.kind {
            SchemaKind::Struct { ref fields } => fields.iter().find(|field| field.name == name),
            _ => None,
        }
    }

    /// Copies this schema tree with every node stamped as `version`.
    pub(crate) fn restamp(&self, version: u32) -> Schema {
        let kind = match self.0.kind {
            SchemaKind::Array {
                ref element,
                length,
                stride,
            } => SchemaKind::Array {
                element: element.restamp(version),
                length,
                stride,
            },
            SchemaKind::Tuple { ref fields } => SchemaKind::Tuple {
                fields: fields
                    .iter()
                    .map(|field| TupleField {
                        schema:      field.schema.restamp(version),
                        byte_offset: field.byte_offset,
                    })
                    .collect(),
            },
            SchemaKind::Struct { ref fields } => SchemaKind::Struct {
                fields: fields
                    .iter()
                    .map(|field| StructField {
                        name:        field.name.clone(),
                        schema:      field.schema.restamp(version),
                        byte_offset: field.byte_offset,
                    })
                    .collect(),
            },
            SchemaKind::Bitfield {
                ref storage,
                ref members,
            } => SchemaKind::Bitfield {
                storage: storage.restamp(version),
                members: members.clone(),
            },
            ref other => other.clone(),
        };

        Schema(Arc::new(SchemaNode {
            version,
            byte_length: self.0.byte_length,
            byte_alignment: self.0.byte_alignment,
            kind,
        }))
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Schema")
            .field("tag", &self.tag())
            .field("version", &self.0.version)
            .field("byte_length", &self.0.byte_length)
            .field("byte_alignment", &self.0.byte_alignment)
            .field("kind", &self.0.kind)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// Creates a number schema. Prefer the shared instances such as [uint16le],
/// which always hit the codec cache.
pub fn number(kind: NumberKind, endian: Option<Endian>) -> Schema {
    let size = kind.byte_length();
    Schema::from_parts(size, size, SchemaKind::Number { kind, endian })
}

macro_rules! shared_schemas {
    ($($(#[$doc:meta])* $name:ident / $slot:ident = $init:expr;)*) => {
        lazy_static! {
            $(static ref $slot: Schema = $init;)*
        }

        $(
            $(#[$doc])*
            pub fn $name() -> Schema {
                $slot.clone()
            }
        )*
    };
}

shared_schemas! {
    /// Boolean stored as one byte.
    boolean / BOOL = Schema::from_parts(1, 1, SchemaKind::Bool);

    int8 / INT8 = number(NumberKind::Int8, None);
    uint8 / UINT8 = number(NumberKind::UInt8, None);

    int16 / INT16 = number(NumberKind::Int16, None);
    int16le / INT16LE = number(NumberKind::Int16, Some(Endian::Little));
    int16be / INT16BE = number(NumberKind::Int16, Some(Endian::Big));

    uint16 / UINT16 = number(NumberKind::UInt16, None);
    uint16le / UINT16LE = number(NumberKind::UInt16, Some(Endian::Little));
    uint16be / UINT16BE = number(NumberKind::UInt16, Some(Endian::Big));

    int32 / INT32 = number(NumberKind::Int32, None);
    int32le / INT32LE = number(NumberKind::Int32, Some(Endian::Little));
    int32be / INT32BE = number(NumberKind::Int32, Some(Endian::Big));

    uint32 / UINT32 = number(NumberKind::UInt32, None);
    uint32le / UINT32LE = number(NumberKind::UInt32, Some(Endian::Little));
    uint32be / UINT32BE = number(NumberKind::UInt32, Some(Endian::Big));

    float32 / FLOAT32 = number(NumberKind::Float32, None);
    float32le / FLOAT32LE = number(NumberKind::Float32, Some(Endian::Little));
    float32be / FLOAT32BE = number(NumberKind::Float32, Some(Endian::Big));

    float64 / FLOAT64 = number(NumberKind::Float64, None);
    float64le / FLOAT64LE = number(NumberKind::Float64, Some(Endian::Little));
    float64be / FLOAT64BE = number(NumberKind::Float64, Some(Endian::Big));
}

/// A UTF-8 string of at most `max_length` bytes.
pub fn string(max_length: usize) -> Schema {
    string_with_encoding(max_length, Encoding::Utf8)
}

pub fn string_with_encoding(max_length: usize, encoding: Encoding) -> Schema {
    Schema::from_parts(max_length, 1, SchemaKind::String { encoding })
}

/// Alignment override for arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrayOptions {
    pub pack: Option<usize>,
}

impl ArrayOptions {
    /// Pack elements back to back (alignment 1).
    pub fn packed() -> ArrayOptions {
        ArrayOptions { pack: Some(1) }
    }

    pub fn pack(byte_alignment: usize) -> ArrayOptions {
        ArrayOptions {
            pack: Some(byte_alignment),
        }
    }
}

/// Layout options for structs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructOptions {
    /// Sort fields by ascending alignment before assigning offsets.
    pub reorder: bool,
    /// Alignment forced onto every field and onto the struct itself.
    pub pack:    Option<usize>,
}

impl StructOptions {
    pub fn reorder(mut self) -> StructOptions {
        self.reorder = true;
        self
    }

    pub fn pack(mut self, byte_alignment: usize) -> StructOptions {
        self.pack = Some(byte_alignment);
        self
    }

    pub fn packed(self) -> StructOptions {
        self.pack(1)
    }
}

fn check_alignment(name: &str, byte_alignment: usize) -> Result<()> {
    if byte_alignment.is_power_of_two() {
        Ok(())
    } else {
        Err(StructlyError::Layout(format!(
            "{} must be a power of two, got {}",
            name, byte_alignment
        )))
    }
}

/// An array of `length` elements at the element's natural stride.
pub fn array(element: &Schema, length: usize) -> Schema {
    build_array(element, length, element.byte_alignment())
}

pub fn array_with(element: &Schema, length: usize, options: ArrayOptions) -> Result<Schema> {
    let byte_alignment = match options.pack {
        Some(pack) => {
            check_alignment("array pack", pack)?;
            pack
        }
        None => element.byte_alignment(),
    };
    Ok(build_array(element, length, byte_alignment))
}

fn build_array(element: &Schema, length: usize, byte_alignment: usize) -> Schema {
    let stride = strideof_aligned(element, byte_alignment);
    Schema::from_parts(
        array_byte_length(element.byte_length(), stride, length),
        byte_alignment,
        SchemaKind::Array {
            element: element.clone(),
            length,
            stride,
        },
    )
}

/// A tuple whose elements are laid out in order at their natural alignment.
pub fn tuple<I>(elements: I) -> Schema
where
    I: IntoIterator<Item = Schema>,
{
    let elements: Vec<Schema> = elements.into_iter().collect();
    let layout = layout_members(
        elements
            .iter()
            .map(|schema| (schema.byte_length(), schema.byte_alignment())),
        None,
    );

    let fields = elements
        .into_iter()
        .zip(layout.offsets)
        .map(|(schema, byte_offset)| TupleField {
            schema,
            byte_offset,
        })
        .collect();

    Schema::from_parts(
        layout.byte_length,
        layout.byte_alignment,
        SchemaKind::Tuple { fields },
    )
}

/// A struct with natural layout and fields in declaration order.
pub fn structure<I, N>(fields: I) -> Result<Schema>
where
    I: IntoIterator<Item = (N, Schema)>,
    N: Into<String>,
{
    structure_with(fields, StructOptions::default())
}

pub fn structure_with<I, N>(fields: I, options: StructOptions) -> Result<Schema>
where
    I: IntoIterator<Item = (N, Schema)>,
    N: Into<String>,
{
    if let Some(pack) = options.pack {
        check_alignment("struct pack", pack)?;
    }

    let mut fields: Vec<(String, Schema)> = fields
        .into_iter()
        .map(|(name, schema)| (name.into(), schema))
        .collect();

    for (i, (name, _)) in fields.iter().enumerate() {
        if fields[..i].iter().any(|(other, _)| other == name) {
            return Err(StructlyError::invalid_arg(
                name.as_str(),
                "struct field is declared twice",
            ));
        }
    }

    // Stable, so equally aligned fields keep their declared order.
    if options.reorder {
        fields.sort_by_key(|(_, schema)| schema.byte_alignment());
    }

    let layout = layout_members(
        fields
            .iter()
            .map(|(_, schema)| (schema.byte_length(), schema.byte_alignment())),
        options.pack,
    );

    let fields = fields
        .into_iter()
        .zip(layout.offsets)
        .map(|((name, schema), byte_offset)| StructField {
            name,
            schema,
            byte_offset,
        })
        .collect();

    Ok(Schema::from_parts(
        layout.byte_length,
        layout.byte_alignment,
        SchemaKind::Struct { fields },
    ))
}

/// A bitfield stored in a `uint32`.
pub fn bitfield<I, N>(members: I) -> Result<Schema>
where
    I: IntoIterator<Item = (N, u32)>,
    N: Into<String>,
{
    bitfield_with(members, &uint32())
}

/// A bitfield stored in `storage`, which must be an integer number schema.
pub fn bitfield_with<I, N>(members: I, storage: &Schema) -> Result<Schema>
where
    I: IntoIterator<Item = (N, u32)>,
    N: Into<String>,
{
    match storage.kind() {
        SchemaKind::Number { kind, .. } if !kind.is_float() => {}
        _ => {
            return Err(StructlyError::invalid_arg(
                "storage",
                "bitfield storage must be an integer number schema",
            ))
        }
    }

    let members: Vec<BitfieldMember> = members
        .into_iter()
        .map(|(name, bits)| BitfieldMember {
            name: name.into(),
            bits,
        })
        .collect();

    for (i, member) in members.iter().enumerate() {
        if members[..i].iter().any(|other| other.name == member.name) {
            return Err(StructlyError::invalid_arg(
                member.name.as_str(),
                "bitfield member is declared twice",
            ));
        }
    }

    let total_bits: u64 = members.iter().map(|member| u64::from(member.bits)).sum();
    if total_bits > 8 * storage.byte_length() as u64 {
        return Err(StructlyError::Layout(
            "Sum of bitfield widths is too large for storage element".to_owned(),
        ));
    }

    Ok(Schema::from_parts(
        storage.byte_length(),
        storage.byte_alignment(),
        SchemaKind::Bitfield {
            storage: storage.clone(),
            members,
        },
    ))
}

/// An opaque run of `length` bytes, byte aligned.
pub fn buffer(length: usize) -> Schema {
    Schema::from_parts(length, 1, SchemaKind::Buffer)
}

pub fn buffer_aligned(length: usize, byte_alignment: usize) -> Result<Schema> {
    check_alignment("buffer alignment", byte_alignment)?;
    Ok(Schema::from_parts(length, byte_alignment, SchemaKind::Buffer))
}
