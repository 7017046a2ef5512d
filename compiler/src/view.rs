//! Live, schema-shaped access to a byte buffer.
//!
//! A [View] never copies the bytes it describes. Primitive members are read
//! fresh on every access and written straight through. Composite members
//! (arrays, tuples, structs and bitfields) are returned as lightweight
//! accessors that are created on first access and then reused, so asking
//! for the same member twice yields the same accessor.

use std::cell::{Cell, OnceCell};
use std::sync::Arc;

use structly_schema::{read_int, write_int, Schema, Value};

use crate::{
    cache::CodecCache,
    compiler::{Codec, Op},
    decoder::check_length,
    error::Result,
    reader::read,
    writer::{to_int, write},
};

enum Backing<'a> {
    Owned(Box<[Cell<u8>]>),
    Borrowed(&'a [Cell<u8>]),
}

/// A live view of one schema-shaped value inside a byte buffer.
///
/// ```
/// use structly_compiler::View;
/// use structly_schema::{array, structure, uint8, Value};
///
/// let schema = structure([("id", uint8()), ("list", array(&uint8(), 2))]).unwrap();
/// let mut bytes = [0u8; 3];
/// {
///     let view = View::over(&schema, &mut bytes, 0).unwrap();
///     let root = view.value();
///     let root = root.as_struct().unwrap();
///     root.set("id", &Value::Int(9));
///     root.get("list").unwrap().as_array().unwrap().set(1, &Value::Int(4));
/// }
/// assert_eq!(bytes, [9, 0, 4]);
/// ```
pub struct View<'a> {
    schema:      Schema,
    codec:       Arc<Codec>,
    backing:     Backing<'a>,
    byte_offset: usize,
    root:        OnceCell<Node>,
}

impl View<'static> {
    /// Creates a view over a new zero-filled buffer sized for `schema`.
    pub fn new(schema: &Schema) -> Result<View<'static>> {
        let codec = CodecCache::global().codec_for(schema)?;
        let bytes = (0..codec.byte_length()).map(|_| Cell::new(0)).collect();
        Ok(View {
            schema: schema.clone(),
            codec,
            backing: Backing::Owned(bytes),
            byte_offset: 0,
            root: OnceCell::new(),
        })
    }
}

impl<'a> View<'a> {
    /// Creates a view of the value at `byte_offset` in `bytes`.
    pub fn over(schema: &Schema, bytes: &'a mut [u8], byte_offset: usize) -> Result<View<'a>> {
        View::over_cells(schema, Cell::from_mut(bytes).as_slice_of_cells(), byte_offset)
    }

    /// Like [View::over], but over shared cells so that several views may
    /// describe the same buffer at once.
    pub fn over_cells(schema: &Schema, cells: &'a [Cell<u8>], byte_offset: usize) -> Result<View<'a>> {
        let codec = CodecCache::global().codec_for(schema)?;
        check_length(codec.byte_length(), cells.len(), byte_offset)?;
        Ok(View {
            schema: schema.clone(),
            codec,
            backing: Backing::Borrowed(cells),
            byte_offset,
            root: OnceCell::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Length of the whole underlying buffer, not just the viewed value.
    pub fn byte_length(&self) -> usize {
        self.cells().len()
    }

    fn cells(&self) -> &[Cell<u8>] {
        match self.backing {
            Backing::Owned(ref cells) => &cells[..],
            Backing::Borrowed(cells) => cells,
        }
    }

    /// Copies the whole underlying buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells().iter().map(Cell::get).collect()
    }

    /// Accessor for the root value.
    pub fn value(&self) -> Access<'_> {
        let cells = self.cells();
        let root = self.codec.root();
        if root.is_composite() {
            self.root
                .get_or_init(|| Node::new(root.clone(), self.byte_offset))
                .access(cells)
        } else {
            leaf(root, self.byte_offset, cells)
        }
    }

    /// Decodes the root value.
    pub fn get(&self) -> Value {
        read(self.codec.root(), self.cells(), self.byte_offset)
    }

    /// Overwrites the root value. Accessors handed out earlier stay valid
    /// and see the new bytes.
    pub fn set(&self, value: &Value) {
        let mut sink = self.cells();
        write(self.codec.root(), value, &mut sink, self.byte_offset);
    }
}

/// A cached composite accessor: the op it runs and where it runs it.
struct Node {
    op:       Arc<Op>,
    base:     usize,
    children: Box<[OnceCell<Node>]>,
}

impl Node {
    fn new(op: Arc<Op>, base: usize) -> Node {
        let count = match *op {
            Op::Array {
                length,
                ref element,
                ..
            } if element.is_composite() => length,
            Op::Tuple { ref elements } => elements.len(),
            Op::Struct { ref fields } => fields.len(),
            _ => 0,
        };

        Node {
            op,
            base,
            children: (0..count).map(|_| OnceCell::new()).collect(),
        }
    }

    fn access<'v>(&'v self, cells: &'v [Cell<u8>]) -> Access<'v> {
        match *self.op {
            Op::Array { .. } | Op::Tuple { .. } => Access::Array(ArrayView { node: self, cells }),
            Op::Struct { .. } => Access::Struct(StructView { node: self, cells }),
            Op::Bitfield { .. } => Access::Bitfield(BitfieldView { node: self, cells }),
            _ => leaf(&self.op, self.base, cells),
        }
    }

    fn child<'v>(&'v self, index: usize, op: &Arc<Op>, base: usize, cells: &'v [Cell<u8>]) -> Access<'v> {
        match self.children.get(index) {
            Some(slot) if op.is_composite() => slot
                .get_or_init(|| Node::new(op.clone(), base))
                .access(cells),
            _ => leaf(op, base, cells),
        }
    }
}

fn leaf<'v>(op: &Op, base: usize, cells: &'v [Cell<u8>]) -> Access<'v> {
    match *op {
        Op::Buffer { offset, length } => {
            Access::Bytes(&cells[base + offset..base + offset + length])
        }
        _ => Access::Value(read(op, cells, base)),
    }
}

/// What a view hands out for one member.
pub enum Access<'v> {
    /// A number, boolean or string, decoded at the time of access.
    Value(Value),
    /// The live bytes of a buffer member.
    Bytes(&'v [Cell<u8>]),
    /// An array or tuple.
    Array(ArrayView<'v>),
    Struct(StructView<'v>),
    Bitfield(BitfieldView<'v>),
}

impl<'v> Access<'v> {
    pub fn as_value(&self) -> Option<&Value> {
        match *self {
            Access::Value(ref value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&'v [Cell<u8>]> {
        match *self {
            Access::Bytes(cells) => Some(cells),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<ArrayView<'v>> {
        match *self {
            Access::Array(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<StructView<'v>> {
        match *self {
            Access::Struct(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_bitfield(&self) -> Option<BitfieldView<'v>> {
        match *self {
            Access::Bitfield(view) => Some(view),
            _ => None,
        }
    }

    /// Decodes whatever this accessor points at.
    pub fn to_value(&self) -> Value {
        match *self {
            Access::Value(ref value) => value.clone(),
            Access::Bytes(cells) => Value::Bytes(cells.iter().map(Cell::get).collect()),
            Access::Array(view) => view.to_value(),
            Access::Struct(view) => view.to_value(),
            Access::Bitfield(view) => view.to_value(),
        }
    }
}

/// Live accessor for an array or a tuple.
#[derive(Clone, Copy)]
pub struct ArrayView<'v> {
    node:  &'v Node,
    cells: &'v [Cell<u8>],
}

impl<'v> ArrayView<'v> {
    pub fn len(&self) -> usize {
        match *self.node.op {
            Op::Array { length, .. } => length,
            Op::Tuple { ref elements } => elements.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position and op of element `index`, if it exists.
    fn locate(&self, index: usize) -> Option<(&'v Arc<Op>, usize)> {
        let node: &'v Node = self.node;
        match *node.op {
            Op::Array {
                offset,
                length,
                stride,
                ref element,
            } if index < length => Some((element, node.base + offset + index * stride)),
            Op::Tuple { ref elements } => elements.get(index).map(|op| (op, node.base)),
            _ => None,
        }
    }

    /// Returns element `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<Access<'v>> {
        let (op, base) = self.locate(index)?;
        Some(self.node.child(index, op, base, self.cells))
    }

    /// Writes element `index`. Writes past the end are ignored.
    pub fn set(&self, index: usize, value: &Value) {
        if let Some((op, base)) = self.locate(index) {
            let mut sink = self.cells;
            write(op, value, &mut sink, base);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Access<'v>> + 'v {
        let view = *self;
        (0..view.len()).filter_map(move |i| view.get(i))
    }

    pub fn to_value(&self) -> Value {
        read(&self.node.op, self.cells, self.node.base)
    }

    /// Whether both accessors are the same cached accessor.
    pub fn ptr_eq(&self, other: &ArrayView<'_>) -> bool {
        std::ptr::eq(self.node, other.node)
    }
}

/// Live accessor for a struct.
#[derive(Clone, Copy)]
pub struct StructView<'v> {
    node:  &'v Node,
    cells: &'v [Cell<u8>],
}

impl<'v> StructView<'v> {
    fn fields(&self) -> &'v [(Arc<str>, Arc<Op>)] {
        let node: &'v Node = self.node;
        match *node.op {
            Op::Struct { ref fields } => fields,
            _ => &[],
        }
    }

    /// Field names in layout order.
    pub fn names(&self) -> impl Iterator<Item = &'v str> + 'v {
        self.fields().iter().map(|(name, _)| &**name)
    }

    pub fn len(&self) -> usize {
        self.fields().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node.op.field_index(name).is_some()
    }

    /// Returns the named field, or `None` if the struct has no such field.
    pub fn get(&self, name: &str) -> Option<Access<'v>> {
        let index = self.node.op.field_index(name)?;
        let (_, op) = &self.fields()[index];
        Some(self.node.child(index, op, self.node.base, self.cells))
    }

    /// Writes the named field. Unknown names are ignored.
    pub fn set(&self, name: &str, value: &Value) {
        if let Some(index) = self.node.op.field_index(name) {
            let (_, op) = &self.fields()[index];
            let mut sink = self.cells;
            write(op, value, &mut sink, self.node.base);
        }
    }

    pub fn to_value(&self) -> Value {
        read(&self.node.op, self.cells, self.node.base)
    }

    pub fn ptr_eq(&self, other: &StructView<'_>) -> bool {
        std::ptr::eq(self.node, other.node)
    }
}

/// Live accessor for a bitfield. Every read decodes the storage integer and
/// every write is a read-modify-write of it.
#[derive(Clone, Copy)]
pub struct BitfieldView<'v> {
    node:  &'v Node,
    cells: &'v [Cell<u8>],
}

impl<'v> BitfieldView<'v> {
    fn storage(&self) -> u32 {
        match *self.node.op {
            Op::Bitfield {
                offset,
                kind,
                endian,
                ..
            } => read_int(self.cells, self.node.base + offset, kind, endian) as u32,
            _ => 0,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'v str> + 'v {
        let node: &'v Node = self.node;
        let members = match *node.op {
            Op::Bitfield { ref members, .. } => members.as_slice(),
            _ => &[],
        };
        members.iter().map(|member| &*member.name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node.op.field_index(name).is_some()
    }

    /// Returns the named member's current value.
    pub fn get(&self, name: &str) -> Option<u32> {
        match *self.node.op {
            Op::Bitfield { ref members, .. } => {
                let member = &members[self.node.op.field_index(name)?];
                Some(member.extract(self.storage()))
            }
            _ => None,
        }
    }

    /// Stores the low bits of `value` in the named member, leaving the other
    /// members untouched. Unknown names are ignored.
    pub fn set(&self, name: &str, value: &Value) {
        if let Op::Bitfield {
            offset,
            kind,
            endian,
            ref members,
        } = *self.node.op
        {
            if let Some(index) = self.node.op.field_index(name) {
                let storage = members[index].insert(self.storage(), to_int(value) as u32);
                let mut sink = self.cells;
                write_int(&mut sink, self.node.base + offset, kind, endian, storage as i64);
            }
        }
    }

    pub fn to_value(&self) -> Value {
        read(&self.node.op, self.cells, self.node.base)
    }

    pub fn ptr_eq(&self, other: &BitfieldView<'_>) -> bool {
        std::ptr::eq(self.node, other.node)
    }
}
