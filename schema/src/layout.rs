//! C-style layout arithmetic: alignment, sizes, strides and member offsets.
//!
//! Everything here is a pure function of its inputs. Alignments are always
//! powers of two, which lets [align] use a bitmask instead of a division.

use crate::schema::Schema;

/// Whether the running system is little endian.
pub const SYSTEM_LITTLE_ENDIAN: bool = cfg!(target_endian = "little");

/// Rounds `byte_offset` up to the next multiple of `byte_alignment`.
///
/// ```
/// use structly_schema::align;
///
/// assert_eq!(align(0, 8), 0);
/// assert_eq!(align(1, 8), 8);
/// assert_eq!(align(9, 4), 12);
/// assert_eq!(align(7, 1), 7);
/// ```
#[inline]
pub fn align(byte_offset: usize, byte_alignment: usize) -> usize {
    debug_assert!(byte_alignment.is_power_of_two());
    (byte_offset + byte_alignment - 1) & !(byte_alignment - 1)
}

/// The byte size of the schema, excluding trailing alignment padding.
#[inline]
pub fn sizeof(schema: &Schema) -> usize {
    schema.byte_length()
}

/// The byte alignment of the schema.
#[inline]
pub fn alignof(schema: &Schema) -> usize {
    schema.byte_alignment()
}

/// The byte size of the schema including trailing padding, i.e. the spacing
/// between consecutive elements when the schema is repeated in an array.
#[inline]
pub fn strideof(schema: &Schema) -> usize {
    align(sizeof(schema), alignof(schema))
}

/// Like [strideof], but rounds up to an explicit alignment instead of the
/// schema's own.
#[inline]
pub fn strideof_aligned(schema: &Schema, byte_alignment: usize) -> usize {
    align(sizeof(schema), byte_alignment)
}

/// A mask with the low `bits` bits set.
#[inline]
pub fn create_mask(bits: u32) -> u32 {
    match bits {
        0 => 0,
        1..=31 => u32::MAX >> (32 - bits),
        _ => u32::MAX,
    }
}

/// Offsets and overall size of a composite, as produced by [layout_members].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberLayout {
    pub offsets:        Vec<usize>,
    pub byte_length:    usize,
    pub byte_alignment: usize,
}

/// Assigns offsets to `(byte_length, byte_alignment)` members in order.
///
/// Each member is placed at the running offset rounded up to `pack` when
/// given, otherwise to its own alignment. The composite's alignment is
/// `pack` or the largest member alignment (at least 1).
pub fn layout_members<I>(members: I, pack: Option<usize>) -> MemberLayout
where
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut byte_offset = 0;
    let mut max_alignment = 1;

    let offsets = members
        .into_iter()
        .map(|(byte_length, byte_alignment)| {
            byte_offset = align(byte_offset, pack.unwrap_or(byte_alignment));
            let member_offset = byte_offset;
            byte_offset += byte_length;
            max_alignment = max_alignment.max(byte_alignment);
            member_offset
        })
        .collect();

    MemberLayout {
        offsets,
        byte_length:    byte_offset,
        byte_alignment: pack.unwrap_or(max_alignment),
    }
}

/// Byte length of `length` elements spaced `stride` apart. The last element
/// contributes only its own size, not its trailing padding.
#[inline]
pub fn array_byte_length(element_length: usize, stride: usize, length: usize) -> usize {
    match length {
        0 => 0,
        _ => (length - 1) * stride + element_length,
    }
}
