use std::cell::Cell;

use crate::schema::{Encoding, Endian, NumberKind};

/// Random-access, read-only byte storage.
///
/// Implemented for plain byte slices and for slices of [Cell]s, which is how
/// views share one buffer between many accessors. Reads outside
/// `0..byte_len()` panic, so callers check bounds up front.
///
/// ```
/// use structly_schema::{read_int, ByteSource, Endian, NumberKind};
///
/// let data: &[u8] = &[0x34, 0x12];
/// assert_eq!(data.byte_len(), 2);
/// assert_eq!(read_int(data, 0, NumberKind::UInt16, Endian::Little), 0x1234);
/// ```
pub trait ByteSource {
    fn byte_len(&self) -> usize;

    fn byte_at(&self, offset: usize) -> u8;

    /// Copies `dest.len()` bytes starting at `offset` into `dest`.
    fn copy_to(&self, offset: usize, dest: &mut [u8]);

    fn read_array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        self.copy_to(offset, &mut out);
        out
    }
}

/// Random-access byte storage that can be written.
pub trait ByteSink {
    fn write_bytes(&mut self, offset: usize, bytes: &[u8]);

    fn fill(&mut self, offset: usize, len: usize, byte: u8);
}

impl ByteSource for [u8] {
    #[inline]
    fn byte_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn byte_at(&self, offset: usize) -> u8 {
        self[offset]
    }

    #[inline]
    fn copy_to(&self, offset: usize, dest: &mut [u8]) {
        dest.copy_from_slice(&self[offset..offset + dest.len()]);
    }
}

impl ByteSource for [Cell<u8>] {
    #[inline]
    fn byte_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn byte_at(&self, offset: usize) -> u8 {
        self[offset].get()
    }

    #[inline]
    fn copy_to(&self, offset: usize, dest: &mut [u8]) {
        let len = dest.len();
        for (out, cell) in dest.iter_mut().zip(&self[offset..offset + len]) {
            *out = cell.get();
        }
    }
}

impl ByteSink for [u8] {
    #[inline]
    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    #[inline]
    fn fill(&mut self, offset: usize, len: usize, byte: u8) {
        self[offset..offset + len].fill(byte);
    }
}

impl ByteSink for &[Cell<u8>] {
    #[inline]
    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        for (cell, byte) in self[offset..offset + bytes.len()].iter().zip(bytes) {
            cell.set(*byte);
        }
    }

    #[inline]
    fn fill(&mut self, offset: usize, len: usize, byte: u8) {
        for cell in &self[offset..offset + len] {
            cell.set(byte);
        }
    }
}

/// Reads an integer number stored at `offset`, sign- or zero-extended
/// according to `kind`. Float kinds read as their truncated value.
pub fn read_int<S: ByteSource + ?Sized>(
    source: &S,
    offset: usize,
    kind: NumberKind,
    endian: Endian,
) -> i64 {
    macro_rules! read {
        ($ty:ty) => {{
            let bytes = source.read_array(offset);
            (match endian {
                Endian::Little => <$ty>::from_le_bytes(bytes),
                Endian::Big => <$ty>::from_be_bytes(bytes),
            }) as i64
        }};
    }

    match kind {
        NumberKind::Int8 => source.byte_at(offset) as i8 as i64,
        NumberKind::UInt8 => source.byte_at(offset) as i64,
        NumberKind::Int16 => read!(i16),
        NumberKind::UInt16 => read!(u16),
        NumberKind::Int32 => read!(i32),
        NumberKind::UInt32 => read!(u32),
        NumberKind::Float32 | NumberKind::Float64 => read_float(source, offset, kind, endian) as i64,
    }
}

/// Reads a number stored at `offset` as a double.
pub fn read_float<S: ByteSource + ?Sized>(
    source: &S,
    offset: usize,
    kind: NumberKind,
    endian: Endian,
) -> f64 {
    macro_rules! read {
        ($ty:ty) => {{
            let bytes = source.read_array(offset);
            (match endian {
                Endian::Little => <$ty>::from_le_bytes(bytes),
                Endian::Big => <$ty>::from_be_bytes(bytes),
            }) as f64
        }};
    }

    match kind {
        NumberKind::Float32 => read!(f32),
        NumberKind::Float64 => read!(f64),
        _ => read_int(source, offset, kind, endian) as f64,
    }
}

/// Writes `value` at `offset`, keeping only the low bits that fit `kind`.
/// Out of range values wrap around the way a C cast would.
pub fn write_int<W: ByteSink + ?Sized>(
    sink: &mut W,
    offset: usize,
    kind: NumberKind,
    endian: Endian,
    value: i64,
) {
    macro_rules! write {
        ($ty:ty) => {{
            let value = value as $ty;
            let bytes = match endian {
                Endian::Little => value.to_le_bytes(),
                Endian::Big => value.to_be_bytes(),
            };
            sink.write_bytes(offset, &bytes);
        }};
    }

    match kind {
        NumberKind::Int8 | NumberKind::UInt8 => sink.write_bytes(offset, &[value as u8]),
        NumberKind::Int16 | NumberKind::UInt16 => write!(u16),
        NumberKind::Int32 | NumberKind::UInt32 => write!(u32),
        NumberKind::Float32 | NumberKind::Float64 => {
            write_float(sink, offset, kind, endian, value as f64)
        }
    }
}

/// Writes `value` at `offset`. Integer kinds receive the truncated value.
pub fn write_float<W: ByteSink + ?Sized>(
    sink: &mut W,
    offset: usize,
    kind: NumberKind,
    endian: Endian,
    value: f64,
) {
    macro_rules! write {
        ($ty:ty) => {{
            let value = value as $ty;
            let bytes = match endian {
                Endian::Little => value.to_le_bytes(),
                Endian::Big => value.to_be_bytes(),
            };
            sink.write_bytes(offset, &bytes);
        }};
    }

    match kind {
        NumberKind::Float32 => write!(f32),
        NumberKind::Float64 => write!(f64),
        _ => write_int(sink, offset, kind, endian, truncate_float(value)),
    }
}

/// Truncates `value` toward zero and wraps it into 64 bits, so a later
/// narrowing keeps the same low bits a C-style conversion would. NaN and the
/// infinities become 0.
pub fn truncate_float(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    (value.trunc() % 18_446_744_073_709_551_616.0) as i128 as u64 as i64
}

/// Reads a NUL-terminated string of at most `max_length` bytes into `out`,
/// reusing its allocation. Invalid UTF-8 is replaced, and ASCII strings
/// drop the high bit of every byte.
pub fn read_string_into<S: ByteSource + ?Sized>(
    source: &S,
    offset: usize,
    max_length: usize,
    encoding: Encoding,
    out: &mut String,
) {
    out.clear();

    let mut end = 0;
    while end < max_length && source.byte_at(offset + end) != 0 {
        end += 1;
    }

    match encoding {
        Encoding::Ascii => {
            out.reserve(end);
            for i in 0..end {
                out.push((source.byte_at(offset + i) & 0x7f) as char);
            }
        }
        Encoding::Utf8 => {
            let mut bytes = vec![0u8; end];
            source.copy_to(offset, &mut bytes);
            out.push_str(&String::from_utf8_lossy(&bytes));
        }
    }
}

pub fn read_string<S: ByteSource + ?Sized>(
    source: &S,
    offset: usize,
    max_length: usize,
    encoding: Encoding,
) -> String {
    let mut out = String::new();
    read_string_into(source, offset, max_length, encoding, &mut out);
    out
}

/// Writes `value` into a `max_length` byte field and zero-fills the rest of
/// the field. UTF-8 text is cut at the last whole character that fits. ASCII
/// keeps the low byte of each UTF-16 code unit.
pub fn write_string<W: ByteSink + ?Sized>(
    sink: &mut W,
    offset: usize,
    max_length: usize,
    encoding: Encoding,
    value: &str,
) {
    let written = match encoding {
        Encoding::Utf8 => {
            let mut end = value.len().min(max_length);
            while !value.is_char_boundary(end) {
                end -= 1;
            }
            sink.write_bytes(offset, &value.as_bytes()[..end]);
            end
        }
        Encoding::Ascii => {
            let bytes: Vec<u8> = value
                .encode_utf16()
                .take(max_length)
                .map(|unit| unit as u8)
                .collect();
            sink.write_bytes(offset, &bytes);
            bytes.len()
        }
    };

    sink.fill(offset + written, max_length - written, 0);
}

#[test]
fn read_ints() {
    let data = [0xff, 0x01, 0x80, 0x00, 0x00, 0x00];

    assert_eq!(read_int(&data[..], 0, NumberKind::Int8, Endian::Little), -1);
    assert_eq!(read_int(&data[..], 0, NumberKind::UInt8, Endian::Little), 255);
    assert_eq!(read_int(&data[..], 0, NumberKind::UInt16, Endian::Little), 0x01ff);
    assert_eq!(read_int(&data[..], 0, NumberKind::UInt16, Endian::Big), 0xff01);
    assert_eq!(read_int(&data[..], 1, NumberKind::Int16, Endian::Big), 0x0180);
    assert_eq!(read_int(&data[..], 0, NumberKind::Int32, Endian::Big), -16_678_912);
    assert_eq!(read_int(&data[..], 0, NumberKind::UInt32, Endian::Big), 0xff01_8000);
}

#[test]
fn write_ints_wrap() {
    let mut data = [0u8; 4];

    write_int(&mut data[..], 0, NumberKind::UInt8, Endian::Little, 256);
    assert_eq!(data[0], 0);
    write_int(&mut data[..], 0, NumberKind::UInt8, Endian::Little, -1);
    assert_eq!(data[0], 255);
    write_int(&mut data[..], 0, NumberKind::Int8, Endian::Little, 128);
    assert_eq!(read_int(&data[..], 0, NumberKind::Int8, Endian::Little), -128);

    write_int(&mut data[..], 0, NumberKind::UInt16, Endian::Big, 0x1234);
    assert_eq!(&data[..2], &[0x12, 0x34]);
    write_int(&mut data[..], 0, NumberKind::UInt32, Endian::Little, 0x1_0000_0001);
    assert_eq!(data, [1, 0, 0, 0]);
}

#[test]
fn floats() {
    let mut data = [0u8; 8];

    write_float(&mut data[..], 0, NumberKind::Float32, Endian::Little, 0.5);
    assert_eq!(&data[..4], &[0, 0, 0, 0x3f]);
    assert_eq!(read_float(&data[..], 0, NumberKind::Float32, Endian::Little), 0.5);

    write_float(&mut data[..], 0, NumberKind::Float64, Endian::Big, -2.0);
    assert_eq!(data, [0xc0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(read_float(&data[..], 0, NumberKind::Float64, Endian::Big), -2.0);

    write_float(&mut data[..], 0, NumberKind::Float64, Endian::Little, f64::INFINITY);
    assert_eq!(read_float(&data[..], 0, NumberKind::Float64, Endian::Little), f64::INFINITY);

    write_float(&mut data[..], 0, NumberKind::UInt8, Endian::Little, 3.9);
    assert_eq!(data[0], 3);
}

#[test]
fn floats_wrap_into_int_fields() {
    assert_eq!(truncate_float(-3.9), -3);
    assert_eq!(truncate_float(1e20), 7_766_279_631_452_241_920);
    assert_eq!(truncate_float(-1e20), -7_766_279_631_452_241_920);
    assert_eq!(truncate_float(f64::NAN), 0);
    assert_eq!(truncate_float(f64::NEG_INFINITY), 0);

    let mut data = [0u8; 4];
    write_float(&mut data[..], 0, NumberKind::UInt32, Endian::Little, 1e20);
    assert_eq!(u32::from_le_bytes(data), 1_661_992_960);
    write_float(&mut data[..], 0, NumberKind::UInt32, Endian::Little, -1.5);
    assert_eq!(u32::from_le_bytes(data), u32::MAX);
}

#[test]
fn strings() {
    let mut data = [0xaau8; 6];

    write_string(&mut data[..], 1, 4, Encoding::Utf8, "hi");
    assert_eq!(data, [0xaa, b'h', b'i', 0, 0, 0xaa]);
    assert_eq!(read_string(&data[..], 1, 4, Encoding::Utf8), "hi");

    // Three-byte character does not fit after "ab".
    write_string(&mut data[..], 0, 4, Encoding::Utf8, "ab\u{20ac}");
    assert_eq!(&data[..4], &[b'a', b'b', 0, 0]);

    // No terminator when the string fills the field.
    write_string(&mut data[..], 0, 4, Encoding::Utf8, "abcdef");
    assert_eq!(read_string(&data[..], 0, 4, Encoding::Utf8), "abcd");

    write_string(&mut data[..], 0, 4, Encoding::Ascii, "\u{e9}t\u{e9}");
    assert_eq!(&data[..4], &[0xe9, b't', 0xe9, 0]);
    assert_eq!(read_string(&data[..], 0, 4, Encoding::Ascii), "iti");
}

#[test]
fn cells() {
    let mut data = [0u8; 4];
    let mut cells: &[Cell<u8>] = Cell::from_mut(&mut data[..]).as_slice_of_cells();

    write_int(&mut cells, 0, NumberKind::UInt16, Endian::Little, 0xbeef);
    assert_eq!(read_int(cells, 0, NumberKind::UInt16, Endian::Little), 0xbeef);
    cells.fill(2, 2, 7);

    let mut copy = [0u8; 3];
    cells.copy_to(1, &mut copy);
    assert_eq!(copy, [0xbe, 7, 7]);
    assert_eq!(data, [0xef, 0xbe, 7, 7]);
}
