use std::sync::Arc;

use structly_schema::{Schema, Value};

use crate::{
    cache::CodecCache,
    compiler::Codec,
    error::{Result, StructlyError},
    reader::{read, read_into},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Check that the source holds enough bytes before reading.
    pub validate: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions { validate: true }
    }
}

/// Decodes bytes laid out by a schema into [Value]s.
///
/// ```
/// use structly_compiler::Decoder;
/// use structly_schema::{structure, uint8, uint16le, Value};
///
/// let schema = structure([("a", uint8()), ("b", uint16le())]).unwrap();
/// let decoder = Decoder::new(&schema).unwrap();
///
/// let value = decoder.decode(&[7, 0, 0x34, 0x12]).unwrap();
/// assert_eq!(value.get("a"), Some(&Value::Int(7)));
/// assert_eq!(value.get("b"), Some(&Value::Int(0x1234)));
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    schema:  Schema,
    codec:   Arc<Codec>,
    options: DecoderOptions,
}

impl Decoder {
    pub fn new(schema: &Schema) -> Result<Decoder> {
        Decoder::with_options(schema, DecoderOptions::default())
    }

    pub fn with_options(schema: &Schema, options: DecoderOptions) -> Result<Decoder> {
        Decoder::with_cache(schema, options, CodecCache::global())
    }

    pub fn with_cache(schema: &Schema, options: DecoderOptions, cache: &CodecCache) -> Result<Decoder> {
        Ok(Decoder {
            schema: schema.clone(),
            codec: cache.codec_for(schema)?,
            options,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> DecoderOptions {
        self.options
    }

    pub fn decode(&self, source: &[u8]) -> Result<Value> {
        self.decode_at(source, 0)
    }

    /// Decodes the value starting `offset` bytes into `source`.
    ///
    /// # Panics
    ///
    /// With validation disabled, panics if `source` is too short.
    pub fn decode_at(&self, source: &[u8], offset: usize) -> Result<Value> {
        self.check_length(source, offset)?;
        Ok(read(self.codec.root(), source, offset))
    }

    /// Decodes into an existing value, reusing its arrays, objects, strings
    /// and byte buffers when they already have the right shape.
    pub fn decode_into(&self, source: &[u8], target: &mut Value, offset: usize) -> Result<()> {
        self.check_length(source, offset)?;
        read_into(self.codec.root(), source, offset, target);
        Ok(())
    }

    fn check_length(&self, source: &[u8], offset: usize) -> Result<()> {
        if !self.options.validate {
            return Ok(());
        }
        check_length(self.codec.byte_length(), source.len(), offset)
    }
}

pub(crate) fn check_length(byte_length: usize, available: usize, offset: usize) -> Result<()> {
    match offset.checked_add(byte_length) {
        Some(needed) if needed <= available => Ok(()),
        needed => Err(StructlyError::BufferTooSmall {
            needed: needed.unwrap_or(usize::MAX),
            available,
        }),
    }
}
