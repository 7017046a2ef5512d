use std::sync::Arc;

use structly_schema::{Schema, Value};

use crate::{
    cache::CodecCache,
    compiler::Codec,
    decoder::check_length,
    error::{Result, StructlyError},
    validator::validate_data,
    writer::write,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Validate values against the schema before writing. The destination
    /// size is checked either way.
    pub validate: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions { validate: true }
    }
}

/// Encodes [Value]s into the byte layout of a schema.
///
/// ```
/// use structly_compiler::Encoder;
/// use structly_schema::{array, int8, Value};
///
/// let encoder = Encoder::new(&array(&int8(), 3)).unwrap();
/// let bytes = encoder
///     .encode(&Value::Array(vec![Value::Int(1), Value::Int(-1), Value::Int(2)]))
///     .unwrap();
/// assert_eq!(bytes, [1, 255, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct Encoder {
    schema:  Schema,
    codec:   Arc<Codec>,
    options: EncoderOptions,
}

impl Encoder {
    pub fn new(schema: &Schema) -> Result<Encoder> {
        Encoder::with_options(schema, EncoderOptions::default())
    }

    pub fn with_options(schema: &Schema, options: EncoderOptions) -> Result<Encoder> {
        Encoder::with_cache(schema, options, CodecCache::global())
    }

    pub fn with_cache(schema: &Schema, options: EncoderOptions, cache: &CodecCache) -> Result<Encoder> {
        Ok(Encoder {
            schema: schema.clone(),
            codec: cache.codec_for(schema)?,
            options,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> EncoderOptions {
        self.options
    }

    /// Encodes `value` into a new zero-filled buffer of the schema's size.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let mut dest = vec![0u8; self.codec.byte_length()];
        self.encode_into(value, &mut dest, 0)?;
        Ok(dest)
    }

    /// Encodes `value` into `dest` starting at `offset`. Bytes outside the
    /// schema's footprint are left alone, and nothing is written when the
    /// value is rejected or `dest` is too short.
    pub fn encode_into(&self, value: &Value, dest: &mut [u8], offset: usize) -> Result<()> {
        if self.options.validate {
            if let Some(mismatch) = validate_data(&self.schema, value)? {
                return Err(StructlyError::Mismatch(mismatch));
            }
        }
        check_length(self.codec.byte_length(), dest.len(), offset)?;

        write(self.codec.root(), value, dest, offset);
        Ok(())
    }
}
