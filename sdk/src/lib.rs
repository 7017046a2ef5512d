//! structly
//!
//! Runtime entry point for working with fixed-layout binary structs.
//!
//! - Schema constructors and layout helpers (re-exported from structly-schema)
//! - `Encoder`, `Decoder`, `View`, `validate_data` and the `FromValue` trait
//!   (re-exported from structly-compiler)
//! - `Converter`, which pairs an encoder with a decoder, and one-shot helpers
//!
//! ```
//! use structly::*;
//!
//! let schema = structure([("x", float32le()), ("y", float32le())]).unwrap();
//! let point = Value::object([("x", Value::Float(0.5)), ("y", Value::Float(-0.5))]);
//!
//! let bytes = encode(&schema, &point).unwrap();
//! assert_eq!(bytes, [0, 0, 0, 63, 0, 0, 0, 191]);
//! assert_eq!(decode(&schema, &bytes).unwrap(), point);
//! ```

mod converter;

pub use converter::Converter;

pub use structly_compiler::{
    field, validate_data, Access, ArrayView, BitfieldView, CodecCache, Decoder, DecoderOptions,
    Encoder, EncoderOptions, FromValue, StructView, View,
};
pub use structly_schema::*;

use structly_schema::error::Result;

/// Encodes `value` with the default (validating) encoder for `schema`.
pub fn encode(schema: &Schema, value: &Value) -> Result<Vec<u8>> {
    Encoder::new(schema)?.encode(value)
}

/// Decodes `source` with the default (validating) decoder for `schema`.
pub fn decode(schema: &Schema, source: &[u8]) -> Result<Value> {
    Decoder::new(schema)?.decode(source)
}

/// Decode a buffer into a pretty-printed JSON string.
pub fn decode_to_json(schema: &Schema, source: &[u8]) -> Result<String> {
    let value = decode(schema, source)?;
    Ok(serde_json::to_string_pretty(&value.to_json())?)
}

/// Encode JSON text. Buffer members are given as arrays of byte values.
pub fn encode_from_json(schema: &Schema, text: &str) -> Result<Vec<u8>> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    encode(schema, &Value::from_json_with_schema(&json, schema)?)
}

pub mod traits {
    pub use structly_compiler::traits::{field, FromValue};
}

pub mod error {
    pub use structly_schema::error::{Mismatch, Result, StructlyError};
}
