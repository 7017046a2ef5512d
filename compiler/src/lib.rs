//! structly-compiler
//!
//! This crate turns [Schema](structly_schema::Schema)s into working codecs:
//!  1) A verifier that rejects schemas built for another layout version,
//!  2) `compile`, which lowers a schema into a tree of offset-resolved ops,
//!  3) `Encoder` / `Decoder` built on those ops, with optional validation,
//!  4) `validate_data`, reporting exactly which members disagree with a schema,
//!  5) `View`, live read/write access to a buffer shaped by a schema,
//!  6) `CodecCache`, so each schema is only compiled once, and the `FromValue` trait.

pub mod cache;
pub mod compiler;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod reader;
pub mod traits;
pub mod validator;
pub mod verifier;
pub mod view;
pub mod writer;

pub use cache::CodecCache;
pub use compiler::{compile, Codec};
pub use decoder::{Decoder, DecoderOptions};
pub use encoder::{Encoder, EncoderOptions};
pub use traits::{field, FromValue};
pub use validator::validate_data;
pub use verifier::verify_schema;
pub use view::{Access, ArrayView, BitfieldView, StructView, View};
