//! Schema descriptors for fixed-layout binary structs.
//!
//! A [Schema] describes a C-style memory layout: numbers with an optional
//! byte order, booleans, fixed-length strings, arrays, tuples, structs,
//! bitfields and raw buffers. Offsets, sizes and alignments are computed once
//! when the schema is built and never change afterwards.
//!
//! ```
//! use structly_schema::*;
//!
//! let schema = structure([
//!     ("a", uint8()),
//!     ("b", int16()),
//!     ("c", int32()),
//!     ("d", uint8()),
//! ])
//! .unwrap();
//!
//! assert_eq!(sizeof(&schema), 9);
//! assert_eq!(alignof(&schema), 4);
//! assert_eq!(strideof(&schema), 12);
//! assert_eq!(schema.field("c").unwrap().byte_offset, 4);
//! ```

pub mod bb;
pub mod def;
pub mod error;
pub mod layout;
pub mod schema;
pub mod value;

pub use bb::*;
pub use def::{parse_schema, PackDef, SchemaDef, SchemaDocument};
pub use error::{Mismatch, StructlyError};
pub use layout::*;
pub use schema::*;
pub use value::*;
