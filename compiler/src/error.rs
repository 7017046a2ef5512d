pub use structly_schema::error::{Mismatch, Result, StructlyError};
