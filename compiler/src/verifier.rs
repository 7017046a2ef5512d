use structly_schema::{Schema, SchemaKind, SCHEMA_VERSION};

use crate::error::{Result, StructlyError};

/// Returns `Ok(())` if every node of the schema tree was built with the
/// current layout rules, or `Err(StructlyError::VersionMismatch)` otherwise.
pub fn verify_schema(schema: &Schema) -> Result<()> {
    if schema.version() != SCHEMA_VERSION {
        return Err(StructlyError::VersionMismatch {
            found:    schema.version(),
            expected: SCHEMA_VERSION,
        });
    }

    match schema.kind() {
        SchemaKind::Array { element, .. } => verify_schema(element),
        SchemaKind::Tuple { fields } => fields
            .iter()
            .try_for_each(|field| verify_schema(&field.schema)),
        SchemaKind::Struct { fields } => fields
            .iter()
            .try_for_each(|field| verify_schema(&field.schema)),
        SchemaKind::Bitfield { storage, .. } => verify_schema(storage),
        _ => Ok(()),
    }
}
