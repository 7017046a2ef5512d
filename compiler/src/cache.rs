use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lazy_static::lazy_static;
use structly_schema::{Schema, SchemaId, WeakSchema};
use tracing::{debug, trace};

use crate::{
    compiler::{compile, Codec},
    error::Result,
};

lazy_static! {
    static ref GLOBAL: CodecCache = CodecCache::new();
}

/// Entry count at which an insert first sweeps out dead entries.
const PURGE_THRESHOLD: usize = 64;

struct Entry {
    schema: WeakSchema,
    codec:  Arc<Codec>,
}

/// Compiled codecs keyed by schema identity.
///
/// Entries hold their schema weakly, so a schema that is dropped everywhere
/// else stops occupying the cache. Dead entries are swept when an insert
/// finds the cache has doubled since the last sweep, or on
/// [CodecCache::purge].
pub struct CodecCache {
    entries:  RwLock<HashMap<SchemaId, Entry>>,
    purge_at: AtomicUsize,
}

impl Default for CodecCache {
    fn default() -> Self {
        CodecCache::new()
    }
}

impl CodecCache {
    pub fn new() -> CodecCache {
        CodecCache {
            entries:  RwLock::new(HashMap::new()),
            purge_at: AtomicUsize::new(PURGE_THRESHOLD),
        }
    }

    /// The process-wide cache used by encoders, decoders and views.
    pub fn global() -> &'static CodecCache {
        &GLOBAL
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SchemaId, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SchemaId, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, schema: &Schema) -> Option<Arc<Codec>> {
        let entries = self.read();
        let entry = entries.get(&schema.id())?;
        match entry.schema.upgrade() {
            Some(cached) if cached.ptr_eq(schema) => Some(entry.codec.clone()),
            _ => None,
        }
    }

    /// Returns the codec for `schema`, compiling it on first use.
    ///
    /// Compilation happens outside the lock. When two threads race on the
    /// same schema, the first codec inserted wins and both receive it.
    pub fn codec_for(&self, schema: &Schema) -> Result<Arc<Codec>> {
        if let Some(codec) = self.lookup(schema) {
            trace!("Codec cache hit for {:?}", schema.id());
            return Ok(codec);
        }

        let codec = Arc::new(compile(schema)?);

        let mut entries = self.write();
        // purge_at only changes under the write lock.
        if entries.len() >= self.purge_at.load(Ordering::Relaxed) {
            let before = entries.len();
            entries.retain(|_, entry| entry.schema.is_alive());
            if entries.len() < before {
                debug!("Dropped {} codecs for released schemas", before - entries.len());
            }
            self.purge_at
                .store(PURGE_THRESHOLD.max(entries.len() * 2), Ordering::Relaxed);
        }

        if let Some(entry) = entries.get(&schema.id()) {
            if entry.schema.upgrade().is_some_and(|cached| cached.ptr_eq(schema)) {
                return Ok(entry.codec.clone());
            }
        }

        debug!(
            "Compiled codec for {:?} schema ({} bytes)",
            schema.tag(),
            codec.byte_length()
        );
        entries.insert(
            schema.id(),
            Entry {
                schema: schema.downgrade(),
                codec:  codec.clone(),
            },
        );
        Ok(codec)
    }

    /// Number of entries, including any whose schema has been dropped but
    /// not yet purged.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes entries whose schema has been dropped. Returns how many were
    /// removed.
    pub fn purge(&self) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.schema.is_alive());
        before - entries.len()
    }

    pub fn clear(&self) {
        self.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use structly_schema::*;

    #[test]
    fn same_schema_same_codec() {
        let cache = CodecCache::new();
        let schema = structure([("a", uint8()), ("b", uint32())]).unwrap();

        let first = cache.codec_for(&schema).unwrap();
        let second = cache.codec_for(&schema.clone()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn equal_but_distinct_schemas_compile_separately() {
        let cache = CodecCache::new();
        let a = array(&uint8(), 4);
        let b = array(&uint8(), 4);
        assert_eq!(a, b);

        let first = cache.codec_for(&a).unwrap();
        let second = cache.codec_for(&b).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn dropped_schemas_are_purged() {
        let cache = CodecCache::new();
        let kept = uint16le();
        cache.codec_for(&kept).unwrap();

        let dropped = buffer(8);
        cache.codec_for(&dropped).unwrap();
        assert_eq!(cache.len(), 2);

        drop(dropped);
        assert_eq!(cache.purge(), 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn inserts_sweep_only_past_the_threshold() {
        let cache = CodecCache::new();
        let dead: Vec<Schema> = (1..=PURGE_THRESHOLD).map(buffer).collect();
        for schema in &dead {
            cache.codec_for(schema).unwrap();
        }
        drop(dead);
        assert_eq!(cache.len(), PURGE_THRESHOLD);

        let kept = buffer(1);
        cache.codec_for(&kept).unwrap();
        assert_eq!(cache.len(), 1);

        // Live entries survive the sweep and move the next one further out.
        let live: Vec<Schema> = (1..=PURGE_THRESHOLD).map(buffer).collect();
        for schema in &live {
            cache.codec_for(schema).unwrap();
        }
        assert_eq!(cache.len(), PURGE_THRESHOLD + 1);
        cache.codec_for(&buffer(2)).unwrap();
        assert_eq!(cache.len(), PURGE_THRESHOLD + 2);
    }

    #[test]
    fn failed_compiles_are_not_cached() {
        let cache = CodecCache::new();
        let schema = parse_schema(r#"{ "version": 2, "schema": "uint8" }"#).unwrap();
        assert!(cache.codec_for(&schema).is_err());
        assert!(cache.is_empty());
    }
}
