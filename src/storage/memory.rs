//! In-memory store for tests and embedding.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    generic_filename, structured_filename, ArtifactStore, CacheKey, Partition, StorageResult,
    StorageStats, StoredArtifact, StoredLocation, DEFAULT_GENERIC_PREFIX,
};

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    modified: SystemTime,
}

#[derive(Default)]
pub struct MemoryArtifactStore {
    structured: RwLock<HashMap<String, Entry>>,
    generic: RwLock<HashMap<String, Entry>>,
    seq: AtomicUsize,
    lookups: AtomicUsize,
    stores: AtomicUsize,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    /// Backdates a generic artifact, for eviction tests.
    pub fn set_generic_modified(&self, filename: &str, modified: SystemTime) -> bool {
        match self.generic.write().get_mut(filename) {
            Some(entry) => {
                entry.modified = modified;
                true
            }
            None => false,
        }
    }

    fn location(partition: Partition, filename: String) -> StoredLocation {
        let path = PathBuf::from(partition.dir_name()).join(&filename);
        StoredLocation::new(partition, filename, path)
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn lookup(&self, identifier: &str) -> Option<StoredArtifact> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let filename = structured_filename(identifier).ok()?;
        let bytes = self.structured.read().get(&filename)?.bytes.clone();
        Some(StoredArtifact { bytes, location: Self::location(Partition::Structured, filename) })
    }

    async fn store(&self, bytes: &[u8], key: &CacheKey) -> StorageResult<StoredLocation> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        let entry = Entry { bytes: bytes.to_vec(), modified: SystemTime::now() };
        let (partition, filename) = match key {
            CacheKey::Stable(identifier) => {
                let filename = structured_filename(identifier)?;
                self.structured.write().insert(filename.clone(), entry);
                (Partition::Structured, filename)
            }
            CacheKey::Volatile => {
                let seq = self.seq.fetch_add(1, Ordering::SeqCst) as i64;
                let filename = generic_filename(DEFAULT_GENERIC_PREFIX, seq);
                self.generic.write().insert(filename.clone(), entry);
                (Partition::Generic, filename)
            }
        };
        Ok(Self::location(partition, filename))
    }

    async fn evict_older_than(&self, max_age: Duration) -> StorageResult<usize> {
        let now = SystemTime::now();
        let mut generic = self.generic.write();
        let before = generic.len();
        generic.retain(|_, e| now.duration_since(e.modified).unwrap_or(Duration::ZERO) <= max_age);
        Ok(before - generic.len())
    }

    async fn stats(&self) -> StorageResult<StorageStats> {
        Ok(StorageStats::new(self.structured.read().len(), self.generic.read().len()))
    }
}
