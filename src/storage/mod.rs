//! Two-partition artifact cache.
//!
//! Structured artifacts live under `structured/<identifier>.png` and are the
//! only ones ever looked up. Generic artifacts get a fresh `<prefix>_<millis>.png`
//! name on every store and are only ever counted or evicted.

mod fs;
mod memory;

pub use fs::FsArtifactStore;
pub use memory::MemoryArtifactStore;

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StorageError;

pub const ARTIFACT_EXTENSION: &str = "png";
pub const DEFAULT_GENERIC_PREFIX: &str = "qr";

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Content derived, one artifact per identifier.
    Stable(String),
    /// Fresh name per store, never produces a hit.
    Volatile,
}

impl CacheKey {
    pub fn partition(&self) -> Partition {
        match self {
            CacheKey::Stable(_) => Partition::Structured,
            CacheKey::Volatile => Partition::Generic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Structured,
    Generic,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Partition::Structured, Partition::Generic];

    pub fn dir_name(self) -> &'static str {
        match self {
            Partition::Structured => "structured",
            Partition::Generic => "generic",
        }
    }
}

impl Display for Partition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Where a stored artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredLocation {
    pub partition: Partition,
    pub filename: String,
    pub path: PathBuf,
    /// Partition-relative path with forward slashes, e.g. `structured/ABC.png`.
    pub relative: String,
}

impl StoredLocation {
    pub(crate) fn new(partition: Partition, filename: String, path: PathBuf) -> Self {
        let relative = format!("{}/{}", partition.dir_name(), filename);
        Self { partition, filename, path, relative }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub bytes: Vec<u8>,
    pub location: StoredLocation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub structured_count: usize,
    pub generic_count: usize,
    pub total: usize,
}

impl StorageStats {
    pub fn new(structured_count: usize, generic_count: usize) -> Self {
        Self { structured_count, generic_count, total: structured_count + generic_count }
    }
}

/// Persistence collaborator of the generation pipeline.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Reads `structured/<identifier>.png`. Any failure reads as a miss.
    async fn lookup(&self, identifier: &str) -> Option<StoredArtifact>;

    /// Writes into the partition picked by `key`, creating it if absent.
    /// Stable keys overwrite, volatile keys always get a new name.
    async fn store(&self, bytes: &[u8], key: &CacheKey) -> StorageResult<StoredLocation>;

    /// Deletes generic artifacts strictly older than `max_age` and returns how many went.
    async fn evict_older_than(&self, max_age: Duration) -> StorageResult<usize>;

    async fn stats(&self) -> StorageResult<StorageStats>;
}

pub(crate) fn structured_filename(identifier: &str) -> StorageResult<String> {
    let valid = !identifier.is_empty()
        && identifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(StorageError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(format!("{identifier}.{ARTIFACT_EXTENSION}"))
}

pub(crate) fn generic_filename(prefix: &str, millis: i64) -> String {
    format!("{prefix}_{millis}.{ARTIFACT_EXTENSION}")
}

pub(crate) fn is_generic_filename(prefix: &str, name: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|rest| rest.ends_with(&format!(".{ARTIFACT_EXTENSION}")))
}

pub(crate) fn is_artifact_filename(name: &str) -> bool {
    name.ends_with(&format!(".{ARTIFACT_EXTENSION}"))
}
