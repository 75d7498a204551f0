//! Filesystem store backed by `tokio::fs`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::{
    generic_filename, is_artifact_filename, is_generic_filename, structured_filename,
    ArtifactStore, CacheKey, Partition, StorageResult, StorageStats, StoredArtifact,
    StoredLocation, DEFAULT_GENERIC_PREFIX,
};
use crate::error::StorageError;

pub struct FsArtifactStore {
    root: PathBuf,
    generic_prefix: String,
    last_stamp: AtomicI64,
    temp_seq: AtomicU64,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_prefix(root, DEFAULT_GENERIC_PREFIX)
    }

    pub fn with_prefix(root: impl Into<PathBuf>, generic_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            generic_prefix: generic_prefix.into(),
            last_stamp: AtomicI64::new(0),
            temp_seq: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn partition_dir(&self, partition: Partition) -> PathBuf {
        self.root.join(partition.dir_name())
    }

    // Wall clock millis, forced strictly increasing within this store
    fn next_stamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let prev = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or(now);
        now.max(prev + 1)
    }

    async fn ensure_dir(&self, partition: Partition) -> StorageResult<PathBuf> {
        let dir = self.partition_dir(partition);
        tokio::fs::create_dir_all(&dir).await.map_err(StorageError::io("create", &dir))?;
        Ok(dir)
    }

    async fn store_structured(&self, bytes: &[u8], identifier: &str) -> StorageResult<StoredLocation> {
        let filename = structured_filename(identifier)?;
        let dir = self.ensure_dir(Partition::Structured).await?;
        let path = dir.join(&filename);

        // Unique temp name so concurrent writers never interleave bytes
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let temp = dir.join(format!(".{identifier}.{}.{seq}.tmp", std::process::id()));
        tokio::fs::write(&temp, bytes).await.map_err(StorageError::io("write", &temp))?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StorageError::io("rename", &path)(e));
        }

        Ok(StoredLocation::new(Partition::Structured, filename, path))
    }

    async fn store_generic(&self, bytes: &[u8]) -> StorageResult<StoredLocation> {
        let dir = self.ensure_dir(Partition::Generic).await?;
        loop {
            let filename = generic_filename(&self.generic_prefix, self.next_stamp());
            let path = dir.join(&filename);
            let file = tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await;
            let mut file = match file {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Generic name taken, retrying");
                    continue;
                }
                Err(e) => return Err(StorageError::io("create", &path)(e)),
            };
            fill_new_file(file, &path, bytes).await?;
            return Ok(StoredLocation::new(Partition::Generic, filename, path));
        }
    }

    async fn count_artifacts(&self, partition: Partition) -> StorageResult<usize> {
        let dir = self.partition_dir(partition);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::io("read", &dir)(e)),
        };
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.map_err(StorageError::io("read", &dir))? {
            if entry.file_name().to_str().is_some_and(is_artifact_filename) {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn lookup(&self, identifier: &str) -> Option<StoredArtifact> {
        let filename = structured_filename(identifier).ok()?;
        let path = self.partition_dir(Partition::Structured).join(&filename);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(StoredArtifact {
                bytes,
                location: StoredLocation::new(Partition::Structured, filename, path),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, bytes: &[u8], key: &CacheKey) -> StorageResult<StoredLocation> {
        let location = match key {
            CacheKey::Stable(identifier) => self.store_structured(bytes, identifier).await?,
            CacheKey::Volatile => self.store_generic(bytes).await?,
        };
        info!(path = %location.path.display(), bytes = bytes.len(), "Stored artifact");
        Ok(location)
    }

    async fn evict_older_than(&self, max_age: Duration) -> StorageResult<usize> {
        let dir = self.partition_dir(Partition::Generic);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::io("read", &dir)(e)),
        };

        let now = SystemTime::now();
        let mut deleted = 0;
        while let Some(entry) = entries.next_entry().await.map_err(StorageError::io("read", &dir))? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_generic_filename(&self.generic_prefix, name) {
                continue;
            }

            let path = entry.path();
            let modified = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io("stat", &path)(e)),
            };
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= max_age {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    deleted += 1;
                    debug!(path = %path.display(), age_ms = age.as_millis() as u64, "Evicted artifact");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io("delete", &path)(e)),
            }
        }

        info!(deleted, max_age_ms = max_age.as_millis() as u64, "Evicted generic artifacts");
        Ok(deleted)
    }

    async fn stats(&self) -> StorageResult<StorageStats> {
        let structured = self.count_artifacts(Partition::Structured).await?;
        let generic = self.count_artifacts(Partition::Generic).await?;
        Ok(StorageStats::new(structured, generic))
    }
}

// Writes into a freshly created file, removing it again if the write fails
async fn fill_new_file<W>(mut file: W, path: &Path, bytes: &[u8]) -> StorageResult<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    let Err(e) = written else {
        return Ok(());
    };

    drop(file);
    if let Err(cleanup) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %cleanup, "Failed to remove partial artifact");
    }
    Err(StorageError::io("write", path)(e))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;

    struct BrokenDisk;

    impl AsyncWrite for BrokenDisk {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::other("disk full")))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr_1.png");
        tokio::fs::write(&path, b"half").await.unwrap();

        let err = fill_new_file(BrokenDisk, &path, b"png bytes").await.unwrap_err();
        assert!(matches!(err, StorageError::Io { op: "write", .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_fill_new_file_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr_2.png");
        let file = tokio::fs::File::create(&path).await.unwrap();
        fill_new_file(file, &path, b"png bytes").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"png bytes");
    }

    #[tokio::test]
    async fn test_structured_roundtrip_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let key = CacheKey::Stable("TEST_CODE".into());

        let loc = store.store(b"first", &key).await.unwrap();
        assert_eq!(loc.filename, "TEST_CODE.png");
        assert_eq!(loc.relative, "structured/TEST_CODE.png");
        assert_eq!(loc.path, dir.path().join("structured").join("TEST_CODE.png"));

        store.store(b"second", &key).await.unwrap();
        let hit = store.lookup("TEST_CODE").await.unwrap();
        assert_eq!(hit.bytes, b"second");
        assert_eq!(hit.location, loc);
    }

    #[tokio::test]
    async fn test_lookup_missing_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("never-created"));
        assert!(store.lookup("ABC").await.is_none());
        assert!(store.lookup("../escape").await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_ignores_generic_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let loc = store.store(b"x", &CacheKey::Volatile).await.unwrap();
        let stem = loc.filename.trim_end_matches(".png").to_string();
        assert!(store.lookup(&stem).await.is_none());
    }

    #[tokio::test]
    async fn test_generic_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let mut names = Vec::new();
        for _ in 0..20 {
            let loc = store.store(b"same", &CacheKey::Volatile).await.unwrap();
            assert!(loc.filename.starts_with("qr_"));
            assert!(loc.relative.starts_with("generic/"));
            names.push(loc.filename);
        }
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }

    #[tokio::test]
    async fn test_generic_collision_bumps_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let first = FsArtifactStore::new(dir.path());
        let second = FsArtifactStore::new(dir.path());
        // Two stores in one directory share no counter, create_new keeps them apart
        let a = first.store(b"a", &CacheKey::Volatile).await.unwrap();
        second.last_stamp.store(first.last_stamp.load(Ordering::SeqCst) - 1, Ordering::SeqCst);
        let b = second.store(b"b", &CacheKey::Volatile).await.unwrap();
        assert_ne!(a.filename, b.filename);
        assert_eq!(tokio::fs::read(&a.path).await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_stats_counts_png_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        assert_eq!(store.stats().await.unwrap(), StorageStats::new(0, 0));

        store.store(b"1", &CacheKey::Stable("A".into())).await.unwrap();
        store.store(b"2", &CacheKey::Stable("B".into())).await.unwrap();
        store.store(b"3", &CacheKey::Volatile).await.unwrap();
        tokio::fs::write(dir.path().join("generic").join("notes.txt"), b"x").await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StorageStats { structured_count: 2, generic_count: 1, total: 3 });
    }

    #[tokio::test]
    async fn test_evict_only_old_generic() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        store.store(b"s", &CacheKey::Stable("KEEP".into())).await.unwrap();
        store.store(b"g1", &CacheKey::Volatile).await.unwrap();
        store.store(b"g2", &CacheKey::Volatile).await.unwrap();
        let stray = dir.path().join("generic").join("other.png");
        tokio::fs::write(&stray, b"x").await.unwrap();

        assert_eq!(store.evict_older_than(Duration::from_secs(3600)).await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.evict_older_than(Duration::ZERO).await.unwrap(), 2);

        assert!(store.lookup("KEEP").await.is_some());
        assert!(stray.exists());
        assert_eq!(store.stats().await.unwrap(), StorageStats::new(1, 1));
    }

    #[tokio::test]
    async fn test_evict_missing_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        assert_eq!(store.evict_older_than(Duration::ZERO).await.unwrap(), 0);
    }
}
