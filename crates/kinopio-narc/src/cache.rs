//! Cache of decoded actor archives.
//!
//! Actor models are shared by many stages, so the editor keeps decoded
//! archives around keyed by path. A hit is only trusted when the
//! modification time the caller observes now equals the one captured when
//! the archive was inserted. The cache never touches the filesystem itself.

use std::hash::BuildHasherDefault;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use hashbrown::HashMap;
use parking_lot::RwLock;
use rustc_hash::FxHasher;

use crate::Narc;

type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;

#[derive(Debug, Clone)]
struct CachedArchive {
    modified: SystemTime,
    archive: Arc<Narc>,
}

/// Thread-safe archive cache with single-writer/multiple-reader locking.
#[derive(Debug, Default)]
pub struct ActorCache {
    entries: RwLock<FxHashMap<PathBuf, CachedArchive>>,
}

impl ActorCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `path`, returning the archive only if it is not stale.
    pub fn get(&self, path: &Path, modified: SystemTime) -> Option<Arc<Narc>> {
        let entries = self.entries.read();
        entries
            .get(path)
            .filter(|cached| cached.modified == modified)
            .map(|cached| Arc::clone(&cached.archive))
    }

    /// Store an archive decoded from the file at `path` as it was at `modified`.
    pub fn insert(&self, path: impl Into<PathBuf>, modified: SystemTime, archive: Narc) -> Arc<Narc> {
        let archive = Arc::new(archive);
        self.entries.write().insert(
            path.into(),
            CachedArchive {
                modified,
                archive: Arc::clone(&archive),
            },
        );
        archive
    }

    /// Return the cached archive or decode it with `load`.
    ///
    /// `load` runs without holding the lock, so concurrent misses on the same
    /// path may both decode; the first one to finish wins.
    pub fn get_or_try_insert_with<F, E>(&self, path: &Path, modified: SystemTime, load: F) -> Result<Arc<Narc>, E>
    where
        F: FnOnce() -> Result<Narc, E>,
    {
        if let Some(hit) = self.get(path, modified) {
            return Ok(hit);
        }

        let archive = load()?;

        let mut entries = self.entries.write();
        if let Some(cached) = entries.get(path).filter(|c| c.modified == modified) {
            return Ok(Arc::clone(&cached.archive));
        }

        tracing::debug!(path = %path.display(), entries = archive.len(), "caching actor archive");
        let archive = Arc::new(archive);
        entries.insert(
            path.to_path_buf(),
            CachedArchive {
                modified,
                archive: Arc::clone(&archive),
            },
        );
        Ok(archive)
    }

    /// Drop the entry for `path`. Returns whether one was present.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries.write().remove(path).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of cached archives, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn archive(name: &str) -> Narc {
        let mut narc = Narc::new();
        narc.insert(name, vec![1, 2, 3]).unwrap();
        narc
    }

    #[test]
    fn test_hit_and_stale() {
        let cache = ActorCache::new();
        let path = Path::new("ObjectData/Kuribo.szs");
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let t1 = t0 + Duration::from_secs(1);

        cache.insert(path, t0, archive("Kuribo.bcmdl"));
        assert!(cache.get(path, t0).is_some());
        assert!(cache.get(path, t1).is_none());
        assert!(cache.get(Path::new("ObjectData/Other.szs"), t0).is_none());
    }

    #[test]
    fn test_get_or_try_insert_with() {
        let cache = ActorCache::new();
        let path = Path::new("ObjectData/Nokonoko.szs");
        let t0 = SystemTime::UNIX_EPOCH;

        let first = cache
            .get_or_try_insert_with(path, t0, || Ok::<_, ()>(archive("a")))
            .unwrap();
        let second = cache
            .get_or_try_insert_with(path, t0, || -> Result<Narc, ()> { panic!("should be cached") })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let failed = cache.get_or_try_insert_with(path, t0 + Duration::from_secs(5), || Err("io"));
        assert_eq!(failed.unwrap_err(), "io");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = ActorCache::new();
        let t0 = SystemTime::UNIX_EPOCH;
        cache.insert("a.szs", t0, archive("a"));
        cache.insert("b.szs", t0, archive("b"));

        assert!(cache.invalidate(Path::new("a.szs")));
        assert!(!cache.invalidate(Path::new("a.szs")));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
