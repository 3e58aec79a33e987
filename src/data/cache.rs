//! Session cache for loaded datasets.
//!
//! A `DatasetCache` is created once per session and handed to whichever
//! front-end needs data. The first request for a path loads the CSV; later
//! requests reuse the same `Arc<SalesDataset>` until the entry expires (when a
//! TTL is configured) or is explicitly invalidated. Failed loads are never
//! cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::SalesDataset;
use crate::error::DataError;

struct CacheEntry {
    dataset: Arc<SalesDataset>,
    loaded_at: Instant,
}

pub struct DatasetCache {
    ttl: Option<Duration>,
    entries: HashMap<PathBuf, CacheEntry>,
    loads: usize,
}

impl DatasetCache {
    /// Create an empty cache. `ttl = None` keeps entries until invalidated.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            loads: 0,
        }
    }

    /// Return the cached dataset for `path`, loading it if absent or stale.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<SalesDataset>, DataError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(path) {
            if !self.is_stale(entry, now) {
                tracing::debug!(path = %path.display(), "dataset cache hit");
                return Ok(Arc::clone(&entry.dataset));
            }
            tracing::debug!(path = %path.display(), "dataset cache entry expired");
        } else {
            tracing::debug!(path = %path.display(), "dataset cache miss");
        }

        // Drop the stale entry first so a failed reload does not keep serving it.
        self.entries.remove(path);

        let dataset = Arc::new(crate::io::ingest::load(path)?);
        self.loads += 1;
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                dataset: Arc::clone(&dataset),
                loaded_at: now,
            },
        );
        Ok(dataset)
    }

    /// Forget the entry for `path`. Returns whether one existed.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let removed = self.entries.remove(path).is_some();
        if removed {
            tracing::info!(path = %path.display(), "dataset cache invalidated");
        }
        removed
    }

    pub fn invalidate_all(&mut self) {
        let n = self.entries.len();
        self.entries.clear();
        tracing::info!(entries = n, "dataset cache cleared");
    }

    /// Number of actual file loads performed by this cache.
    pub fn loads(&self) -> usize {
        self.loads
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn is_stale(&self, entry: &CacheEntry, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(entry.loaded_at) >= ttl,
            None => false,
        }
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "date,category,sales\n{body}").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn second_request_reuses_loaded_dataset() {
        let file = csv_file("2024-01-01,A,10\n");
        let mut cache = DatasetCache::new(None);

        let a = cache.get_or_load(file.path()).unwrap();
        let b = cache.get_or_load(file.path()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.loads(), 1);
    }

    #[test]
    fn cached_data_survives_file_changes_until_invalidated() {
        let mut file = csv_file("2024-01-01,A,10\n");
        let mut cache = DatasetCache::default();

        let first = cache.get_or_load(file.path()).unwrap();
        assert_eq!(first.records.len(), 1);

        writeln!(file, "2024-01-02,B,20").unwrap();
        file.flush().unwrap();

        let stale = cache.get_or_load(file.path()).unwrap();
        assert_eq!(stale.records.len(), 1);

        assert!(cache.invalidate(file.path()));
        let fresh = cache.get_or_load(file.path()).unwrap();
        assert_eq!(fresh.records.len(), 2);
        assert_eq!(cache.loads(), 2);
    }

    #[test]
    fn zero_ttl_reloads_every_time() {
        let file = csv_file("2024-01-01,A,10\n");
        let mut cache = DatasetCache::new(Some(Duration::ZERO));
        cache.get_or_load(file.path()).unwrap();
        cache.get_or_load(file.path()).unwrap();
        assert_eq!(cache.loads(), 2);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut cache = DatasetCache::default();
        let missing = Path::new("/no/such/sales.csv");
        assert!(cache.get_or_load(missing).is_err());
        assert!(!cache.contains(missing));
        assert_eq!(cache.loads(), 0);
    }

    #[test]
    fn invalidate_all_clears_entries() {
        let file = csv_file("2024-01-01,A,10\n");
        let mut cache = DatasetCache::default();
        cache.get_or_load(file.path()).unwrap();
        cache.invalidate_all();
        assert!(!cache.contains(file.path()));
        assert!(!cache.invalidate(file.path()));
    }
}
