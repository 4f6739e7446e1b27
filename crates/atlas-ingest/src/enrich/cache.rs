//! On-disk page cache
//!
//! One file per crawled key under a fixed directory; the presence of the
//! file is the only cache-hit signal. Entries are written once, after a
//! successful fetch, and never invalidated or refreshed, which is what makes
//! an interrupted crawl resumable: a failed fetch leaves no entry, so it is
//! retried on the next run.

use std::path::{Path, PathBuf};

use atlas_common::Result;

/// Durable store of fetched record page bodies, keyed by record identifier.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.html"))
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entry_path(key).exists()
    }

    /// Return the cached body for `key`, if present. No TTL, no validation
    /// against the remote.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    /// Persist a fetched body for `key`.
    pub fn put(&self, key: &str, body: &str) -> Result<()> {
        std::fs::write(self.entry_path(key), body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PageCache::open(dir.path()).unwrap();
        assert_eq!(cache.get("12345").unwrap(), None);
        assert!(!cache.contains("12345"));
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PageCache::open(dir.path()).unwrap();
        cache.put("12345", "<html>page</html>").unwrap();
        assert!(cache.contains("12345"));
        assert_eq!(
            cache.get("12345").unwrap().as_deref(),
            Some("<html>page</html>")
        );
    }

    #[test]
    fn test_entries_persist_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = PageCache::open(dir.path()).unwrap();
            cache.put("77", "body").unwrap();
        }
        let reopened = PageCache::open(dir.path()).unwrap();
        assert_eq!(reopened.get("77").unwrap().as_deref(), Some("body"));
    }
}
