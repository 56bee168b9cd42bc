//! Two-tier cache for a repository's parsed package list: an in-process
//! map consulted first, backed by one JSON file per repository keyed by
//! `md5(url)`, expiring after 24 hours.
use crate::error::*;
use crate::model::Package;
use md5::{Digest, Md5};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct RepoCache {
    cache_dir: PathBuf,
    memory: RwLock<HashMap<String, Vec<Package>>>,
}

fn cache_key(url: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

impl RepoCache {
    pub fn new(app_dir: &Path) -> DtResult<Self> {
        let cache_dir = app_dir.join("repo_cache");
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir, memory: RwLock::new(HashMap::new()) })
    }

    fn cache_file(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", cache_key(url)))
    }

    /// Returns the cached packages for `url` if present in memory, or on
    /// disk and not yet expired.
    pub fn get(&self, url: &str) -> Option<Vec<Package>> {
        if let Some(packages) = self.memory.read().unwrap().get(url) {
            return Some(packages.clone());
        }

        let path = self.cache_file(url);
        let metadata = fs::metadata(&path).ok()?;
        let modified = metadata.modified().ok()?;
        if SystemTime::now().duration_since(modified).ok()? > CACHE_TTL {
            return None;
        }

        let data = fs::read_to_string(&path).ok()?;
        let packages: Vec<Package> = serde_json::from_str(&data).ok()?;
        self.memory.write().unwrap().insert(url.to_string(), packages.clone());
        Some(packages)
    }

    /// Writes `packages` to both tiers. Disk writes happen via a temp file
    /// plus rename so a crash mid-write never leaves a truncated cache file.
    pub fn put(&self, url: &str, packages: &[Package]) -> DtResult<()> {
        self.memory.write().unwrap().insert(url.to_string(), packages.to_vec());

        let path = self.cache_file(url);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string(packages)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Clears one repository's cache entry, or every entry when `url` is
    /// `None`.
    pub fn clear(&self, url: Option<&str>) -> DtResult<()> {
        match url {
            Some(url) => {
                self.memory.write().unwrap().remove(url);
                let path = self.cache_file(url);
                if path.exists() {
                    fs::remove_file(path)?;
                }
            },
            None => {
                self.memory.write().unwrap().clear();
                for entry in fs::read_dir(&self.cache_dir)? {
                    let entry = entry?;
                    if entry.path().extension().is_some_and(|e| e == "json") {
                        fs::remove_file(entry.path())?;
                    }
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_packages() -> Vec<Package> {
        let mut pkg = Package::default();
        pkg.package = "com.example.tweak".into();
        pkg.version = "1.0".into();
        vec![pkg]
    }

    #[test]
    fn round_trips_through_disk_tier() {
        let dir = tempdir().unwrap();
        let cache = RepoCache::new(dir.path()).unwrap();
        let packages = sample_packages();
        cache.put("https://repo.example/", &packages).unwrap();

        let fresh_cache = RepoCache::new(dir.path()).unwrap();
        let loaded = fresh_cache.get("https://repo.example/").unwrap();
        assert_eq!(loaded, packages);
    }

    #[test]
    fn memory_tier_short_circuits_disk() {
        let dir = tempdir().unwrap();
        let cache = RepoCache::new(dir.path()).unwrap();
        cache.put("https://repo.example/", &sample_packages()).unwrap();
        assert!(cache.memory.read().unwrap().contains_key("https://repo.example/"));
    }

    #[test]
    fn clear_removes_entry() {
        let dir = tempdir().unwrap();
        let cache = RepoCache::new(dir.path()).unwrap();
        cache.put("https://repo.example/", &sample_packages()).unwrap();
        cache.clear(Some("https://repo.example/")).unwrap();
        assert!(cache.get("https://repo.example/").is_none());
    }

    #[test]
    fn cache_key_is_stable_md5() {
        assert_eq!(cache_key("https://repo.example/"), cache_key("https://repo.example/"));
        assert_ne!(cache_key("https://a/"), cache_key("https://b/"));
    }
}
