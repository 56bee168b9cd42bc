//! CRUD over the set of configured package repositories, persisted as a
//! single JSON file. First run bootstraps from a bundled defaults list.
use crate::cache::RepoCache;
use crate::error::*;
use crate::model::{normalize_url, Repository};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const DEFAULT_REPOSITORIES_JSON: &str = include_str!("../resources/default_repositories.json");

#[derive(serde::Deserialize)]
struct DefaultRepoEntry {
    name: String,
    url: String,
    description: Option<String>,
}

#[derive(serde::Deserialize)]
struct DefaultRepositories {
    repositories: Vec<DefaultRepoEntry>,
}

pub struct RepoRegistry {
    repos_file: PathBuf,
    repositories: RwLock<Vec<Repository>>,
}

impl RepoRegistry {
    pub fn new(app_dir: &Path) -> DtResult<Self> {
        let repos_file = app_dir.join("repositories.json");
        let repositories = if repos_file.exists() {
            let data = fs::read_to_string(&repos_file)?;
            serde_json::from_str(&data)?
        } else {
            bundled_defaults()
        };
        let registry = Self { repos_file, repositories: RwLock::new(repositories) };
        if !registry.repos_file.exists() {
            registry.save()?;
        }
        Ok(registry)
    }

    fn save(&self) -> DtResult<()> {
        let repos = self.repositories.read().unwrap();
        let json = serde_json::to_string_pretty(&*repos)?;
        if let Some(parent) = self.repos_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.repos_file, json)?;
        Ok(())
    }

    pub fn list(&self) -> Vec<Repository> {
        self.repositories.read().unwrap().clone()
    }

    pub fn get(&self, url: &str) -> Option<Repository> {
        let url = normalize_url(url);
        self.repositories.read().unwrap().iter().find(|r| r.url == url).cloned()
    }

    /// Adds a repository. Returns `false` without modifying anything if the
    /// (normalized) URL is already registered.
    pub fn add(&self, name: &str, url: &str, description: Option<String>) -> DtResult<bool> {
        let url = normalize_url(url);
        {
            let repos = self.repositories.read().unwrap();
            if repos.iter().any(|r| r.url == url) {
                return Ok(false);
            }
        }
        let mut repo = Repository::new(name, url);
        repo.description = description;
        self.repositories.write().unwrap().push(repo);
        self.save()?;
        Ok(true)
    }

    pub fn remove(&self, url: &str, cache: &RepoCache) -> DtResult<bool> {
        let url = normalize_url(url);
        let removed = {
            let mut repos = self.repositories.write().unwrap();
            let before = repos.len();
            repos.retain(|r| r.url != url);
            repos.len() != before
        };
        if removed {
            cache.clear(Some(&url))?;
            self.save()?;
        }
        Ok(removed)
    }

    pub fn mark_refreshed(&self, url: &str, packages_count: usize, timestamp: &str) -> DtResult<()> {
        let url = normalize_url(url);
        {
            let mut repos = self.repositories.write().unwrap();
            if let Some(repo) = repos.iter_mut().find(|r| r.url == url) {
                repo.packages_count = packages_count;
                repo.last_updated = Some(timestamp.to_string());
            }
        }
        self.save()
    }
}

fn bundled_defaults() -> Vec<Repository> {
    let parsed: DefaultRepositories = serde_json::from_str(DEFAULT_REPOSITORIES_JSON).expect("bundled default_repositories.json is valid");
    parsed
        .repositories
        .into_iter()
        .map(|entry| {
            let mut repo = Repository::new(entry.name, entry.url);
            repo.description = entry.description;
            repo
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn first_run_bootstraps_from_bundled_defaults() {
        let dir = tempdir().unwrap();
        let registry = RepoRegistry::new(dir.path()).unwrap();
        assert!(registry.list().iter().any(|r| r.name == "BigBoss"));
        assert!(dir.path().join("repositories.json").exists());
    }

    #[test]
    fn add_rejects_duplicate_url() {
        let dir = tempdir().unwrap();
        let registry = RepoRegistry::new(dir.path()).unwrap();
        assert!(registry.add("Test", "https://example.com/repo", None).unwrap());
        assert!(!registry.add("Test Again", "https://example.com/repo/", None).unwrap());
    }

    #[test]
    fn remove_clears_cache_entry() {
        let dir = tempdir().unwrap();
        let registry = RepoRegistry::new(dir.path()).unwrap();
        let cache = RepoCache::new(dir.path()).unwrap();
        registry.add("Test", "https://example.com/repo", None).unwrap();
        cache.put("https://example.com/repo/", &[]).unwrap();
        assert!(registry.remove("https://example.com/repo", &cache).unwrap());
        assert!(cache.get("https://example.com/repo/").is_none());
    }
}
