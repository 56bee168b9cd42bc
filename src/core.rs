//! The value a host owns and calls into; no process-global singleton lives
//! inside the library itself.
use crate::cache::RepoCache;
use crate::downloader::{self, CancellationToken, ProgressCallback};
use crate::error::*;
use crate::http_client::HttpClientHandle;
use crate::index;
use crate::jailbreak::JailbreakConfigManager;
use crate::listener::Listener;
use crate::model::{Package, Repository};
use crate::registry::RepoRegistry;
use std::path::{Path, PathBuf};

pub struct CoreConfig {
    pub app_dir: PathBuf,
}

impl CoreConfig {
    /// Uses the platform's XDG cache directory under a `debtool` prefix
    /// when the host doesn't supply an explicit `app_dir`.
    pub fn from_xdg() -> DtResult<Self> {
        let dirs = xdg::BaseDirectories::with_prefix("debtool").map_err(|_| DebtoolError::Str("could not resolve XDG base directories"))?;
        Ok(Self { app_dir: dirs.get_cache_home() })
    }
}

pub struct Core {
    app_dir: PathBuf,
    registry: RepoRegistry,
    cache: RepoCache,
    jailbreak: JailbreakConfigManager,
    http: HttpClientHandle,
}

impl Core {
    pub fn new(config: CoreConfig) -> DtResult<Self> {
        std::fs::create_dir_all(&config.app_dir)?;
        let registry = RepoRegistry::new(&config.app_dir)?;
        let cache = RepoCache::new(&config.app_dir)?;
        let jailbreak = JailbreakConfigManager::new(&config.app_dir)?;
        let http = HttpClientHandle::new(&jailbreak.config(), &config.app_dir)?;
        Ok(Self { app_dir: config.app_dir, registry, cache, jailbreak, http })
    }

    pub fn registry(&self) -> &RepoRegistry {
        &self.registry
    }

    pub fn jailbreak(&self) -> &JailbreakConfigManager {
        &self.jailbreak
    }

    /// Switches between Sileo and Cydia header profiles, rebuilding the
    /// HTTP client so subsequent requests pick it up immediately.
    pub fn set_sileo_headers(&self, enabled: bool) -> DtResult<()> {
        let changed = self.jailbreak.toggle_sileo_headers(enabled)?;
        if changed {
            self.http.rebuild(&self.jailbreak.config(), &self.app_dir)?;
        }
        Ok(())
    }

    /// Returns a repository's packages, consulting the cache first and
    /// fetching fresh ones on a miss or when `force_refresh` is set.
    pub fn fetch_packages(&self, repo_url: &str, force_refresh: bool, listener: &dyn Listener) -> DtResult<Vec<Package>> {
        if !force_refresh {
            if let Some(cached) = self.cache.get(repo_url) {
                return Ok(cached);
            }
        }

        let packages = index::fetch_packages(&self.http, repo_url, listener);
        self.cache.put(repo_url, &packages)?;
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.registry.mark_refreshed(repo_url, packages.len(), &timestamp)?;
        Ok(packages)
    }

    pub fn clear_cache(&self, repo_url: Option<&str>) -> DtResult<()> {
        self.cache.clear(repo_url)
    }

    /// Fetches packages for every enabled repository.
    pub fn all_packages(&self, listener: &dyn Listener) -> DtResult<Vec<(Repository, Package)>> {
        let mut out = Vec::new();
        for repo in self.registry.list() {
            if !repo.enabled {
                continue;
            }
            for pkg in self.fetch_packages(&repo.url, false, listener)? {
                out.push((repo.clone(), pkg));
            }
        }
        Ok(out)
    }

    pub fn download_package(
        &self,
        repo_url: &str,
        package: &Package,
        download_dir: &Path,
        cancel: &CancellationToken,
        progress: Option<&ProgressCallback<'_>>,
    ) -> DtResult<PathBuf> {
        downloader::download_package(&self.http, repo_url, package, download_dir, cancel, progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::NoOpListener;
    use tempfile::tempdir;

    #[test]
    fn bootstraps_default_registry_and_jailbreak_config() {
        let dir = tempdir().unwrap();
        let core = Core::new(CoreConfig { app_dir: dir.path().to_path_buf() }).unwrap();
        assert!(!core.registry().list().is_empty());
        assert_eq!(core.jailbreak().config().mode, crate::jailbreak::JailbreakMode::Rootless);
    }

    #[test]
    fn cache_miss_falls_through_without_network_panic() {
        let dir = tempdir().unwrap();
        let core = Core::new(CoreConfig { app_dir: dir.path().to_path_buf() }).unwrap();
        // No network in tests: an unreachable host resolves to an empty list
        // rather than propagating an error, matching the fetcher's
        // best-effort contract.
        let packages = core.fetch_packages("http://127.0.0.1.invalid/", false, &NoOpListener).unwrap();
        assert!(packages.is_empty());
    }
}
