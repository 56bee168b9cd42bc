//! Fetches and parses a repository's `Packages` index across its known
//! architecture subpaths, in the strict order real Cydia/Sileo repos are
//! laid out in.
use crate::compress::{decompress, Compression};
use crate::control::parse_stanzas;
use crate::error::*;
use crate::http_client::Transport;
use crate::listener::Listener;
use crate::model::Package;
use std::collections::HashMap;
use std::time::Duration;

const INDEX_TIMEOUT: Duration = Duration::from_secs(15);

const ARCH_SUBPATHS: &[(&str, Option<&str>)] = &[
    ("dists/stable/main/binary-iphoneos-arm64/", Some("iphoneos-arm64")),
    ("dists/stable/main/binary-iphoneos-arm64e/", Some("iphoneos-arm64e")),
    ("dists/stable/main/binary-iphoneos-arm/", Some("iphoneos-arm")),
    ("dists/./main/binary-iphoneos-arm64/", Some("iphoneos-arm64")),
    ("", None),
];

const FILENAME_VARIANTS: &[&str] = &["Packages.xz", "Packages.bz2", "Packages.gz", "Packages"];

/// Extra absolute candidates tried only when the regular subpath matrix
/// finds nothing, matching known-quirky repository layouts.
const LEGACY_FALLBACK_PATHS: &[&str] = &["./%C4%A1/Packages", "./%C4%A1/Packages.bz2", "stable/Packages", "stable/Packages.bz2", "./Packages", "./Packages.bz2"];

fn join_url(base: &str, rel: &str) -> String {
    if rel.is_empty() {
        return base.to_string();
    }
    format!("{}{}", base, rel)
}

fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

fn try_fetch_one(client: &dyn Transport, url: &str) -> Option<Vec<u8>> {
    let response = client.get(url, INDEX_TIMEOUT).ok()?;
    if !response.status().is_success() {
        return None;
    }
    let content_type = response.headers().get(reqwest::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    if is_html(&content_type) {
        return None;
    }
    response.bytes().ok().map(|b| b.to_vec())
}

fn parse_index_bytes(raw: &[u8], filename: &str) -> DtResult<Vec<Package>> {
    let format = Compression::from_suffix(filename);
    let data = decompress(format, raw)?;
    let text = String::from_utf8_lossy(&data);
    Ok(parse_stanzas(&text, true).iter().map(Package::from_stanza).collect())
}

/// Tries every `(arch subpath, filename)` candidate in order, stopping at
/// the first one found for each subpath, stamping the subpath's
/// architecture label onto records that don't already carry one.
fn fetch_multiarch(client: &dyn Transport, repo_url: &str, listener: &dyn Listener) -> Vec<Package> {
    let mut all_packages = Vec::new();

    for (arch_path, arch_label) in ARCH_SUBPATHS {
        for filename in FILENAME_VARIANTS {
            let url = join_url(repo_url, &format!("{arch_path}{filename}"));
            let Some(raw) = try_fetch_one(client, &url) else { continue };
            match parse_index_bytes(&raw, filename) {
                Ok(mut packages) => {
                    if packages.is_empty() {
                        continue;
                    }
                    if let Some(label) = arch_label {
                        for pkg in &mut packages {
                            if pkg.architecture.is_empty() {
                                pkg.architecture = (*label).to_string();
                            }
                        }
                    }
                    listener.progress("index", format!("found {} packages at {url}", packages.len()));
                    all_packages.extend(packages);
                    break;
                },
                Err(e) => {
                    listener.warning(format!("failed to parse {url}: {e}"));
                },
            }
        }
    }

    dedup_packages(all_packages)
}

fn fetch_legacy_fallback(client: &dyn Transport, repo_url: &str) -> Vec<Package> {
    let mut all_packages = Vec::new();
    for candidate in LEGACY_FALLBACK_PATHS {
        let url = join_url(repo_url, candidate);
        let Some(raw) = try_fetch_one(client, &url) else { continue };
        if let Ok(packages) = parse_index_bytes(&raw, candidate) {
            all_packages.extend(packages);
        }
    }
    dedup_packages(all_packages)
}

fn dedup_packages(packages: Vec<Package>) -> Vec<Package> {
    let mut by_key: HashMap<String, Package> = HashMap::new();
    for pkg in packages {
        by_key.insert(pkg.dedup_key(), pkg);
    }
    by_key.into_values().collect()
}

/// Fetches and parses every package record a repository publishes,
/// deduplicated by `(package, version, architecture)`. Never consults or
/// updates a cache; callers that want caching go through [`crate::cache`].
pub fn fetch_packages(client: &dyn Transport, repo_url: &str, listener: &dyn Listener) -> Vec<Package> {
    let packages = fetch_multiarch(client, repo_url, listener);
    if !packages.is_empty() {
        return packages;
    }
    listener.warning(format!("multi-arch index fetch found nothing for {repo_url}, trying legacy fallback paths"));
    fetch_legacy_fallback(client, repo_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_empty_subpath() {
        assert_eq!(join_url("https://repo/", ""), "https://repo/");
        assert_eq!(join_url("https://repo/", "Packages"), "https://repo/Packages");
    }

    #[test]
    fn dedup_keeps_distinct_architectures() {
        let mut a = Package::default();
        a.package = "foo".into();
        a.version = "1".into();
        a.architecture = "iphoneos-arm".into();
        let mut b = a.clone();
        b.architecture = "iphoneos-arm64".into();
        let result = dedup_packages(vec![a, b]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn is_html_detection() {
        assert!(is_html("text/html; charset=utf-8"));
        assert!(!is_html("application/octet-stream"));
    }
}
