//! Streams a package's `.deb` file to disk, reporting monotonic progress.
use crate::error::*;
use crate::http_client::{Transport, DEFAULT_TIMEOUT};
use crate::model::Package;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const CHUNK_SIZE: usize = 8192;

/// Cooperative cancellation handle shared between the caller and a
/// download in progress. Checked once per chunk.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// `percent` is `-1` when `Content-Length` was absent and a percentage
/// can't be computed, otherwise `0..=100`. `bytes_done` is monotonically
/// non-decreasing across calls; `total_bytes` is `None` when the server
/// didn't send `Content-Length`.
pub type ProgressCallback<'a> = dyn Fn(i64, u64, Option<u64>) + 'a;

fn local_filename(package: &Package) -> String {
    let name = Path::new(&package.filename).file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name.ends_with(".deb") {
        name.to_string()
    } else {
        format!("{}_{}.deb", package.package, package.version)
    }
}

fn join_url(repo_url: &str, filename: &str) -> String {
    format!("{repo_url}{filename}")
}

/// Downloads `package` from `repo_url` into `download_dir`, returning the
/// path written. Progress callback errors/panics are swallowed: a bad
/// callback must never abort a download that was otherwise succeeding.
pub fn download_package(
    client: &dyn Transport,
    repo_url: &str,
    package: &Package,
    download_dir: &Path,
    cancel: &CancellationToken,
    progress: Option<&ProgressCallback<'_>>,
) -> DtResult<PathBuf> {
    if package.filename.is_empty() {
        return Err(DebtoolError::Str("package has no filename to download"));
    }

    let url = join_url(repo_url, &package.filename);
    let mut response = client.get(&url, DEFAULT_TIMEOUT)?;
    if !response.status().is_success() {
        return Err(DebtoolError::Str("download request did not succeed"));
    }

    let total_bytes = response.content_length();
    let dest = download_dir.join(local_filename(package));
    let mut file = File::create(&dest)?;

    let mut buf = [0u8; CHUNK_SIZE];
    let mut downloaded: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(DebtoolError::Cancelled);
        }
        let n = response.read(&mut buf)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])?;
        downloaded += n as u64;
        if let Some(cb) = progress {
            let percent = match total_bytes {
                Some(total) if total > 0 => ((downloaded as f64 / total as f64) * 100.0) as i64,
                _ => -1,
            };
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(percent, downloaded, total_bytes)));
        }
    }

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_filename_prefers_existing_deb_name() {
        let mut pkg = Package::default();
        pkg.filename = "pool/main/f/foo_1.0_iphoneos-arm64.deb".into();
        assert_eq!(local_filename(&pkg), "foo_1.0_iphoneos-arm64.deb");
    }

    #[test]
    fn local_filename_synthesizes_when_not_deb() {
        let mut pkg = Package::default();
        pkg.package = "foo".into();
        pkg.version = "1.0".into();
        pkg.filename = "pool/main/f/foo".into();
        assert_eq!(local_filename(&pkg), "foo_1.0.deb");
    }

    #[test]
    fn cancellation_token_reflects_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
