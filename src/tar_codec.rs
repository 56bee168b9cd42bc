//! tar encode/decode for control and data members. Permissions are never
//! read off the host filesystem; they are computed from a fixed Debian
//! packaging policy so the same input tree produces the same archive on
//! every platform.
use crate::error::*;
use crate::listener::Listener;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

const MAINTAINER_SCRIPTS: &[&str] = &["preinst", "postinst", "prerm", "postrm", "config"];

/// Computes the mode bits for one archive entry under the fixed packaging
/// policy: dirs and maintainer scripts and `bin`/`sbin` contents and
/// shebang files are `0755`, everything else is `0644`.
pub fn compute_mode(archive_path: &Path, is_dir: bool, first_bytes: &[u8]) -> u32 {
    if is_dir {
        return 0o755;
    }
    let parts: Vec<&str> = archive_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    // Maintainer scripts live at the top of the control tarball (dpkg
    // never nests them), so a bare top-level match is enough regardless of
    // whether the source tree keeps them under a `DEBIAN/` directory.
    if parts.len() == 1 && MAINTAINER_SCRIPTS.contains(&parts[0]) {
        return 0o755;
    }
    if parts.iter().any(|p| *p == "bin" || *p == "sbin") {
        return 0o755;
    }
    if first_bytes.starts_with(b"#!") {
        return 0o755;
    }
    0o644
}

/// Builds a tar archive from everything under `source_dir`, emitting
/// paths relative to it. Walks directories in sorted order for
/// reproducibility.
pub fn build(source_dir: &Path, force_root: bool) -> DtResult<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut entries = Vec::new();
    collect_entries(source_dir, Path::new(""), &mut entries)?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (rel_path, abs_path, is_dir) in entries {
        if is_dir {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
            header.set_uid(0);
            header.set_gid(0);
            header.set_mtime(0);
            header.set_size(0);
            if force_root {
                header.set_username("root").ok();
                header.set_groupname("root").ok();
            }
            let mut name = rel_path.to_string_lossy().into_owned();
            if !name.ends_with('/') {
                name.push('/');
            }
            header.set_path(&name)?;
            header.set_cksum();
            builder.append(&header, std::io::empty())?;
        } else {
            let mut data = Vec::new();
            fs::File::open(&abs_path)?.read_to_end(&mut data)?;
            let first_bytes = &data[..data.len().min(2)];
            let mode = compute_mode(&rel_path, false, first_bytes);

            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(mode);
            header.set_uid(0);
            header.set_gid(0);
            header.set_mtime(0);
            header.set_size(data.len() as u64);
            if force_root {
                header.set_username("root").ok();
                header.set_groupname("root").ok();
            }
            header.set_path(&rel_path)?;
            header.set_cksum();
            builder.append(&header, &data[..])?;
        }
    }

    Ok(builder.into_inner()?)
}

fn collect_entries(dir: &Path, rel: &Path, out: &mut Vec<(PathBuf, PathBuf, bool)>) -> DtResult<()> {
    let mut children: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    children.sort_by_key(|e| e.file_name());
    for entry in children {
        let abs = entry.path();
        let rel_path = rel.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            out.push((rel_path.clone(), abs.clone(), true));
            collect_entries(&abs, &rel_path, out)?;
        } else if file_type.is_file() {
            out.push((rel_path, abs, false));
        }
    }
    Ok(())
}

/// Lexically collapses `.`/`..` components without touching the filesystem,
/// for checking a symlink target that may not exist yet.
fn lexically_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            },
            Component::CurDir => {},
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Extracts a tar archive into `output_dir`. When `safe` is true, any entry
/// whose resolved path would escape `output_dir` is skipped and reported
/// through `listener` instead of failing the whole extraction — this
/// includes symlink/hardlink entries whose link target resolves outside
/// `output_dir`, not just entries whose own name does.
pub fn extract(tar_bytes: &[u8], output_dir: &Path, safe: bool, listener: &dyn Listener) -> DtResult<()> {
    fs::create_dir_all(output_dir)?;
    let canonical_root = output_dir.canonicalize()?;
    let mut archive = tar::Archive::new(tar_bytes);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        let dest = output_dir.join(&entry_path);

        if safe {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let resolved = match dest.parent().map(Path::canonicalize).transpose()? {
                Some(parent) => parent.join(dest.file_name().unwrap_or_default()),
                None => dest.clone(),
            };
            if !resolved.starts_with(&canonical_root) {
                listener.unsafe_path_skipped(&entry_path.display().to_string());
                continue;
            }

            let entry_type = entry.header().entry_type();
            if entry_type.is_symlink() || entry_type.is_hard_link() {
                if let Some(link_name) = entry.link_name()? {
                    let link_target = if link_name.is_absolute() {
                        link_name.into_owned()
                    } else {
                        resolved.parent().unwrap_or(&canonical_root).join(&link_name)
                    };
                    if !lexically_normalize(&link_target).starts_with(&canonical_root) {
                        listener.unsafe_path_skipped(&entry_path.display().to_string());
                        continue;
                    }
                }
            }
        } else if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        entry.unpack(&dest)?;
    }
    Ok(())
}
