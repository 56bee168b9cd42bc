//! The `.deb` codec itself: wraps an ar envelope around a control tarball
//! and a data tarball.
use crate::ar::{read_ar, write_ar};
use crate::compress::{compress, decompress, Compression};
use crate::control::{parse_stanza, Stanza};
use crate::error::*;
use crate::listener::Listener;
use crate::tar_codec;
use std::fs;
use std::path::Path;

const CONTROL_CANDIDATES: &[&str] = &["control.tar.gz", "control.tar.xz", "control.tar"];
const DATA_CANDIDATES: &[&str] = &["data.tar.gz", "data.tar.xz", "data.tar.lzma", "data.tar"];

pub struct DebArchive {
    pub control: Stanza,
    /// Raw (decompressed) control and data tarball bytes, for callers that
    /// need to extract or inspect the filesystem payload.
    pub control_tar: Vec<u8>,
    pub data_tar: Vec<u8>,
}

fn find_member<'a>(members: &'a [(String, Vec<u8>)], candidates: &[&'static str]) -> DtResult<(&'static str, &'a [u8])> {
    for name in candidates {
        if let Some((_, data)) = members.iter().find(|(n, _)| n.as_str() == *name) {
            return Ok((name, data.as_slice()));
        }
    }
    Err(DebtoolError::MissingMember(candidates[0]))
}

/// Parses a `.deb` file's bytes into its control stanza plus decompressed
/// tarballs. Does not touch disk.
pub fn info(deb_bytes: &[u8]) -> DtResult<DebArchive> {
    let members = read_ar(deb_bytes)?;

    if members.first().map(|(n, _)| n.as_str()) != Some("debian-binary") {
        return Err(DebtoolError::MissingMember("debian-binary"));
    }
    let version = String::from_utf8_lossy(&members[0].1);
    if version.trim() != "2.0" {
        log::warn!("unexpected debian-binary version {version:?}, continuing anyway");
    }

    let (control_name, control_raw) = find_member(&members, CONTROL_CANDIDATES)?;
    let control_tar = decompress(Compression::from_suffix(control_name), control_raw)?;
    let (data_name, data_raw) = find_member(&members, DATA_CANDIDATES)?;
    let data_tar = decompress(Compression::from_suffix(data_name), data_raw)?;

    let control = extract_control_stanza(&control_tar)?;

    Ok(DebArchive { control, control_tar, data_tar })
}

fn extract_control_stanza(control_tar: &[u8]) -> DtResult<Stanza> {
    let mut archive = tar::Archive::new(control_tar);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_control = matches!(entry.path()?.to_str(), Some("control") | Some("./control"));
        if is_control {
            let mut text = String::new();
            std::io::Read::read_to_string(&mut entry, &mut text)?;
            return Ok(parse_stanza(&text));
        }
    }
    Err(DebtoolError::MissingMember("control"))
}

/// Lists every path contained in the data tarball, without writing
/// anything to disk.
pub fn contents(deb_bytes: &[u8]) -> DtResult<Vec<String>> {
    let archive = info(deb_bytes)?;
    let mut tar_archive = tar::Archive::new(&archive.data_tar[..]);
    let mut paths = Vec::new();
    for entry in tar_archive.entries()? {
        let entry = entry?;
        paths.push(entry.path()?.display().to_string());
    }
    Ok(paths)
}

/// Extracts a `.deb`'s data tarball (and, if `include_control`, its
/// control tarball under a `DEBIAN/` subdirectory) into `output_dir`.
pub fn extract(deb_bytes: &[u8], output_dir: &Path, include_control: bool, listener: &dyn Listener) -> DtResult<()> {
    let archive = info(deb_bytes)?;
    tar_codec::extract(&archive.data_tar, output_dir, true, listener)?;
    if include_control {
        tar_codec::extract(&archive.control_tar, &output_dir.join("DEBIAN"), true, listener)?;
    }
    Ok(())
}

/// Required control fields a built `.deb` must carry; checked by [`verify`].
const REQUIRED_CONTROL_FIELDS: &[&str] = &["Package", "Version", "Architecture"];

/// Recursively copies every file and directory under `src` into `dst`,
/// creating `dst` if needed.
fn copy_tree(src: &Path, dst: &Path) -> DtResult<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let dest_path = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_tree(&entry.path(), &dest_path)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &dest_path)?;
        }
    }
    Ok(())
}

/// Builds a `.deb` from `folder_path`, a source tree laid out the way
/// `dpkg-deb` expects: a top-level `DEBIAN/` directory holding `control`
/// plus any maintainer scripts, and everything else the filesystem tree to
/// install under `/`. Control and data tarballs are split into a scratch
/// directory and built concurrently, then compressed with `compression`
/// and wrapped in an `ar` envelope at `output_path`. When `verify_after` is
/// set, the written archive is immediately re-parsed and checked via
/// [`verify`].
pub fn build(folder_path: &Path, output_path: &Path, compression: Compression, verify_after: bool, listener: &dyn Listener) -> DtResult<()> {
    let scratch = tempfile::tempdir()?;
    let control_dir = scratch.path().join("control");
    let data_dir = scratch.path().join("data");
    fs::create_dir_all(&control_dir)?;
    fs::create_dir_all(&data_dir)?;

    for entry in fs::read_dir(folder_path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if entry.file_name() == "DEBIAN" && file_type.is_dir() {
            copy_tree(&entry.path(), &control_dir)?;
        } else if file_type.is_dir() {
            copy_tree(&entry.path(), &data_dir.join(entry.file_name()))?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), data_dir.join(entry.file_name()))?;
        }
    }

    let (control_result, data_result) = rayon::join(
        || -> DtResult<Vec<u8>> {
            let tar = tar_codec::build(&control_dir, true)?;
            compress(compression, &tar)
        },
        || -> DtResult<Vec<u8>> {
            let tar = tar_codec::build(&data_dir, true)?;
            compress(compression, &tar)
        },
    );
    let control_compressed = control_result?;
    let data_compressed = data_result?;

    let members = vec![
        ("debian-binary".to_string(), b"2.0\n".to_vec()),
        (format!("control.tar{}", compression.extension()), control_compressed),
        (format!("data.tar{}", compression.extension()), data_compressed),
    ];
    let bytes = write_ar(&members)?;

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, &bytes)?;
    listener.generated_archive(output_path);

    if verify_after {
        verify(output_path)?;
    }
    Ok(())
}

/// Re-extracts a `.deb`'s control stanza and checks the fields every
/// installable package must carry (`Package`, `Version`, `Architecture`),
/// plus a basic sanity check that its data tarball isn't empty. On
/// failure, the `.deb` at `deb_path` is left in place for inspection
/// rather than deleted.
pub fn verify(deb_path: &Path) -> DtResult<()> {
    let bytes = fs::read(deb_path)?;
    let archive = info(&bytes)?;
    for &field in REQUIRED_CONTROL_FIELDS {
        if archive.control.get(field).is_none() {
            return Err(DebtoolError::MissingRequiredField(field));
        }
    }
    if archive.data_tar.is_empty() {
        return Err(DebtoolError::VerifyFailed("data tarball is empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::NoOpListener;
    use tempfile::tempdir;

    fn make_tree(root: &Path) {
        fs::create_dir_all(root.join("DEBIAN")).unwrap();
        fs::write(root.join("DEBIAN/control"), "Package: test-pkg\nVersion: 1.0\nArchitecture: iphoneos-arm64\n").unwrap();
        fs::create_dir_all(root.join("usr/bin")).unwrap();
        fs::write(root.join("usr/bin/tool"), b"#!/bin/sh\necho hi\n").unwrap();
    }

    #[test]
    fn build_then_info_round_trips_control() {
        let root = tempdir().unwrap();
        make_tree(root.path());
        let out = root.path().join("out.deb");
        build(root.path(), &out, Compression::Gzip, true, &NoOpListener).unwrap();

        let bytes = fs::read(&out).unwrap();
        let archive = info(&bytes).unwrap();
        assert_eq!(archive.control.get("Package"), Some("test-pkg"));
    }

    #[test]
    fn verify_passes_on_well_formed_package() {
        let root = tempdir().unwrap();
        make_tree(root.path());
        let out = root.path().join("out.deb");
        build(root.path(), &out, Compression::Gzip, false, &NoOpListener).unwrap();
        verify(&out).unwrap();
    }

    #[test]
    fn verify_fails_when_required_field_missing() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("DEBIAN")).unwrap();
        fs::write(root.path().join("DEBIAN/control"), "Package: test-pkg\n").unwrap();
        fs::create_dir_all(root.path().join("usr/bin")).unwrap();
        let out = root.path().join("out.deb");
        build(root.path(), &out, Compression::Gzip, false, &NoOpListener).unwrap();
        assert!(verify(&out).is_err());
    }

    #[test]
    fn contents_lists_data_paths() {
        let root = tempdir().unwrap();
        make_tree(root.path());
        let out = root.path().join("out.deb");
        build(root.path(), &out, Compression::Gzip, true, &NoOpListener).unwrap();
        let bytes = fs::read(&out).unwrap();
        let paths = contents(&bytes).unwrap();
        assert!(paths.iter().any(|p| p.contains("usr/bin/tool")));
    }
}
