//! Copying assets with content-hash stamping.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Number of hex characters of the SHA-256 digest kept in stamped names.
pub const STAMP_LEN: usize = 10;

/// Hex-encoded SHA-256 of a file.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(|e| Error::path_io(path, e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| Error::path_io(path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Insert a hash before the extension: `css/site.css` → `css/site-0123456789.css`.
pub fn stamp_filename(relative: &str, hash: &str) -> String {
    let hash = &hash[..STAMP_LEN.min(hash.len())];
    let (dir, name) = match relative.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, relative),
    };

    let stamped = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, hash, ext),
        _ => format!("{}-{}", name, hash),
    };

    match dir {
        Some(dir) => format!("{}/{}", dir, stamped),
        None => stamped,
    }
}

/// Copy every file under `src` to `dest`, optionally stamped.
///
/// Files whose relative path is in `ignore` are skipped. Returns the
/// relative source path to relative destination path map.
pub fn copy_assets(
    src: &Path,
    dest: &Path,
    stamp: bool,
    ignore: &[String],
) -> Result<IndexMap<String, String>> {
    let mut files = IndexMap::new();
    if !src.exists() {
        return Ok(files);
    }

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(src)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if ignore.iter().any(|ignored| ignored == &relative) {
            continue;
        }

        let target = if stamp {
            stamp_filename(&relative, &hash_file(entry.path())?)
        } else {
            relative.clone()
        };
        files.insert(relative, target);
    }

    copy_files(&files, src, dest)?;
    Ok(files)
}

/// Copy files or directories from `source_folder` to `output_folder`.
///
/// A directory copied onto an existing target replaces it, unless the
/// target ends with `/`, in which case it is copied into it.
pub fn copy_files(
    files: &IndexMap<String, String>,
    source_folder: &Path,
    output_folder: &Path,
) -> Result<()> {
    for (src, dest) in files {
        let src = source_folder.join(src);
        if !src.exists() {
            tracing::warn!("cannot copy file: {}", src.display());
            continue;
        }

        let mut target = output_folder.join(dest);
        let into_dir = dest.ends_with('/');
        if into_dir && (src.is_file() || target.exists()) {
            if let Some(name) = src.file_name() {
                target = target.join(name);
            }
        } else if src.is_dir() && target.exists() {
            tracing::debug!("removing target of file copy: {}", target.display());
            if target.is_dir() {
                fs::remove_dir_all(&target).map_err(|e| Error::path_io(&target, e))?;
            } else {
                fs::remove_file(&target).map_err(|e| Error::path_io(&target, e))?;
            }
        }

        tracing::debug!("copying files from '{}' to '{}'", src.display(), target.display());
        if src.is_dir() {
            copy_dir(&src, &target)?;
        } else {
            copy_file(&src, &target)?;
        }
    }
    Ok(())
}

fn copy_file(src: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::path_io(parent, e))?;
    }
    fs::copy(src, target).map_err(|e| Error::path_io(src, e))?;
    Ok(())
}

fn copy_dir(src: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(|e| Error::path_io(&destination, e))?;
        } else {
            copy_file(entry.path(), &destination)?;
        }
    }
    Ok(())
}
