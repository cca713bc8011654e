//! Directory walker that supplies tree entries from a live filesystem.
//!
//! The walker reports one directory level at a time, in whatever order the
//! filesystem returns. Sorting is left to [`loam_store::Tree::new`].

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use loam_store::EntryMode;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{SdkError, SdkResult};

/// Directory name never included in a snapshot.
pub const GIT_DIR: &str = ".git";

/// Where an entry's content comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntrySource {
    /// Regular file; content is read on demand.
    File(PathBuf),
    /// Symbolic link; the blob content is the link target.
    Symlink { path: PathBuf, target: PathBuf },
    /// Subdirectory, snapshotted as a subtree.
    Directory(PathBuf),
}

/// One directory member, as seen by the walker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkEntry {
    /// File name bytes, exactly as the filesystem reports them.
    pub name: Vec<u8>,
    pub mode: EntryMode,
    pub source: EntrySource,
}

impl WorkEntry {
    pub fn is_directory(&self) -> bool {
        matches!(self.source, EntrySource::Directory(_))
    }

    pub fn path(&self) -> &Path {
        match &self.source {
            EntrySource::File(path) | EntrySource::Directory(path) => path.as_path(),
            EntrySource::Symlink { path, .. } => path.as_path(),
        }
    }

    /// Blob content for a file or symlink. Directories have none.
    pub fn read_content(&self) -> SdkResult<Option<Vec<u8>>> {
        match &self.source {
            EntrySource::File(path) => fs::read(path)
                .map(Some)
                .map_err(|e| SdkError::io(path, e)),
            EntrySource::Symlink { target, .. } => Ok(Some(link_bytes(target))),
            EntrySource::Directory(_) => Ok(None),
        }
    }
}

/// List the members of `dir`, skipping `.git` and anything that is not a
/// file, symlink or directory.
pub fn read_level(dir: &Path) -> SdkResult<Vec<WorkEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            SdkError::io(path, e.into())
        })?;
        let path = entry.path().to_path_buf();
        if entry.file_name() == GIT_DIR {
            continue;
        }
        let name = name_bytes(entry.file_name(), &path)?;

        // Symlinks are not followed, so this is the link's own metadata.
        let metadata = entry.metadata().map_err(|e| SdkError::io(&path, e.into()))?;
        let Some(mode) = entry_mode(&metadata) else {
            warn!(path = %path.display(), "skipping special file");
            continue;
        };
        let source = match mode {
            EntryMode::Directory => EntrySource::Directory(path),
            EntryMode::Symlink => {
                let target = fs::read_link(&path).map_err(|e| SdkError::io(&path, e))?;
                EntrySource::Symlink { path, target }
            }
            _ => EntrySource::File(path),
        };
        entries.push(WorkEntry { name, mode, source });
    }
    Ok(entries)
}

#[cfg(unix)]
fn entry_mode(metadata: &fs::Metadata) -> Option<EntryMode> {
    use std::os::unix::fs::MetadataExt;
    EntryMode::from_mode_bits(metadata.mode())
}

#[cfg(not(unix))]
fn entry_mode(metadata: &fs::Metadata) -> Option<EntryMode> {
    let file_type = metadata.file_type();
    if file_type.is_dir() {
        Some(EntryMode::Directory)
    } else if file_type.is_symlink() {
        Some(EntryMode::Symlink)
    } else if file_type.is_file() {
        Some(EntryMode::Regular)
    } else {
        None
    }
}

#[cfg(unix)]
fn name_bytes(name: &OsStr, _path: &Path) -> SdkResult<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;
    Ok(name.as_bytes().to_vec())
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr, path: &Path) -> SdkResult<Vec<u8>> {
    name.to_str()
        .map(|s| s.as_bytes().to_vec())
        .ok_or_else(|| SdkError::NonUtf8Name(path.to_path_buf()))
}

#[cfg(unix)]
fn link_bytes(target: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    target.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn link_bytes(target: &Path) -> Vec<u8> {
    target.to_string_lossy().replace('\\', "/").into_bytes()
}
