use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, MuxError};

/// A video or audio file picked up from an input directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// File name including extension
    pub name: String,
    /// Full path as enumerated
    pub path: PathBuf,
}

impl MediaFile {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }

    /// File name without its extension
    pub fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// List regular files directly inside `dir` whose extension equals `extension`
/// (case-insensitive). Symlinks count as the file they point to. Sorting by name is optional; otherwise the order is
/// whatever the filesystem yields.
pub fn list_media_files<P: AsRef<Path>>(dir: P, extension: &str, sort: bool) -> Result<Vec<MediaFile>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(MuxError::DirectoryNotFound(dir.display().to_string()));
    }

    let extension = extension.trim_start_matches('.');
    let mut files = Vec::new();

    let mut walker = WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true);
    if sort {
        walker = walker.sort_by_file_name();
    }

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);

        if matches {
            files.push(MediaFile::new(entry.path().to_path_buf()));
        }
    }

    debug!("Found {} *.{} files in {}", files.len(), extension, dir.display());
    Ok(files)
}
