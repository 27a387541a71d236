use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::ImageFile;
use crate::config::normalize_extension;

/// Collect files below `dir`. Only a failure to read `dir` itself is an
/// error; unreadable entries and subdirectories are logged and skipped.
fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            if let Err(e) = walk(&path, found) {
                warn!("Skipping unreadable directory {}: {}", path.display(), e);
            }
        } else if path.is_file() {
            found.push(path);
        }
    }
    Ok(())
}

/// Whether `path` carries one of the already normalized `allowed` extensions.
fn has_allowed_extension(path: &Path, allowed: &HashSet<String>) -> bool {
    path.extension()
        .is_some_and(|ext| allowed.contains(&normalize_extension(&ext.to_string_lossy())))
}

/// Images under `dir` (recursively) whose extension is in `extensions`,
/// compared case-insensitively.
///
/// Paths are ordered lexicographically and only the first image per file
/// stem is kept, since outputs are named after the stem.
pub fn find_images(dir: &Path, extensions: &[String]) -> io::Result<Vec<ImageFile>> {
    let allowed: HashSet<String> = extensions.iter().map(|e| normalize_extension(e)).collect();

    let mut paths = Vec::new();
    walk(dir, &mut paths)?;
    paths.retain(|path| has_allowed_extension(path, &allowed));
    paths.sort();

    let mut seen = HashSet::new();
    Ok(paths
        .into_iter()
        .map(ImageFile::new)
        .filter(|image| seen.insert(image.stem.clone()))
        .collect())
}
