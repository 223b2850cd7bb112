// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Moving answered screenshots out of the watched directory

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{Result, SnapsolveError};

/// First free name for `filename` in `dir`: `a.png`, then `a_1.png`, `a_2.png`, ...
pub fn unique_destination(dir: &Path, filename: &Path) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let stem = filename
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = filename
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Move `source` into `dir`, renaming on collision. Returns the new path.
pub fn archive_file(source: &Path, dir: &Path) -> Result<PathBuf> {
    let filename = source.file_name().ok_or_else(|| {
        SnapsolveError::FileSystem(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("no file name in {:?}", source),
        ))
    })?;

    std::fs::create_dir_all(dir)?;
    let destination = unique_destination(dir, Path::new(filename));

    if let Err(e) = std::fs::rename(source, &destination) {
        // rename cannot cross filesystems
        debug!("rename to {:?} failed ({}), copying instead", destination, e);
        copy_then_remove(source, &destination, |p: &Path| std::fs::remove_file(p))?;
    }

    Ok(destination)
}

/// Copy fallback for a failed rename. On any failure the source is left in
/// place and no copy remains at `destination`.
fn copy_then_remove<F>(source: &Path, destination: &Path, remove: F) -> std::io::Result<()>
where
    F: FnOnce(&Path) -> std::io::Result<()>,
{
    if let Err(e) = std::fs::copy(source, destination) {
        let _ = std::fs::remove_file(destination);
        return Err(e);
    }

    if let Err(e) = remove(source) {
        if let Err(cleanup) = std::fs::remove_file(destination) {
            warn!("Could not remove archived copy {:?}: {}", destination, cleanup);
        }
        return Err(e);
    }

    Ok(())
}
