use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::WorldError;

/// Files the engine holds open while a world is loaded. Copying them would
/// either fail or produce a world the engine refuses to open.
pub fn is_transient(file_name: &str) -> bool {
    file_name == "session.lock" || file_name.ends_with(".lock") || file_name.ends_with(".tmp")
}

/// Recursively copies `from` into `to`, skipping transient files.
///
/// `to` is created if needed. Existing files under `to` are overwritten.
/// Returns the number of files copied.
pub fn copy_world_dir(from: &Path, to: &Path) -> Result<usize, WorldError> {
    if !from.is_dir() {
        return Err(WorldError::io(from, std::io::ErrorKind::NotFound.into()));
    }
    fs::create_dir_all(to).map_err(|e| WorldError::io(to, e))?;

    let mut copied = 0;
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry.map_err(|source| WorldError::Walk {
            path: from.to_path_buf(),
            source,
        })?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|_| WorldError::io(entry.path(), std::io::ErrorKind::InvalidInput.into()))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| WorldError::io(&target, e))?;
            continue;
        }
        if is_transient(&entry.file_name().to_string_lossy()) {
            continue;
        }
        fs::copy(entry.path(), &target).map_err(|e| WorldError::io(&target, e))?;
        copied += 1;
    }
    Ok(copied)
}
