use std::path::{Path, PathBuf};

use crate::errors::GraftError;

/// Walk up from `start` looking for a file named `filename`.
/// Returns the path to the directory containing the file, or `None`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(filename);
        if candidate.is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Read a UTF-8 file, naming the path in the error.
pub fn read_to_string(path: &Path) -> Result<String, GraftError> {
    std::fs::read_to_string(path).map_err(|e| GraftError::Generic {
        message: format!("Failed to read {}: {e}", path.display()),
    })
}

/// Write `contents` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, contents: &str) -> Result<(), GraftError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    tracing::debug!("writing {}", path.display());
    std::fs::write(path, contents)?;
    Ok(())
}
