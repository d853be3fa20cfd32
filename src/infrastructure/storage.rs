use std::fs;
use std::path::{Path, PathBuf};

/// Make sure the directory holding the database file exists and return the
/// database path unchanged.
pub fn ensure_db_parent_dir(db_path: &Path) -> std::io::Result<PathBuf> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    Ok(db_path.to_path_buf())
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
