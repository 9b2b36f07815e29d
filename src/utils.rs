//! Utility functions for path handling.

use std::path::PathBuf;

use anyhow::anyhow;

/// Joins `subdir_path` to `dir_path`.
///
/// # Errors
///
/// Fails when the joined path is not valid UTF-8, since the Matrix store and
/// the qazo store take string paths.
pub fn get_path(dir_path: &str, subdir_path: &str) -> Result<String, anyhow::Error> {
    let path_buf: PathBuf = [dir_path, subdir_path].iter().collect();
    path_buf
        .to_str()
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("path {} is not valid UTF-8", path_buf.display()))
}
