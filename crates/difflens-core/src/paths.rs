//! Resolution of user-supplied paths.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PathError;

/// Make `path` absolute.
///
/// A leading `~` expands to the home directory and any other relative path
/// is joined onto the working directory. `.` components and trailing
/// separators are dropped; `..` is left alone and no symlinks are resolved.
pub fn resolve_absolute(path: &Path) -> Result<PathBuf, PathError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else if let Some(rest) = strip_tilde(path) {
        debug!(target: "difflens::paths", "Input path {} contained a tilde, performing user expansion", path.display());
        let home = dirs::home_dir().ok_or_else(|| PathError::HomeDirUnavailable {
            path: path.to_path_buf(),
        })?;
        home.join(rest)
    } else {
        debug!(target: "difflens::paths", "Input path {} was relative, converting it to absolute path", path.display());
        let cwd = std::env::current_dir().map_err(|source| PathError::CurrentDir {
            path: path.to_path_buf(),
            source,
        })?;
        cwd.join(path)
    };
    let resolved: PathBuf = joined.components().collect();
    debug!(target: "difflens::paths", "Continuing with absolute path {}", resolved.display());
    Ok(resolved)
}

/// Resolve `path` and require it to be an existing directory.
pub fn resolve_directory(path: &Path) -> Result<PathBuf, PathError> {
    let resolved = resolve_absolute(path)?;
    if !resolved.exists() {
        return Err(PathError::NotFound { path: resolved });
    }
    if !resolved.is_dir() {
        return Err(PathError::NotADirectory { path: resolved });
    }
    Ok(resolved)
}

/// Resolve `path` and reject it if it names an existing directory.
///
/// The file itself need not exist yet, so this serves output paths too.
pub fn resolve_file(path: &Path) -> Result<PathBuf, PathError> {
    let resolved = resolve_absolute(path)?;
    if resolved.is_dir() {
        return Err(PathError::NotAFile { path: resolved });
    }
    Ok(resolved)
}

fn strip_tilde(path: &Path) -> Option<&Path> {
    let s = path.to_str()?;
    if s == "~" {
        Some(Path::new(""))
    } else {
        s.strip_prefix("~/").map(Path::new)
    }
}
