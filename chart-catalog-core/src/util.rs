use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

/// Make `path` absolute and lexically normal.
///
/// `.` components and trailing separators are dropped and `..` pops the
/// previous component. Symlinks are not resolved and case is preserved, so two
/// spellings of the same directory only collide when they normalize to the
/// same string.
pub fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root / prefix.
                if matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Display name for a directory: its last component, or the whole path for a
/// filesystem root.
pub fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Modification time of `path` in epoch seconds.
pub fn modified_secs(path: &Path) -> io::Result<i64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(system_time_secs(modified))
}

pub fn system_time_secs(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}

/// Current time in epoch seconds.
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
#[path = "tests/util_tests.rs"]
mod tests;
