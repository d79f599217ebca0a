use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `name` inside `base`, refusing anything that would leave it.
///
/// Absolute paths and `..` components are rejected outright; the result is
/// not required to exist.
pub fn safe_join(base: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    if name.is_empty() || relative.is_absolute() {
        return None;
    }
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return None,
        }
    }
    Some(base.join(relative))
}

/// Read a file from `base` by relative name.
///
/// Returns `Ok(None)` when the name is unsafe or no such file exists.
pub fn read_file_in(base: &Path, name: &str) -> io::Result<Option<String>> {
    let path = match safe_join(base, name) {
        Some(path) => path,
        None => return Ok(None),
    };
    if !path.is_file() {
        return Ok(None);
    }
    fs::read_to_string(path).map(Some)
}
