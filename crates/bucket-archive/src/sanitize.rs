use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Normalize an archive entry path into a safe relative path.
///
/// Absolute paths and any `..` sequence that would climb past the extraction
/// root are rejected with [`Error::PathTraversal`]; `.` components are
/// dropped. An entry that normalizes to nothing has no usable path.
pub fn sanitize_entry_path(entry: impl AsRef<Path>) -> Result<PathBuf> {
    let entry = entry.as_ref();
    let mut result = PathBuf::new();
    let mut depth = 0usize;

    for component in entry.components() {
        match component {
            Component::Normal(part) => {
                result.push(part);
                depth += 1;
            }
            Component::ParentDir => {
                if depth == 0 {
                    return Err(Error::PathTraversal {
                        entry: entry.to_path_buf(),
                    });
                }
                result.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::PathTraversal {
                    entry: entry.to_path_buf(),
                });
            }
            Component::CurDir => {}
        }
    }

    if result.as_os_str().is_empty() {
        return Err(Error::InvalidPath {
            entry: entry.to_path_buf(),
        });
    }
    Ok(result)
}
