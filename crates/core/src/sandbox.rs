//! Sandboxed path resolution inside a job directory.
//!
//! Two checks guard every lookup: a lexical one (absolute paths or `..`
//! climbing above the root), which runs before anything touches the
//! filesystem, and a canonical one, which catches symlinks pointing out of
//! the sandbox.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::error::CoreError;

/// `true` if `relative` is absolute or climbs above its starting directory.
pub fn escapes_lexically(relative: &str) -> bool {
    let mut depth: usize = 0;
    for component in Path::new(relative).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return true,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            Component::Normal(_) => depth += 1,
        }
    }
    false
}

/// Resolve `relative` against `root` and require the result to be a regular
/// file strictly inside `root`.
///
/// - escape (lexical or via symlink) -> [`CoreError::PathTraversal`]
/// - missing target or not a file -> [`CoreError::NotFound`]
pub fn resolve_in_sandbox(root: &Path, relative: &str) -> Result<PathBuf, CoreError> {
    if escapes_lexically(relative) {
        return Err(CoreError::PathTraversal(relative.to_string()));
    }

    let canonical_root = root.canonicalize().map_err(|_| CoreError::NotFound {
        entity: "Directory",
        id: root.display().to_string(),
    })?;

    let not_found = || CoreError::NotFound {
        entity: "File",
        id: relative.to_string(),
    };

    let target = canonical_root
        .join(relative)
        .canonicalize()
        .map_err(|_| not_found())?;

    if target == canonical_root || !target.starts_with(&canonical_root) {
        return Err(CoreError::PathTraversal(relative.to_string()));
    }

    if !target.is_file() {
        return Err(not_found());
    }

    Ok(target)
}

/// Newest regular file under `dir` (recursively) whose extension matches
/// `extension`, case-insensitively.
///
/// Symlinks are not followed. Ties on modification time are broken by path
/// so the answer is stable.
pub fn newest_artifact(dir: &Path, extension: &str) -> Result<PathBuf, CoreError> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if !file_type.is_file() || !has_extension(&path, extension) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            let is_newer = match &newest {
                None => true,
                Some((best_time, best_path)) => {
                    (modified, &path) > (*best_time, best_path)
                }
            };
            if is_newer {
                newest = Some((modified, path));
            }
        }
    }

    newest.map(|(_, path)| path).ok_or_else(|| CoreError::NotFound {
        entity: "Artifact",
        id: format!("*.{extension} in {}", dir.display()),
    })
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
