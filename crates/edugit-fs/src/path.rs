//! Virtual path normalisation and helpers.
//!
//! All engine paths are absolute strings: leading `/`, `/`-separated
//! segments, no trailing `/` except the root `/` itself. [`normalize`]
//! resolves `.` and `..` so store implementations never see them.

use crate::{FsError, FsErrorKind, FsResult};

/// Normalise `path` against an optional current directory.
///
/// Relative paths are resolved against `cwd` (which must itself be
/// normalised). `.` segments are dropped, `..` pops a segment.
///
/// # Errors
/// [`FsErrorKind::InvalidPath`] if `..` would escape the root.
pub fn resolve(cwd: &str, path: &str) -> FsResult<String> {
    let joined = if path.starts_with('/') {
        path.to_owned()
    } else {
        join(cwd, path)
    };
    normalize(&joined)
}

/// Normalise an absolute path, resolving `.` and `..`.
///
/// # Errors
/// [`FsErrorKind::InvalidPath`] if the path is not absolute or `..`
/// escapes the root.
pub fn normalize(path: &str) -> FsResult<String> {
    if !path.starts_with('/') {
        return Err(FsError::new(FsErrorKind::InvalidPath, path));
    }
    let mut stack: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if stack.pop().is_none() {
                    return Err(FsError::new(FsErrorKind::InvalidPath, path));
                }
            }
            s => stack.push(s),
        }
    }
    if stack.is_empty() {
        Ok("/".to_owned())
    } else {
        Ok(format!("/{}", stack.join("/")))
    }
}

/// Join a child segment (or relative path) onto a normalised base.
#[must_use]
pub fn join(base: &str, child: &str) -> String {
    if base == "/" {
        format!("/{child}")
    } else {
        format!("{base}/{child}")
    }
}

/// The parent of a normalised path, or `None` for the root.
#[must_use]
pub fn parent(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_owned()),
        Some(i) => Some(path[..i].to_owned()),
        None => None,
    }
}

/// The final segment of a normalised path (`""` for the root).
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Iterate the segments of a normalised path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// The path of `path` relative to the ancestor `base`, or `None` if
/// `path` is not at or below `base`.
#[must_use]
pub fn relative_to(base: &str, path: &str) -> Option<String> {
    if base == "/" {
        return Some(path.trim_start_matches('/').to_owned());
    }
    if path == base {
        return Some(String::new());
    }
    path.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_owned)
}
