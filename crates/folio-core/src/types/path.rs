//! Uniform storage paths.
//!
//! Every client speaks the same path dialect towards the rest of the
//! system: `/`-separated, absolute relative to the drive root, no trailing
//! separator, and the root itself is `/`. Backend-specific prefixes
//! (tenant roots, bucket prefixes, filesystem roots) are added and removed
//! inside the clients.

use crate::error::AppError;
use crate::result::AppResult;

/// The drive root.
pub const ROOT: &str = "/";

/// Normalize a user- or backend-supplied path into the uniform dialect.
///
/// Collapses repeated separators, accepts `\` as a separator, and rejects
/// `.`/`..` segments so a path can never escape the drive root.
pub fn normalize(path: &str) -> AppResult<String> {
    let mut parts = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" => continue,
            "." | ".." => {
                return Err(AppError::validation(format!(
                    "Path '{path}' contains a relative segment"
                )));
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        Ok(ROOT.to_string())
    } else {
        Ok(format!("/{}", parts.join("/")))
    }
}

/// Append a single name to a parent path.
pub fn join(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let name = name.trim_matches('/');
    if parent.is_empty() {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// The parent of a path, or `None` for the root.
pub fn parent(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) | None => Some(ROOT.to_string()),
        Some(idx) => Some(trimmed[..idx].to_string()),
    }
}

/// The last segment of a path (empty for the root).
pub fn name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// The non-empty segments of a path.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Whether `path` lies strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    let ancestor = ancestor.trim_end_matches('/');
    if ancestor.is_empty() {
        return path.len() > 1 && path.starts_with('/');
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

/// Replace the `old_prefix` of a descendant path with `new_prefix`.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_descendant(path, old_prefix) {
        return None;
    }
    let rest = &path[old_prefix.trim_end_matches('/').len()..];
    Some(format!("{}{}", new_prefix.trim_end_matches('/'), rest))
}
