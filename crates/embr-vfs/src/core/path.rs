//! Path validation.
//!
//! Paths are relative to the filesystem root; a leading `/` is accepted and
//! ignored. `.` components are dropped and `..` may not climb above the
//! root.

use super::error::StorageError;

/// Default maximum path length in bytes.
pub const DEFAULT_PATH_MAX: usize = 64;

/// Validate a path before it is sent to the engine.
pub fn validate_path(path: &str, max_len: usize) -> Result<(), StorageError> {
    if path.contains('\0') {
        return Err(StorageError::InvalidArgument);
    }
    if path.len() > max_len {
        return Err(StorageError::NameTooLong);
    }
    components(path).map(|_| ())
}

/// Split a path into normalized components. The root is an empty list.
pub fn components(path: &str) -> Result<Vec<&str>, StorageError> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                if parts.pop().is_none() {
                    return Err(StorageError::InvalidArgument);
                }
            }
            name => parts.push(name),
        }
    }
    Ok(parts)
}

/// Canonical form of a path: components joined by `/`, root is `""`.
pub fn normalize(path: &str) -> Result<String, StorageError> {
    Ok(components(path)?.join("/"))
}

/// Last component of a path, `""` for the root.
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
}
