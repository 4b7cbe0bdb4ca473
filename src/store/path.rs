use crate::error::{Error, Result};

/// Longest accepted path, in bytes.
pub const MAX_PATH_BYTES: usize = 4096;

const WINDOWS_INVALID: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Canonicalizes a virtual path: leading slash ensured, slash runs collapsed,
/// trailing slash stripped. The result is idempotent under re-normalization.
///
/// Symlink targets go through the same function, so stored targets are always
/// absolute.
pub fn normalize_path(path: &str) -> Result<String> {
    if path.is_empty() {
        return Err(Error::PathNull);
    }

    if path.len() > MAX_PATH_BYTES {
        return Err(Error::PathTooLong);
    }

    if path.bytes().any(|b| b == 0) {
        return Err(Error::PathNullByte);
    }

    if path.bytes().any(|b| b < 0x20) {
        return Err(Error::PathControlChars);
    }

    if path.chars().any(|c| WINDOWS_INVALID.contains(&c)) {
        return Err(Error::PathWindowsInvalid);
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return Ok(String::from("/"));
    }

    Ok(format!("/{}", segments.join("/")))
}
