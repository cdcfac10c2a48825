//! Path helpers shared by the scanner and the copy planner.
//!
//! Extensions are compared after NFC normalization and lowercasing, so an
//! exclusion list written on Linux (NFC) still matches names created on
//! macOS (NFD):
//!
//! - NFC: `.café` - 'é' is U+00E9 (single code point)
//! - NFD: `.café` - 'e' U+0065 + combining acute accent U+0301
//!
//! # Example
//!
//! ```
//! use fdmerge::scanner::path_utils::{extension_of, normalize_extension};
//! use std::path::Path;
//!
//! assert_eq!(extension_of(Path::new("/a/photo.JPG")), ".JPG");
//! assert_eq!(normalize_extension("JPG"), ".jpg");
//! ```

use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Normalize a string to NFC (Composed) form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Normalize an extension for case-insensitive comparison.
///
/// The result is NFC, lowercase, and always carries a leading dot unless
/// the input is empty (the "no extension" bucket).
///
/// # Example
///
/// ```
/// use fdmerge::scanner::path_utils::normalize_extension;
///
/// assert_eq!(normalize_extension(".TMP"), ".tmp");
/// assert_eq!(normalize_extension("tmp"), ".tmp");
/// assert_eq!(normalize_extension(""), "");
/// ```
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lowered = normalize_path_str(trimmed).to_lowercase();
    if lowered.starts_with('.') {
        lowered
    } else {
        format!(".{lowered}")
    }
}

/// Return the extension of a path including its leading dot.
///
/// Files without an extension (including dotfiles such as `.bashrc`)
/// return an empty string. Case is preserved.
#[must_use]
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Lexically normalize a path: drop `.` components and fold `..` into
/// their parent without touching the filesystem.
///
/// # Example
///
/// ```
/// use fdmerge::scanner::path_utils::lexical_normalize;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(
///     lexical_normalize(Path::new("/data/./a/../b/file.txt")),
///     PathBuf::from("/data/b/file.txt")
/// );
/// ```
#[must_use]
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make `path` absolute against the current directory, then normalize it
/// lexically. Symlinks are left unresolved.
///
/// # Errors
///
/// Fails if the current directory cannot be determined.
pub fn absolute_normalized(path: &Path) -> std::io::Result<PathBuf> {
    Ok(lexical_normalize(&std::path::absolute(path)?))
}

/// Compute `path` relative to `root`, after normalizing both lexically.
///
/// Returns `None` when `path` does not live under `root`.
#[must_use]
pub fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
    let path = lexical_normalize(path);
    let root = lexical_normalize(root);
    path.strip_prefix(&root).ok().map(Path::to_path_buf)
}
