//! SUMMARY:
//! Define the error type shared by jail root setup, path resolution, confinement checks
//! and the validated filesystem operations.
//!
//! OVERVIEW:
//! Every fallible operation in this crate returns `JailError`. Rejections are split by
//! cause so callers can report them precisely: a candidate that is too long, a candidate
//! that cannot be expressed to the OS, a canonical path outside the jail, a lookup that
//! failed while resolving, and a syscall that failed after validation succeeded.
use std::io;
use std::path::{Path, PathBuf};

const MAX_ERROR_PATH_LEN: usize = 256;

// Internal helper: render error-friendly path display (truncate long values).
pub(crate) fn truncate_path_display(path: &Path, max_len: usize) -> String {
    let path_str = path.to_string_lossy();
    let char_count = path_str.chars().count();
    if char_count <= max_len {
        return path_str.into_owned();
    }
    let keep = max_len.saturating_sub(5) / 2;
    let start: String = path_str.chars().take(keep).collect();
    let mut tail_chars: Vec<char> = path_str.chars().rev().take(keep).collect();
    tail_chars.reverse();
    let end: String = tail_chars.into_iter().collect();
    format!("{start}...{end}")
}

fn shown(path: &Path) -> String {
    truncate_path_display(path, MAX_ERROR_PATH_LEN)
}

/// SUMMARY:
/// Represent every way a path can be refused or an operation on it can fail.
///
/// DETAILS:
/// `Display` includes host paths (truncated) and is meant for logs. Shells that face
/// untrusted users should render their own message from the variant instead, so the
/// jail root location is never echoed back.
///
/// VARIANTS:
/// - `InvalidRoot`: The jail root could not be created, is missing, or is not a directory.
/// - `PathTooLong`: The candidate path exceeds the configured length limit.
/// - `InvalidPath`: The input cannot name a single filesystem entry (NUL byte, `.`/`..` target).
/// - `NotConfined`: The canonical path is (or would be) outside the jail root.
/// - `Resolution`: Canonicalization failed (missing parent, non-directory component, permissions).
/// - `Io`: A syscall issued after validation failed.
#[derive(Debug, thiserror::Error)]
pub enum JailError {
    #[error("invalid jail root: {}", shown(.root))]
    InvalidRoot {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path of {length} bytes exceeds the {limit} byte limit")]
    PathTooLong { length: usize, limit: usize },

    #[error("invalid path '{}': {reason}", shown(.path))]
    InvalidPath { path: PathBuf, reason: &'static str },

    #[error("path '{}' escapes jail root '{}'", shown(.attempted), shown(.root))]
    NotConfined { attempted: PathBuf, root: PathBuf },

    #[error("cannot resolve path: {}", shown(.path))]
    Resolution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{op} failed on {}", shown(.path))]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl JailError {
    #[inline]
    pub(crate) fn invalid_root(root: PathBuf, source: io::Error) -> Self {
        Self::InvalidRoot { root, source }
    }

    #[inline]
    pub(crate) fn not_confined(attempted: PathBuf, root: PathBuf) -> Self {
        Self::NotConfined { attempted, root }
    }

    #[inline]
    pub(crate) fn resolution(path: PathBuf, source: io::Error) -> Self {
        Self::Resolution { path, source }
    }

    #[inline]
    pub(crate) fn io(op: &'static str, path: PathBuf, source: io::Error) -> Self {
        Self::Io { op, path, source }
    }

    /// SUMMARY:
    /// Return `true` when the path was refused for leaving the jail.
    #[inline]
    pub fn is_not_confined(&self) -> bool {
        matches!(self, Self::NotConfined { .. })
    }

    /// SUMMARY:
    /// Return the underlying OS error kind for `Resolution`/`Io`/`InvalidRoot`, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::InvalidRoot { source, .. }
            | Self::Resolution { source, .. }
            | Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}
