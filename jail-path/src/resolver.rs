//! The Path Resolver: build a candidate path from user input. No filesystem access.
use crate::session::SessionState;
use crate::validator::jail_root::JailRoot;
use crate::validator::CandidatePath;
use crate::{JailError, Result};
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// SUMMARY:
/// Anchor `input` at the jail root (if it starts with `/`) or at the session directory.
///
/// DETAILS:
/// - `/docs/a` becomes `<jail root>/docs/a`; the leading separator means "jail root", never
///   the host root.
/// - `docs/a` becomes `<session dir>/docs/a`.
/// - Symlinks, `.` and `..` are left untouched; that is the validator's job.
///
/// ERRORS:
/// - `JailError::PathTooLong`: The candidate would exceed `jail.max_path_len()` bytes. The
///   candidate is never shortened to fit.
/// - `JailError::InvalidPath`: `input` contains a NUL byte.
pub fn resolve(
    jail: &JailRoot,
    session: &SessionState,
    input: impl AsRef<OsStr>,
) -> Result<CandidatePath> {
    let input = input.as_ref();
    let bytes = input.as_bytes();

    let jail_absolute = bytes.first() == Some(&b'/');
    let base = if jail_absolute {
        jail.interop_path()
    } else {
        session.cwd().interop_path()
    };
    let separator = usize::from(!jail_absolute);

    let length = base.len() + separator + bytes.len();
    if length > jail.max_path_len() {
        tracing::warn!(length, limit = jail.max_path_len(), "path rejected: too long");
        return Err(JailError::PathTooLong {
            length,
            limit: jail.max_path_len(),
        });
    }
    if bytes.contains(&0) {
        return Err(JailError::InvalidPath {
            path: PathBuf::from(input),
            reason: "contains a NUL byte",
        });
    }

    let mut candidate = OsString::with_capacity(length);
    candidate.push(base);
    if !jail_absolute {
        candidate.push("/");
    }
    candidate.push(input);
    Ok(CandidatePath::new(candidate))
}
