//! The Confinement Validator: canonicalization plus the segment-wise boundary check.
pub mod jail_root;
pub mod path_history;

use crate::Result;
use path_history::{Canonicalized, PathHistory, Raw};

pub use path_history::is_within;

/// A path built from the jail root (or session directory) and user input; not yet verified.
pub type CandidatePath = PathHistory<Raw>;

/// A candidate resolved against the real filesystem; `missing()` counts the not-yet-existing tail.
pub type CanonicalPath = PathHistory<(Raw, Canonicalized)>;

/// SUMMARY:
/// Resolve `candidate` against the filesystem, following symlinks and collapsing `.`/`..`.
///
/// ERRORS:
/// - `JailError::Resolution`: No ancestor resolves, a middle component is not a directory,
///   permission is denied, or the first missing name is a dangling symlink.
/// - `JailError::NotConfined`: The not-yet-existing tail contains `..`.
#[inline]
pub fn canonicalize(candidate: CandidatePath) -> Result<CanonicalPath> {
    candidate.canonicalize()
}

/// SUMMARY:
/// Return `true` if `candidate` canonicalizes to `jail` or one of its descendants.
#[inline]
pub fn is_confined(jail: &jail_root::JailRoot, candidate: &CandidatePath) -> bool {
    jail.is_confined(candidate)
}
