use crate::error::JailError;
use crate::path::confined_path::ConfinedPath;
use crate::path::entry::ConfinedEntry;
use crate::validator::path_history::*;
use crate::validator::CandidatePath;
use crate::Result;

use std::io::{Error as IoError, ErrorKind};
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;
use std::sync::Arc;

/// Default candidate length limit, the platform's `PATH_MAX`.
pub const DEFAULT_MAX_PATH_LEN: usize = libc::PATH_MAX as usize;

/// SUMMARY:
/// Canonicalize a candidate path and enforce the jail root, returning a `ConfinedPath`.
///
/// PARAMETERS:
/// - `candidate` (`CandidatePath`): Absolute candidate built by the resolver.
/// - `jail` (&`JailRoot`): Root to enforce during resolution.
///
/// ERRORS:
/// - `JailError::PathTooLong`: Candidate exceeds the jail's length limit.
/// - `JailError::Resolution`: Canonicalization fails for a reason other than a missing tail.
/// - `JailError::NotConfined`: Canonical path (or its missing tail) leaves the jail.
pub(crate) fn canonicalize_and_enforce_jail(
    candidate: CandidatePath,
    jail: &JailRoot,
) -> Result<ConfinedPath> {
    let length = candidate.as_os_str().len();
    if length > jail.max_path_len {
        return Err(JailError::PathTooLong {
            length,
            limit: jail.max_path_len,
        });
    }
    enforce_jail(candidate, jail)
}

// Canonicalize and boundary-check without the candidate length gate. A canonical path may
// legitimately be longer than the input that named it (a short symlink to a long directory).
fn enforce_jail(candidate: CandidatePath, jail: &JailRoot) -> Result<ConfinedPath> {
    let attempted = candidate.to_path_buf();
    let canonicalized = candidate.canonicalize().map_err(|e| match e {
        // A traversal in the missing tail is reported against the jail, not the ancestor.
        JailError::NotConfined { .. } => JailError::not_confined(attempted, jail.path().to_path_buf()),
        other => other,
    })?;

    let confined = canonicalized.boundary_check(&jail.path)?;
    Ok(ConfinedPath::new(jail.clone(), confined))
}

/// SUMMARY:
/// Represent the immutable directory outside of which no operation may act.
///
/// DETAILS:
/// The stored path is canonical (absolute, no symlink components, no trailing slash), which
/// is what makes segment-wise comparison meaningful. Cloning is cheap and clones share the
/// same root, so any number of sessions can hold one.
///
/// EXAMPLE:
/// ```rust
/// # use jail_path::JailRoot;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let td = tempfile::tempdir()?;
/// let jail = JailRoot::try_new(td.path())?;
/// assert!(jail.exists());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct JailRoot {
    path: Arc<PathHistory<((Raw, Canonicalized), Exists)>>,
    max_path_len: usize,
}

impl Eq for JailRoot {}

impl PartialEq for JailRoot {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl PartialEq<Path> for JailRoot {
    #[inline]
    fn eq(&self, other: &Path) -> bool {
        self.path() == other
    }
}

impl JailRoot {
    /// SUMMARY:
    /// Create a jail root anchored at an existing directory.
    ///
    /// ERRORS:
    /// - `JailError::InvalidRoot`: Directory is missing, not a directory, or cannot be canonicalized.
    pub fn try_new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let canonicalized = PathHistory::<Raw>::new(root)
            .canonicalize()
            .map_err(|e| match e {
                JailError::Resolution { source, .. } => {
                    JailError::invalid_root(root.to_path_buf(), source)
                }
                other => JailError::invalid_root(
                    root.to_path_buf(),
                    IoError::new(ErrorKind::InvalidInput, other.to_string()),
                ),
            })?;

        let verified_exists = match canonicalized.verify_exists() {
            Some(path) => path,
            None => {
                let io = IoError::new(ErrorKind::NotFound, "the jail root does not exist");
                return Err(JailError::invalid_root(root.to_path_buf(), io));
            }
        };

        if !verified_exists.is_dir() {
            let io = IoError::new(
                ErrorKind::InvalidInput,
                "the jail root exists but is not a directory",
            );
            return Err(JailError::invalid_root(root.to_path_buf(), io));
        }

        tracing::info!(root = %verified_exists.display(), "jail root established");
        Ok(Self {
            path: Arc::new(verified_exists),
            max_path_len: DEFAULT_MAX_PATH_LEN,
        })
    }

    /// SUMMARY:
    /// Create the directory (and missing parents) with `mode` if absent, then construct the jail root.
    ///
    /// DETAILS:
    /// `mode` applies only to directories created here; an existing directory keeps its
    /// permissions. The process umask still applies.
    ///
    /// ERRORS:
    /// - `JailError::InvalidRoot`: Creation or canonicalization fails.
    pub fn try_new_create<P: AsRef<Path>>(root: P, mode: u32) -> Result<Self> {
        let root_path = root.as_ref();
        if !root_path.exists() {
            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(mode)
                .create(root_path)
                .map_err(|e| JailError::invalid_root(root_path.to_path_buf(), e))?;
            tracing::info!(root = %root_path.display(), mode = format_args!("{mode:o}"), "created jail root");
        }
        Self::try_new(root_path)
    }

    /// SUMMARY:
    /// Replace the candidate length limit (bytes). A limit of zero is raised to one.
    #[inline]
    pub fn with_max_path_len(mut self, limit: usize) -> Self {
        self.max_path_len = limit.max(1);
        self
    }

    /// Candidate length limit in bytes.
    #[inline]
    pub fn max_path_len(&self) -> usize {
        self.max_path_len
    }

    /// SUMMARY:
    /// Canonicalize `candidate` and prove it lies within this jail.
    ///
    /// DETAILS:
    /// The candidate may name a path whose tail does not exist yet (for creation); the
    /// deepest existing ancestor is then what gets checked, and the missing tail must be
    /// plain names.
    #[inline]
    pub fn confine(&self, candidate: CandidatePath) -> Result<ConfinedPath> {
        canonicalize_and_enforce_jail(candidate, self)
    }

    /// SUMMARY:
    /// Return `true` if `candidate` canonicalizes to this jail root or a descendant of it.
    ///
    /// DETAILS:
    /// Every failure (missing parent chain, permission error, escape) is `false`.
    pub fn is_confined(&self, candidate: &CandidatePath) -> bool {
        self.confine(candidate.clone()).is_ok()
    }

    /// SUMMARY:
    /// Validate `candidate` as a single directory entry strictly below the jail root and
    /// open its parent directory for handle-relative operations.
    ///
    /// DETAILS:
    /// Only the lexical parent is canonicalized and checked. The entry itself is never
    /// followed by the operations, so a symlink entry pointing anywhere stays removable.
    ///
    /// ERRORS:
    /// - `JailError::PathTooLong`: Candidate exceeds the jail's length limit.
    /// - `JailError::InvalidPath`: Candidate ends in `.` or `..`.
    /// - `JailError::NotConfined`: The parent canonicalizes outside the jail (this includes
    ///   naming the jail root itself).
    /// - `JailError::Resolution`: Parent directory does not exist or cannot be resolved.
    #[inline]
    pub fn confine_entry(&self, candidate: CandidatePath) -> Result<ConfinedEntry> {
        ConfinedEntry::new(self, candidate)
    }

    /// Re-prove a path this jail produced earlier. The candidate length limit does not apply:
    /// it bounds user input, not where that input resolved to.
    pub(crate) fn reconfine(&self, path: &Path) -> Result<ConfinedPath> {
        enforce_jail(PathHistory::<Raw>::new(path), self)
    }

    /// SUMMARY:
    /// Return the jail root itself as a `ConfinedPath`.
    pub fn root_path(&self) -> ConfinedPath {
        let validated = PathHistory::<Raw>::new(self.path().to_path_buf()).trusted_root();
        ConfinedPath::new(self.clone(), validated)
    }

    /// Returns the canonical jail root path.
    #[inline]
    pub(crate) fn path(&self) -> &Path {
        self.path.as_ref()
    }

    /// Returns true if the jail root directory exists.
    ///
    /// Construction proved it existed; the filesystem is queried again in case it was removed since.
    #[inline]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// SUMMARY:
    /// Return the host path of the jail root as `&OsStr` for interop (no allocation).
    ///
    /// DETAILS:
    /// Like `AsRef<Path>`, this exposes the host location; keep it out of user-facing output.
    #[inline]
    pub fn interop_path(&self) -> &std::ffi::OsStr {
        self.path.as_os_str()
    }
}

impl AsRef<Path> for JailRoot {
    #[inline]
    fn as_ref(&self) -> &Path {
        self.path.as_ref()
    }
}

impl std::fmt::Debug for JailRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JailRoot")
            .field("path", &self.path.as_ref())
            .field("max_path_len", &self.max_path_len)
            .finish()
    }
}
