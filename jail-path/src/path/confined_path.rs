use crate::path::handle::DirHandle;
use crate::validator::jail_root::JailRoot;
use crate::validator::path_history::{BoundaryChecked, Canonicalized, PathHistory, Raw};
use crate::{JailError, Result};
use std::ffi::OsStr;
use std::fmt;
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

/// SUMMARY:
/// Hold a canonical path proven to be the jail root or one of its descendants.
///
/// DETAILS:
/// Produced only by `JailRoot::confine` (and `JailRoot::root_path`). The tail of the path
/// may not exist yet; `missing_components()` says how many trailing names are still to be
/// created. `Display` is intentionally not implemented: use `jail_relative_display()` for
/// anything a user sees and `confinedpath_display()` for logs.
#[derive(Clone)]
pub struct ConfinedPath {
    path: PathHistory<((Raw, Canonicalized), BoundaryChecked)>,
    jail: JailRoot,
}

impl ConfinedPath {
    pub(crate) fn new(jail: JailRoot, path: PathHistory<((Raw, Canonicalized), BoundaryChecked)>) -> Self {
        Self { path, jail }
    }

    #[inline]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// The jail this path was proven against.
    #[inline]
    pub fn jail(&self) -> &JailRoot {
        &self.jail
    }

    /// Number of trailing components that did not exist when the path was validated.
    #[inline]
    pub fn missing_components(&self) -> usize {
        self.path.missing()
    }

    /// Returns `true` if this is the jail root itself.
    #[inline]
    pub fn is_jail_root(&self) -> bool {
        self.path() == self.jail.path()
    }

    /// SUMMARY:
    /// Render the path relative to the jail root: `/` for the root, `/a/b` below it.
    ///
    /// DETAILS:
    /// The host location of the jail never appears in the result, which makes this the
    /// right form for prompts and user-facing messages.
    pub fn jail_relative_display(&self) -> String {
        let relative = self.path().strip_prefix(self.jail.path()).unwrap_or(Path::new(""));
        let mut shown = String::from("/");
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        shown.push_str(&parts.join("/"));
        shown
    }

    /// Returns a Display wrapper that shows the canonical host path.
    #[inline]
    pub fn confinedpath_display(&self) -> std::path::Display<'_> {
        self.path.display()
    }

    /// SUMMARY:
    /// Return the host path as `&OsStr` for unavoidable third-party interop.
    #[inline]
    pub fn interop_path(&self) -> &OsStr {
        self.path.as_os_str()
    }

    /// SUMMARY:
    /// Consume and return the inner `PathBuf` (escape hatch).
    #[inline]
    pub fn unconfine(self) -> PathBuf {
        self.path.into_inner()
    }

    /// Returns the file name of the canonical path, if any.
    #[inline]
    pub fn confinedpath_file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }

    /// Returns `true` if the path currently exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns `true` if the path currently is a directory.
    pub fn is_dir(&self) -> bool {
        self.path.is_dir()
    }

    /// Returns the metadata for the path (follows a final symlink, like `std::fs::metadata`).
    pub fn metadata(&self) -> std::io::Result<std::fs::Metadata> {
        std::fs::metadata(&self.path)
    }

    /// Returns the metadata for the path itself, without following a final symlink.
    pub fn symlink_metadata(&self) -> std::io::Result<std::fs::Metadata> {
        std::fs::symlink_metadata(&self.path)
    }

    /// SUMMARY:
    /// Read the entries of this directory. Names must be re-resolved through the jail before I/O.
    pub fn read_dir(&self) -> std::io::Result<std::fs::ReadDir> {
        std::fs::read_dir(&self.path)
    }

    /// SUMMARY:
    /// Create every missing directory on this path, descending handle by handle.
    ///
    /// DETAILS:
    /// The deepest existing ancestor is opened and re-verified against the jail; each
    /// missing name is then created with `mkdirat` and entered with a no-follow `openat`,
    /// so nothing is ever resolved by path string after validation.
    ///
    /// ERRORS:
    /// - `JailError::Io` with `AlreadyExists`: nothing was missing.
    /// - `JailError::NotConfined`/`JailError::Resolution`: the ancestor handle failed verification.
    /// - `JailError::Io`: a `mkdirat`/`openat` failed.
    pub fn create_dir_all(&self, mode: u32) -> Result<()> {
        let names = self.path.missing_names();
        let Some((last, leading)) = names.split_last() else {
            return Err(JailError::io(
                "mkdir",
                self.path.to_path_buf(),
                IoError::from_raw_os_error(libc::EEXIST),
            ));
        };

        let mut dir = DirHandle::open(&self.jail, self.path.existing_ancestor())?;
        for name in leading {
            dir.make_dir(name, mode)?;
            dir = dir.open_child(name)?;
        }
        dir.make_dir(last, mode)?;
        tracing::debug!(dir = %self.path.display(), created = names.len(), "created directories");
        Ok(())
    }
}

impl fmt::Debug for ConfinedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfinedPath")
            .field("path", &self.path.as_ref())
            .field("missing", &self.path.missing())
            .field("jail", &self.jail.path())
            .finish()
    }
}

impl PartialEq for ConfinedPath {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.path.as_ref() == other.path.as_ref()
    }
}

impl Eq for ConfinedPath {}

impl<T: AsRef<Path>> PartialEq<T> for ConfinedPath {
    fn eq(&self, other: &T) -> bool {
        self.path.as_ref() == other.as_ref()
    }
}
