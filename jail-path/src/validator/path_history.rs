//! Type-state wrapper recording which validation steps a path has been through.
//!
//! `Raw` paths are candidates built by the resolver. `canonicalize` turns them into
//! `(Raw, Canonicalized)` by asking the filesystem, and `boundary_check` stamps them
//! `BoundaryChecked` once they are proven to sit inside the jail root.
use crate::{JailError, Result};
use std::ffi::OsString;
use std::io::{Error as IoError, ErrorKind};
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Raw;
#[derive(Debug, Clone)]
pub struct Canonicalized;
#[derive(Debug, Clone)]
pub struct BoundaryChecked;
#[derive(Debug, Clone)]
pub struct Exists;

#[derive(Debug, Clone)]
pub struct PathHistory<History> {
    inner: PathBuf,
    // Trailing components that did not exist when the path was canonicalized.
    missing: usize,
    _marker: std::marker::PhantomData<History>,
}

impl<H> AsRef<Path> for PathHistory<H> {
    #[inline]
    fn as_ref(&self) -> &Path {
        &self.inner
    }
}

impl<H> Deref for PathHistory<H> {
    type Target = Path;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl PathHistory<Raw> {
    #[inline]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        PathHistory {
            inner: path.into(),
            missing: 0,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<H> PathHistory<H> {
    #[inline]
    pub fn into_inner(self) -> PathBuf {
        self.inner
    }

    /// Number of trailing components that did not exist at canonicalization time.
    #[inline]
    pub fn missing(&self) -> usize {
        self.missing
    }

    /// The deepest existing ancestor (the path itself when nothing is missing).
    pub fn existing_ancestor(&self) -> &Path {
        let mut ancestor = self.inner.as_path();
        for _ in 0..self.missing {
            ancestor = ancestor.parent().unwrap_or(ancestor);
        }
        ancestor
    }

    /// The not-yet-existing names, outermost first.
    pub fn missing_names(&self) -> Vec<OsString> {
        let mut names: Vec<OsString> = self
            .inner
            .components()
            .rev()
            .take(self.missing)
            .map(|c| c.as_os_str().to_os_string())
            .collect();
        names.reverse();
        names
    }

    #[inline]
    fn advance<Next>(self) -> PathHistory<Next> {
        PathHistory {
            inner: self.inner,
            missing: self.missing,
            _marker: std::marker::PhantomData,
        }
    }

    /// Resolve the path the way the kernel would, tolerating a not-yet-existing tail.
    ///
    /// The full path is tried first. If the OS reports `NotFound`, ancestors are tried
    /// deepest-first until one resolves; the stripped tail must then consist of plain
    /// names only. A `..` in the tail is refused outright because nothing on disk can
    /// tell where it would land once the missing directories exist.
    pub fn canonicalize(self) -> Result<PathHistory<(H, Canonicalized)>> {
        match std::fs::canonicalize(&self.inner) {
            Ok(resolved) => {
                tracing::debug!(candidate = %self.inner.display(), resolved = %resolved.display(), "canonicalized");
                return Ok(PathHistory {
                    inner: resolved,
                    missing: 0,
                    _marker: std::marker::PhantomData,
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(JailError::resolution(self.inner, e)),
        }

        let components: Vec<Component<'_>> = self.inner.components().collect();
        for split in (0..components.len()).rev() {
            let prefix: PathBuf = components[..split].iter().collect();
            if prefix.as_os_str().is_empty() {
                break;
            }
            let base = match std::fs::canonicalize(&prefix) {
                Ok(base) => base,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(JailError::resolution(self.inner.clone(), e)),
            };

            let Some(suffix) = missing_suffix(&components[split..]) else {
                tracing::warn!(
                    candidate = %self.inner.display(),
                    "path rejected: traversal after a missing component"
                );
                return Err(JailError::not_confined(self.inner.clone(), base));
            };

            // The first missing name is absent as far as `stat` goes; if `lstat` still
            // sees it, it is a symlink whose target we cannot see.
            if let Some(first) = suffix.first() {
                if std::fs::symlink_metadata(base.join(first)).is_ok() {
                    let io = IoError::new(ErrorKind::NotFound, "dangling symbolic link");
                    return Err(JailError::resolution(self.inner.clone(), io));
                }
            }

            let missing = suffix.len();
            let mut resolved = base;
            resolved.extend(suffix);
            tracing::debug!(
                candidate = %self.inner.display(),
                resolved = %resolved.display(),
                missing,
                "canonicalized with missing tail"
            );
            return Ok(PathHistory {
                inner: resolved,
                missing,
                _marker: std::marker::PhantomData,
            });
        }

        Err(JailError::resolution(
            self.inner.clone(),
            IoError::from_raw_os_error(libc::ENOENT),
        ))
    }

    pub fn verify_exists(self) -> Option<PathHistory<(H, Exists)>> {
        (self.missing == 0 && self.inner.exists()).then(|| self.advance())
    }
}

impl<H> PathHistory<(H, Canonicalized)> {
    #[inline]
    pub fn boundary_check(
        self,
        root: &PathHistory<((Raw, Canonicalized), Exists)>,
    ) -> Result<PathHistory<((H, Canonicalized), BoundaryChecked)>> {
        if !is_within(root, &self.inner) {
            tracing::warn!(
                attempted = %self.inner.display(),
                root = %root.display(),
                "path rejected: outside jail root"
            );
            return Err(JailError::not_confined(self.inner, root.to_path_buf()));
        }
        Ok(self.advance())
    }
}

impl PathHistory<Raw> {
    /// Stamp the jail root's own canonical path as checked; it is confined by definition.
    #[inline]
    pub(crate) fn trusted_root(self) -> PathHistory<((Raw, Canonicalized), BoundaryChecked)> {
        self.advance()
    }
}

// Only plain names may follow the deepest existing ancestor.
fn missing_suffix(components: &[Component<'_>]) -> Option<Vec<OsString>> {
    let mut names = Vec::with_capacity(components.len());
    for component in components {
        match component {
            Component::Normal(name) => names.push(name.to_os_string()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(names)
}

/// SUMMARY:
/// Return `true` if `candidate` equals `root` or lies below it, comparing whole path segments.
///
/// DETAILS:
/// Both paths are expected to be canonical. The comparison walks components, so a sibling
/// whose name merely starts with the root's last segment (`/tmp/test-evil` against
/// `/tmp/test`) is rejected.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    let mut candidate_parts = candidate.components();
    for root_part in root.components() {
        match candidate_parts.next() {
            Some(part) if part == root_part => {}
            _ => return false,
        }
    }
    true
}
