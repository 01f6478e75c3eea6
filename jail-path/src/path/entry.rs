use crate::path::handle::DirHandle;
use crate::validator::jail_root::JailRoot;
use crate::validator::path_history::{PathHistory, Raw};
use crate::validator::CandidatePath;
use crate::{JailError, Result};
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// SUMMARY:
/// A single directory entry strictly below the jail root, with its parent directory held open.
///
/// DETAILS:
/// Only the parent directory is proven confined. Removal, rename and link act on the entry
/// itself and never follow it, so a symlink entry (dangling, or pointing out of the jail)
/// is handled as the link it is: it can be removed or renamed, and what it points to is
/// never touched. Every syscall is issued relative to the parent handle acquired here.
#[derive(Debug)]
pub struct ConfinedEntry {
    parent: DirHandle,
    name: OsString,
    jail: JailRoot,
}

impl ConfinedEntry {
    pub(crate) fn new(jail: &JailRoot, candidate: CandidatePath) -> Result<Self> {
        let length = candidate.as_os_str().len();
        if length > jail.max_path_len() {
            return Err(JailError::PathTooLong {
                length,
                limit: jail.max_path_len(),
            });
        }
        let (parent_path, name) = split_entry(&candidate)?;

        // A confined parent keeps the entry strictly below the root.
        let parent = jail.confine(PathHistory::<Raw>::new(parent_path))?;
        if parent.missing_components() > 0 {
            return Err(JailError::resolution(
                parent.unconfine(),
                std::io::Error::from_raw_os_error(libc::ENOENT),
            ));
        }

        let parent = DirHandle::open(jail, parent.path())?;
        Ok(Self {
            parent,
            name,
            jail: jail.clone(),
        })
    }

    /// The entry's name within its parent directory.
    #[inline]
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// Returns `true` if the entry exists as a directory entry (a symlink counts, dangling or not).
    pub fn exists(&self) -> bool {
        std::fs::symlink_metadata(self.parent.path().join(&self.name)).is_ok()
    }

    /// SUMMARY:
    /// Remove the entry if it is not a directory (`unlinkat`).
    pub fn remove_file(&self) -> Result<()> {
        self.parent.remove_file(&self.name)
    }

    /// SUMMARY:
    /// Remove the entry if it is an empty directory (`unlinkat` with `AT_REMOVEDIR`).
    pub fn remove_dir(&self) -> Result<()> {
        self.parent.remove_dir(&self.name)
    }

    /// SUMMARY:
    /// Rename this entry to `dest` (`renameat`). Both entries must belong to the same jail.
    pub fn rename_to(&self, dest: &ConfinedEntry) -> Result<()> {
        self.same_jail(dest)?;
        self.parent.rename(&self.name, &dest.parent, &dest.name)
    }

    /// SUMMARY:
    /// Create `link` as a hard link to this entry (`linkat`, not following a symlink entry).
    pub fn hard_link_to(&self, link: &ConfinedEntry) -> Result<()> {
        self.same_jail(link)?;
        self.parent.hard_link(&self.name, &link.parent, &link.name)
    }

    fn same_jail(&self, other: &ConfinedEntry) -> Result<()> {
        if self.jail != other.jail {
            return Err(JailError::not_confined(
                other.parent.path().join(&other.name),
                self.jail.path().to_path_buf(),
            ));
        }
        Ok(())
    }
}

// Split lexically into (parent, final name). Trailing slashes are ignored; a final `.` or
// `..` does not name an entry and is refused.
fn split_entry(candidate: &CandidatePath) -> Result<(PathBuf, OsString)> {
    let bytes = candidate.as_os_str().as_bytes();
    let mut end = bytes.len();
    while end > 1 && bytes[end - 1] == b'/' {
        end -= 1;
    }
    let trimmed = &bytes[..end];

    let (parent, name): (&[u8], &[u8]) = match trimmed.iter().rposition(|&b| b == b'/') {
        Some(0) => (b"/", &trimmed[1..]),
        Some(i) => (&trimmed[..i], &trimmed[i + 1..]),
        None => (b".", trimmed),
    };

    if name.is_empty() || name == b"." || name == b".." {
        return Err(JailError::InvalidPath {
            path: candidate.to_path_buf(),
            reason: "does not name a directory entry",
        });
    }

    Ok((
        PathBuf::from(OsStr::from_bytes(parent)),
        OsStr::from_bytes(name).to_os_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(s: &str) -> Result<(PathBuf, OsString)> {
        split_entry(&PathHistory::<Raw>::new(s))
    }

    #[test]
    fn split_entry_takes_last_segment() {
        let (parent, name) = split("/jail/a/b").unwrap();
        assert_eq!(parent, PathBuf::from("/jail/a"));
        assert_eq!(name, OsString::from("b"));

        let (parent, name) = split("/jail/a/b///").unwrap();
        assert_eq!(parent, PathBuf::from("/jail/a"));
        assert_eq!(name, OsString::from("b"));

        let (parent, name) = split("/top").unwrap();
        assert_eq!(parent, PathBuf::from("/"));
        assert_eq!(name, OsString::from("top"));
    }

    #[test]
    fn split_entry_refuses_dot_and_dotdot() {
        for bad in ["/jail/a/.", "/jail/a/..", "/jail/..//", "/", "//"] {
            assert!(
                matches!(split(bad), Err(JailError::InvalidPath { .. })),
                "accepted {bad}"
            );
        }
    }
}
