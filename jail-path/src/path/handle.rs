//! Directory handles acquired at validation time.
//!
//! Mutations are issued with the `*at` syscalls relative to an open directory and a single
//! plain name, so a path component swapped for a symlink after validation cannot redirect
//! them. The handle itself is checked against the jail right after it is opened.
#![allow(unsafe_code)]

use crate::validator::is_within;
use crate::validator::jail_root::JailRoot;
use crate::{JailError, Result};
use std::ffi::{CString, OsStr};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

const DIR_FLAGS: libc::c_int = libc::O_DIRECTORY | libc::O_NOFOLLOW | libc::O_CLOEXEC;

pub(crate) struct DirHandle {
    dir: File,
    path: PathBuf,
}

impl DirHandle {
    /// Open `dir` (a validated canonical directory) and prove the opened handle is inside `jail`.
    pub(crate) fn open(jail: &JailRoot, dir: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(DIR_FLAGS)
            .open(dir)
            .map_err(|e| JailError::resolution(dir.to_path_buf(), e))?;
        let handle = Self {
            dir: file,
            path: dir.to_path_buf(),
        };
        handle.verify(jail)?;
        tracing::debug!(dir = %dir.display(), "acquired directory handle");
        Ok(handle)
    }

    #[inline]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(target_os = "linux")]
    fn verify(&self, jail: &JailRoot) -> Result<()> {
        let link = format!("/proc/self/fd/{}", self.dir.as_raw_fd());
        match std::fs::read_link(link) {
            Ok(held) => {
                if is_within(jail.path(), &held) {
                    Ok(())
                } else {
                    tracing::warn!(held = %held.display(), "directory handle resolved outside jail root");
                    Err(JailError::not_confined(held, jail.path().to_path_buf()))
                }
            }
            // procfs unavailable: fall back to comparing identities.
            Err(_) => self.verify_identity(jail),
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn verify(&self, jail: &JailRoot) -> Result<()> {
        self.verify_identity(jail)
    }

    // The handle must still be the directory the validated path names.
    fn verify_identity(&self, jail: &JailRoot) -> Result<()> {
        let held = self
            .dir
            .metadata()
            .map_err(|e| JailError::resolution(self.path.clone(), e))?;
        let named = std::fs::symlink_metadata(&self.path)
            .map_err(|e| JailError::resolution(self.path.clone(), e))?;
        if (held.dev(), held.ino()) == (named.dev(), named.ino()) && is_within(jail.path(), &self.path) {
            Ok(())
        } else {
            tracing::warn!(dir = %self.path.display(), "directory changed between validation and open");
            Err(JailError::not_confined(
                self.path.clone(),
                jail.path().to_path_buf(),
            ))
        }
    }

    /// Open the child directory `name` without following a symlink.
    pub(crate) fn open_child(&self, name: &OsStr) -> Result<Self> {
        let path = self.path.join(name);
        let c_name = plain_name(name).map_err(|e| JailError::io("open", path.clone(), e))?;
        // SAFETY: `c_name` is a valid NUL-terminated string that outlives the call and the
        // directory descriptor is owned by `self.dir`, open for the duration of the call.
        let fd = unsafe { libc::openat(self.dir.as_raw_fd(), c_name.as_ptr(), DIR_FLAGS | libc::O_RDONLY) };
        if fd < 0 {
            return Err(JailError::io("open", path, io::Error::last_os_error()));
        }
        // SAFETY: `fd` was just returned by a successful `openat` and is owned by nobody else.
        let dir = unsafe { File::from_raw_fd(fd) };
        Ok(Self { dir, path })
    }

    pub(crate) fn make_dir(&self, name: &OsStr, mode: u32) -> Result<()> {
        let c_name = self.c_name("mkdir", name)?;
        // SAFETY: valid C string and an open directory descriptor; see `open_child`.
        let ret = unsafe { libc::mkdirat(self.dir.as_raw_fd(), c_name.as_ptr(), mode as libc::mode_t) };
        cvt(ret).map_err(|e| JailError::io("mkdir", self.path.join(name), e))
    }

    pub(crate) fn remove_file(&self, name: &OsStr) -> Result<()> {
        let c_name = self.c_name("rm", name)?;
        // SAFETY: valid C string and an open directory descriptor; see `open_child`.
        let ret = unsafe { libc::unlinkat(self.dir.as_raw_fd(), c_name.as_ptr(), 0) };
        cvt(ret).map_err(|e| JailError::io("rm", self.path.join(name), e))
    }

    pub(crate) fn remove_dir(&self, name: &OsStr) -> Result<()> {
        let c_name = self.c_name("rmdir", name)?;
        // SAFETY: valid C string and an open directory descriptor; see `open_child`.
        let ret = unsafe { libc::unlinkat(self.dir.as_raw_fd(), c_name.as_ptr(), libc::AT_REMOVEDIR) };
        cvt(ret).map_err(|e| JailError::io("rmdir", self.path.join(name), e))
    }

    pub(crate) fn rename(&self, name: &OsStr, to: &DirHandle, to_name: &OsStr) -> Result<()> {
        let from = self.c_name("rename", name)?;
        let dest = to.c_name("rename", to_name)?;
        // SAFETY: both names are valid C strings and both descriptors are open directories
        // owned by their handles for the duration of the call.
        let ret = unsafe {
            libc::renameat(
                self.dir.as_raw_fd(),
                from.as_ptr(),
                to.dir.as_raw_fd(),
                dest.as_ptr(),
            )
        };
        cvt(ret).map_err(|e| JailError::io("rename", self.path.join(name), e))
    }

    /// Create `to_name` in `to` as a hard link to the entry `name` (never follows a symlink).
    pub(crate) fn hard_link(&self, name: &OsStr, to: &DirHandle, to_name: &OsStr) -> Result<()> {
        let original = self.c_name("ln", name)?;
        let link = to.c_name("ln", to_name)?;
        // SAFETY: both names are valid C strings and both descriptors are open directories
        // owned by their handles for the duration of the call. Flags 0: do not follow.
        let ret = unsafe {
            libc::linkat(
                self.dir.as_raw_fd(),
                original.as_ptr(),
                to.dir.as_raw_fd(),
                link.as_ptr(),
                0,
            )
        };
        cvt(ret).map_err(|e| JailError::io("ln", to.path.join(to_name), e))
    }

    fn c_name(&self, op: &'static str, name: &OsStr) -> Result<CString> {
        plain_name(name).map_err(|e| JailError::io(op, self.path.join(name), e))
    }
}

impl std::fmt::Debug for DirHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirHandle")
            .field("path", &self.path)
            .field("fd", &self.dir.as_raw_fd())
            .finish()
    }
}

// A single directory entry name: non-empty, no separator, no NUL, not `.` or `..`.
pub(crate) fn plain_name(name: &OsStr) -> io::Result<CString> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes == b"." || bytes == b".." || bytes.contains(&b'/') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a plain directory entry name",
        ));
    }
    CString::new(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn cvt(ret: libc::c_int) -> io::Result<()> {
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
