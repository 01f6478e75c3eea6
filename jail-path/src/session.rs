//! SUMMARY:
//! Track one shell session's working directory inside the jail.
//!
//! OVERVIEW:
//! The session directory is explicit state, never the process working directory, so any
//! number of sessions may share one `JailRoot`. It changes only through `change_dir` with an
//! already-confined path, and `recover` re-proves it before each command.
use crate::path::confined_path::ConfinedPath;
use crate::validator::jail_root::JailRoot;
use crate::{JailError, Result};
use std::io::Error as IoError;

/// Result of re-validating the session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// The directory still canonicalizes inside the jail.
    Intact,
    /// The directory was gone or outside the jail; the session is back at the jail root.
    Reset { reason: String },
}

/// SUMMARY:
/// Hold the current working directory of a session, always a confined, existing directory
/// at the time it was last validated.
#[derive(Debug, Clone)]
pub struct SessionState {
    cwd: ConfinedPath,
}

impl SessionState {
    /// Start a session at the jail root.
    pub fn new(jail: &JailRoot) -> Self {
        Self {
            cwd: jail.root_path(),
        }
    }

    #[inline]
    pub fn cwd(&self) -> &ConfinedPath {
        &self.cwd
    }

    #[inline]
    pub fn jail(&self) -> &JailRoot {
        self.cwd.jail()
    }

    /// SUMMARY:
    /// Move the session to `target`, which must exist and be a directory.
    ///
    /// ERRORS:
    /// - `JailError::Resolution` (`NotFound`): part of `target` does not exist.
    /// - `JailError::Io` (`NotADirectory`): `target` is not a directory.
    /// - `JailError::NotConfined`: `target` belongs to another jail.
    pub fn change_dir(&mut self, target: ConfinedPath) -> Result<()> {
        if target.jail() != self.cwd.jail() {
            return Err(JailError::not_confined(
                target.unconfine(),
                self.cwd.jail().path().to_path_buf(),
            ));
        }
        if target.missing_components() > 0 {
            return Err(JailError::resolution(
                target.unconfine(),
                IoError::from_raw_os_error(libc::ENOENT),
            ));
        }
        if !target.is_dir() {
            return Err(JailError::io(
                "cd",
                target.unconfine(),
                IoError::from_raw_os_error(libc::ENOTDIR),
            ));
        }
        tracing::debug!(cwd = %target.confinedpath_display(), "session directory changed");
        self.cwd = target;
        Ok(())
    }

    /// Put the session back at the jail root.
    pub fn reset(&mut self) {
        self.cwd = self.cwd.jail().root_path();
    }

    /// SUMMARY:
    /// Re-prove the session directory; reset to the jail root if it no longer holds.
    ///
    /// DETAILS:
    /// Another process may have renamed the directory, replaced it with a symlink leading
    /// out of the jail, or removed it. The stored path is re-canonicalized and must still be
    /// an existing directory within the jail. When it is, the stored form is refreshed. The
    /// candidate length limit is not applied here: a directory reached through a short
    /// symlink may have a longer canonical path and is still confined.
    pub fn recover(&mut self) -> Recovery {
        let jail = self.cwd.jail().clone();
        let reason = match jail.reconfine(self.cwd.path()) {
            Ok(path) if path.missing_components() == 0 && path.is_dir() => {
                self.cwd = path;
                return Recovery::Intact;
            }
            Ok(_) => "session directory no longer exists".to_string(),
            Err(e) => e.to_string(),
        };
        tracing::warn!(%reason, "session directory invalid, resetting to jail root");
        self.reset();
        Recovery::Reset { reason }
    }

    /// The session directory relative to the jail root, for prompts.
    #[inline]
    pub fn relative_display(&self) -> String {
        self.cwd.jail_relative_display()
    }
}
