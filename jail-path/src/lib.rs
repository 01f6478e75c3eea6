//! # jail-path
//!
//! Confine every filesystem operation of an interactive session to one directory tree.
//!
//! A user-supplied path goes through three steps before any syscall touches it:
//!
//! 1. **Resolve** ([`resolve`]): anchor the input at the jail root (`/x`) or at the session
//!    directory (`x`). Pure string work; overlong input is an error, never truncated.
//! 2. **Canonicalize** ([`validator::canonicalize`]): ask the filesystem what the path really
//!    is, following symlinks and `..`. A tail that does not exist yet is allowed only if it
//!    consists of plain names.
//! 3. **Check the boundary** ([`is_within`]): compare canonical path and jail root segment by
//!    segment, so `/tmp/test-evil` is never inside `/tmp/test`.
//!
//! The result is a [`ConfinedPath`] (or, for remove/rename/link, a [`ConfinedEntry`] whose
//! parent directory is already open). Mutations are issued relative to directory handles
//! acquired during validation, which closes the window between the check and the use.
//!
//! ```rust
//! use jail_path::{resolve, JailRoot, SessionState};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let td = tempfile::tempdir()?;
//! let jail = JailRoot::try_new(td.path())?;
//! let session = SessionState::new(&jail);
//!
//! // Creating below a not-yet-existing chain is fine...
//! let nested = jail.confine(resolve(&jail, &session, "a/b/c")?)?;
//! nested.create_dir_all(0o755)?;
//! assert!(nested.is_dir());
//!
//! // ...walking out of the jail is not.
//! let escape = resolve(&jail, &session, "../escape")?;
//! assert!(jail.confine(escape).unwrap_err().is_not_confined());
//! # Ok(()) }
//! ```
//!
//! Unix only: the handle-relative operations use the `openat(2)` family.
#![deny(unsafe_code)]

#[cfg(not(unix))]
compile_error!("jail-path relies on openat(2)-family syscalls and supports Unix targets only");

pub mod error;
pub mod path;
pub mod resolver;
pub mod session;
pub mod validator;

pub use error::JailError;
pub use path::{confined_path::ConfinedPath, entry::ConfinedEntry};
pub use resolver::resolve;
pub use session::{Recovery, SessionState};
pub use validator::jail_root::{JailRoot, DEFAULT_MAX_PATH_LEN};
pub use validator::{is_confined, is_within, CandidatePath, CanonicalPath};

/// Result type alias for this crate's operations.
pub type Result<T> = std::result::Result<T, JailError>;
