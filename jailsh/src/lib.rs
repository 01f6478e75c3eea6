//! # jailsh
//!
//! A restricted interactive shell. Every path a user types goes through
//! [`jail_path::resolve`] and [`jail_path::JailRoot::confine`] before a syscall sees it, and
//! the session directory is re-proven before each prompt.
//!
//! The pieces:
//!
//! - [`command`]: split an input line into a [`Command`].
//! - [`dispatch`]: validate a command into a plan, run it, report one line on failure.
//! - [`listing`]: render `ls` output for the (already confined) session directory.
//! - [`repl`]: the prompt/read/dispatch loop over any `BufRead`/`Write` pair.
//! - [`config`]: command line and environment configuration.
//!
//! ```rust
//! use jailsh::{dispatch::Shell, repl};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let td = tempfile::tempdir()?;
//! let mut shell = Shell::new(jail_path::JailRoot::try_new(td.path())?);
//!
//! let mut out = Vec::new();
//! repl::run(&mut shell, "mkdir a/b\ncd a/b\ncd ../../..\n".as_bytes(), &mut out)?;
//!
//! assert_eq!(shell.session().relative_display(), "/a/b");
//! assert!(td.path().join("a/b").is_dir());
//! # Ok(()) }
//! ```

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod listing;
pub mod repl;

pub use command::Command;
pub use config::Config;
pub use dispatch::{Flow, Phase, Shell};
pub use error::ShellError;
