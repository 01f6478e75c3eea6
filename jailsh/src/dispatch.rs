//! SUMMARY:
//! The command dispatcher: turn a parsed `Command` into a validated plan, run it, report.
//!
//! OVERVIEW:
//! Every command walks the same phases:
//!
//! ```text
//! Idle -> Validating -> Confined -> Executing -> Idle
//!                   \-> Rejected -----------------/
//! ```
//!
//! Validation resolves and confines every path operand and opens the parent directory
//! handles that the mutation will use. Nothing touches the filesystem for writing until a
//! `Plan` exists, and a `Plan` can only be built from confined values.
use crate::command::{Command, HELP};
use crate::error::ShellError;
use crate::listing;
use jail_path::{resolve, ConfinedEntry, ConfinedPath, JailRoot, Recovery, SessionState};
use std::io::{self, Write};

/// Mode passed to `mkdir`; the process umask applies.
const DIR_MODE: u32 = 0o777;

/// Whether the loop keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Where the dispatcher is in handling one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a command; the session directory is confined.
    Idle,
    /// Resolving and confining operands.
    Validating,
    /// All operands proven inside the jail.
    Confined,
    /// An operand was refused; nothing was executed.
    Rejected,
    /// The filesystem operation is running.
    Executing,
}

impl Phase {
    /// Returns `true` if `next` may follow `self`.
    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Confined)
                | (Validating, Rejected)
                | (Confined, Executing)
                | (Executing, Idle)
                | (Rejected, Idle)
        )
    }
}

// A command whose operands have all been confined.
#[derive(Debug)]
enum Plan {
    Help,
    List,
    Quit,
    ChangeDir {
        target: ConfinedPath,
        operand: String,
    },
    MakeDir {
        target: ConfinedPath,
        operand: String,
    },
    RemoveDir {
        entry: ConfinedEntry,
        operand: String,
    },
    Rename {
        from: ConfinedEntry,
        to: ConfinedEntry,
        operands: (String, String),
    },
    Link {
        original: ConfinedEntry,
        link: ConfinedEntry,
        operands: (String, String),
    },
    RemoveFile {
        entry: ConfinedEntry,
        operand: String,
    },
}

/// SUMMARY:
/// One interactive session: the jail, the session directory, and the dispatcher phase.
#[derive(Debug)]
pub struct Shell {
    jail: JailRoot,
    session: SessionState,
    phase: Phase,
}

impl Shell {
    /// Start a shell at the jail root.
    pub fn new(jail: JailRoot) -> Self {
        let session = SessionState::new(&jail);
        Self {
            jail,
            session,
            phase: Phase::Idle,
        }
    }

    #[inline]
    pub fn jail(&self) -> &JailRoot {
        &self.jail
    }

    #[inline]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// `"<session dir relative to the jail> $ "`
    pub fn prompt(&self) -> String {
        format!("{} $ ", self.session.relative_display())
    }

    /// Re-prove the session directory before the next command.
    pub fn recover(&mut self) -> Recovery {
        self.session.recover()
    }

    /// SUMMARY:
    /// Validate and run one command, writing its output (or its one-line failure) to `out`.
    ///
    /// ERRORS:
    /// - `io::Error`: Writing to `out` failed. Command failures are reported on `out` and are
    ///   not errors here.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> io::Result<Flow> {
        self.advance(Phase::Validating);
        let plan = match self.validate(command) {
            Ok(plan) => {
                self.advance(Phase::Confined);
                plan
            }
            Err(err) => {
                self.advance(Phase::Rejected);
                tracing::debug!(error = %err, "command rejected");
                self.advance(Phase::Idle);
                writeln!(out, "{}", err.user_message())?;
                return Ok(Flow::Continue);
            }
        };

        let flow = match plan {
            Plan::Quit => Flow::Quit,
            _ => Flow::Continue,
        };

        self.advance(Phase::Executing);
        let outcome = self.apply(plan);
        self.advance(Phase::Idle);

        match outcome {
            Ok(lines) => {
                for line in lines {
                    writeln!(out, "{line}")?;
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "command failed");
                writeln!(out, "{}", err.user_message())?;
            }
        }
        Ok(flow)
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal phase transition {:?} -> {next:?}",
            self.phase
        );
        if !self.phase.can_advance_to(next) {
            tracing::error!(from = ?self.phase, to = ?next, "illegal phase transition");
        }
        tracing::trace!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }

    fn validate(&self, command: Command) -> Result<Plan, ShellError> {
        match command {
            Command::Help => Ok(Plan::Help),
            Command::Ls => Ok(Plan::List),
            Command::Quit => Ok(Plan::Quit),
            Command::Unknown(word) => Err(ShellError::UnknownCommand { word }),
            Command::Cd(None) => Ok(Plan::ChangeDir {
                target: self.jail.root_path(),
                operand: "/".to_string(),
            }),
            Command::Cd(Some(operand)) => Ok(Plan::ChangeDir {
                target: self.confine("cd", &operand)?,
                operand,
            }),
            Command::Mkdir(operand) => {
                let operand = required("mkdir", operand, "argument")?;
                Ok(Plan::MakeDir {
                    target: self.confine("mkdir", &operand)?,
                    operand,
                })
            }
            Command::Rmdir(operand) => {
                let operand = required("rmdir", operand, "argument")?;
                Ok(Plan::RemoveDir {
                    entry: self.confine_entry("rmdir", &operand)?,
                    operand,
                })
            }
            Command::Rename { source, target } => {
                let (source, target) =
                    both("rename", source, target, "source or target argument")?;
                Ok(Plan::Rename {
                    from: self.confine_entry("rename", &source)?,
                    to: self.confine_entry("rename", &target)?,
                    operands: (source, target),
                })
            }
            Command::Ln { original, new } => {
                let (original, new) = both("ln", original, new, "original or new link argument")?;
                Ok(Plan::Link {
                    original: self.confine_entry("ln", &original)?,
                    link: self.confine_entry("ln", &new)?,
                    operands: (original, new),
                })
            }
            Command::Rm(operand) => {
                let operand = required("rm", operand, "argument")?;
                Ok(Plan::RemoveFile {
                    entry: self.confine_entry("rm", &operand)?,
                    operand,
                })
            }
        }
    }

    fn confine(&self, command: &'static str, operand: &str) -> Result<ConfinedPath, ShellError> {
        resolve(&self.jail, &self.session, operand)
            .and_then(|candidate| self.jail.confine(candidate))
            .map_err(|e| ShellError::path(command, operand, e))
    }

    fn confine_entry(
        &self,
        command: &'static str,
        operand: &str,
    ) -> Result<ConfinedEntry, ShellError> {
        resolve(&self.jail, &self.session, operand)
            .and_then(|candidate| self.jail.confine_entry(candidate))
            .map_err(|e| ShellError::path(command, operand, e))
    }

    fn apply(&mut self, plan: Plan) -> Result<Vec<String>, ShellError> {
        match plan {
            Plan::Help => Ok(HELP.lines().map(str::to_owned).collect()),
            Plan::Quit => Ok(Vec::new()),
            Plan::List => listing::render(self.session.cwd()).map_err(|source| ShellError::Io {
                command: "ls",
                operand: self.session.relative_display(),
                source,
            }),
            Plan::ChangeDir { target, operand } => {
                self.session
                    .change_dir(target)
                    .map_err(|e| ShellError::path("cd", operand, e))?;
                Ok(Vec::new())
            }
            Plan::MakeDir { target, operand } => {
                target
                    .create_dir_all(DIR_MODE)
                    .map_err(|e| ShellError::path("mkdir", operand, e))?;
                Ok(Vec::new())
            }
            Plan::RemoveDir { entry, operand } => {
                entry
                    .remove_dir()
                    .map_err(|e| ShellError::path("rmdir", operand, e))?;
                Ok(Vec::new())
            }
            Plan::Rename { from, to, operands } => {
                from.rename_to(&to)
                    .map_err(|e| ShellError::path("rename", pair(&operands), e))?;
                Ok(Vec::new())
            }
            Plan::Link {
                original,
                link,
                operands,
            } => {
                original
                    .hard_link_to(&link)
                    .map_err(|e| ShellError::path("ln", pair(&operands), e))?;
                let (original, new) = operands;
                Ok(vec![format!("Hard link created: {new} -> {original}")])
            }
            Plan::RemoveFile { entry, operand } => {
                entry
                    .remove_file()
                    .map_err(|e| ShellError::path("rm", operand.as_str(), e))?;
                Ok(vec![format!("File removed: {operand}")])
            }
        }
    }
}

fn required(
    command: &'static str,
    operand: Option<String>,
    what: &'static str,
) -> Result<String, ShellError> {
    operand.ok_or(ShellError::MissingArgument { command, what })
}

fn both(
    command: &'static str,
    first: Option<String>,
    second: Option<String>,
    what: &'static str,
) -> Result<(String, String), ShellError> {
    match (first, second) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => Err(ShellError::MissingArgument { command, what }),
    }
}

fn pair((first, second): &(String, String)) -> String {
    format!("{first} -> {second}")
}
