//! SUMMARY:
//! Errors a single shell command can end with. None of them is fatal: the dispatcher prints
//! `user_message()` and the loop continues.
use jail_path::JailError;
use std::io;

/// SUMMARY:
/// Why a command did not complete.
///
/// DETAILS:
/// `Display` may include host paths and is meant for logs. `user_message()` renders the
/// one-line text shown at the prompt, built from what the user typed and the failure
/// reason only, so the jail root location never leaks.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("{command}: missing {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("{word}: unknown command")]
    UnknownCommand { word: String },

    #[error("{command}: {operand}: {source}")]
    Path {
        command: &'static str,
        operand: String,
        #[source]
        source: JailError,
    },

    #[error("{command}: {operand}: {source}")]
    Io {
        command: &'static str,
        operand: String,
        #[source]
        source: io::Error,
    },
}

impl ShellError {
    #[inline]
    pub(crate) fn path(command: &'static str, operand: impl Into<String>, source: JailError) -> Self {
        Self::Path {
            command,
            operand: operand.into(),
            source,
        }
    }

    /// SUMMARY:
    /// Render the message shown to the user: `<cmd>: <operand>: <reason>`.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingArgument { command, what } => format!("{command}: missing {what}"),
            Self::UnknownCommand { word } => format!("{word}: unknown command (try 'help')"),
            Self::Path {
                command,
                operand,
                source,
            } => format!("{command}: {operand}: {}", jail_reason(source)),
            Self::Io {
                command,
                operand,
                source,
            } => format!("{command}: {operand}: {}", io_reason(source)),
        }
    }

    /// Returns `true` when the command was refused for reaching outside the jail.
    pub fn is_not_confined(&self) -> bool {
        matches!(self, Self::Path { source, .. } if source.is_not_confined())
    }
}

/// Failure reason for a `JailError`, without any host path.
pub fn jail_reason(err: &JailError) -> String {
    match err {
        JailError::PathTooLong { length, limit } => {
            format!("path too long ({length} bytes, limit {limit})")
        }
        JailError::InvalidPath { reason, .. } => (*reason).to_string(),
        JailError::NotConfined { .. } => "Permission denied: outside the jail".to_string(),
        JailError::InvalidRoot { source, .. }
        | JailError::Resolution { source, .. }
        | JailError::Io { source, .. } => io_reason(source),
    }
}

/// Failure reason for an OS error: the text without the `(os error N)` suffix.
pub fn io_reason(err: &io::Error) -> String {
    let text = err.to_string();
    match text.find(" (os error") {
        Some(end) => text[..end].to_string(),
        None => text,
    }
}
