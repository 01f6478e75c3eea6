//! Split one input line into a command and its arguments.

/// Command table printed by `help`.
pub const HELP: &str = "\
Available commands:
help                : Show this help message
cd <path>           : Change directory
mkdir <path>        : Create a directory
rmdir <path>        : Remove a directory
rename <source> <target> : Rename a file or directory
ln <original> <new> : Create a hard link
rm <file>           : Remove a file
ls                  : List current directory contents
quit                : Exit the shell
";

/// SUMMARY:
/// One parsed input line. Path arguments stay `None` when the user left them out; the
/// dispatcher decides whether that is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Cd(Option<String>),
    Mkdir(Option<String>),
    Rmdir(Option<String>),
    Rename {
        source: Option<String>,
        target: Option<String>,
    },
    Ln {
        original: Option<String>,
        new: Option<String>,
    },
    Rm(Option<String>),
    Ls,
    Quit,
    Unknown(String),
}

impl Command {
    /// The command word as typed for known commands.
    pub fn name(&self) -> &str {
        match self {
            Self::Help => "help",
            Self::Cd(_) => "cd",
            Self::Mkdir(_) => "mkdir",
            Self::Rmdir(_) => "rmdir",
            Self::Rename { .. } => "rename",
            Self::Ln { .. } => "ln",
            Self::Rm(_) => "rm",
            Self::Ls => "ls",
            Self::Quit => "quit",
            Self::Unknown(word) => word,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Self::Cd(_) | Self::Mkdir(_) | Self::Rmdir(_) | Self::Rm(_) => 1,
            Self::Rename { .. } | Self::Ln { .. } => 2,
            _ => 0,
        }
    }
}

/// SUMMARY:
/// Parse a line into a `Command`, splitting on whitespace.
///
/// DETAILS:
/// Returns `None` for a blank line. `exit` is an alias of `quit`. Arguments beyond the ones
/// a command uses are ignored.
pub fn parse(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let word = words.next()?;
    let mut arg = || words.next().map(str::to_owned);

    let command = match word {
        "help" => Command::Help,
        "cd" => Command::Cd(arg()),
        "mkdir" => Command::Mkdir(arg()),
        "rmdir" => Command::Rmdir(arg()),
        "rename" => Command::Rename {
            source: arg(),
            target: arg(),
        },
        "ln" => Command::Ln {
            original: arg(),
            new: arg(),
        },
        "rm" => Command::Rm(arg()),
        "ls" => Command::Ls,
        "quit" | "exit" => Command::Quit,
        other => return Some(Command::Unknown(other.to_owned())),
    };

    let extra = words.count();
    if extra > 0 {
        tracing::debug!(command = command.name(), used = command.arity(), extra, "ignoring extra arguments");
    }
    Some(command)
}
