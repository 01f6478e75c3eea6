//! The read/dispatch loop.
use crate::command;
use crate::dispatch::{Flow, Shell};
use jail_path::Recovery;
use std::io::{self, BufRead, Write};

/// SUMMARY:
/// Run the shell until `quit` or end of input.
///
/// DETAILS:
/// Each iteration first re-proves the session directory (resetting to the jail root if it
/// was removed or moved out of the jail), then prints the prompt, reads one line and
/// dispatches it. Input that is not valid UTF-8 is read lossily.
///
/// ERRORS:
/// - `io::Error`: Reading `input` or writing `out` failed.
pub fn run<R: BufRead, W: Write>(shell: &mut Shell, mut input: R, out: &mut W) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        if let Recovery::Reset { .. } = shell.recover() {
            writeln!(out, "working directory is gone or left the jail; back at /")?;
        }
        write!(out, "{}", shell.prompt())?;
        out.flush()?;

        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            writeln!(out)?;
            out.flush()?;
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buf);
        let Some(command) = command::parse(&line) else {
            continue;
        };
        let flow = shell.execute(command, out)?;
        out.flush()?;
        if flow == Flow::Quit {
            return Ok(());
        }
    }
}
