//! Operator interaction: coloured, indented messages and yes/no questions.
//!
//! Everything the repair engine wants to tell or ask the operator goes
//! through the [`Interaction`] trait so tests can substitute a scripted
//! responder. [`ConsoleTerminal`] is the production implementation, reading
//! answers from stdin.
//!
//! Indentation mirrors the library depth: artist (0), album (1), song (2).

mod log;

pub use log::RunLog;

use std::io::{BufRead, Write};

/// Upper bound on operator-driven retry loops.
///
/// Retries are always explicit ("Retry? (Y/n)"), but a closed stdin answers
/// yes forever, so every loop gives up after this many passes.
pub const MAX_ATTEMPTS: usize = 10;

const ANSI_RESET: &str = "\u{1b}[0m";
const ANSI_RED: &str = "\u{1b}[31m";
const ANSI_GREEN: &str = "\u{1b}[32m";
const ANSI_YELLOW: &str = "\u{1b}[33m";
const ANSI_BLUE: &str = "\u{1b}[34m";

/// Kind of message shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Plain progress output (artist and album headers)
    Info,
    /// Something is wrong but nothing was changed (yellow)
    Warning,
    /// An operation failed (red)
    Error,
    /// A change was applied or an album passed (green)
    Confirmation,
}

/// The operator-facing side of a run.
pub trait Interaction {
    /// Show a message at the given indent level.
    fn notify(&mut self, level: Level, message: &str, indent: usize);

    /// Ask a yes/no question (blue). Anything but `n`/`N` is a yes.
    fn ask_yes_no(&mut self, prompt: &str, indent: usize) -> bool;

    fn info(&mut self, message: &str, indent: usize) {
        self.notify(Level::Info, message, indent);
    }

    fn warn(&mut self, message: &str, indent: usize) {
        self.notify(Level::Warning, message, indent);
    }

    fn error(&mut self, message: &str, indent: usize) {
        self.notify(Level::Error, message, indent);
    }

    fn confirm(&mut self, message: &str, indent: usize) {
        self.notify(Level::Confirmation, message, indent);
    }

    /// Ask whether the failed check should run again.
    fn ask_to_retry(&mut self, indent: usize) -> bool {
        self.ask_yes_no("Retry? (Y/n)", indent)
    }

    /// Block until the operator acknowledges with a yes.
    fn ask_to_continue(&mut self, indent: usize) {
        for _ in 0..MAX_ATTEMPTS {
            if self.ask_yes_no("Continue? (Y/n)", indent) {
                return;
            }
        }
    }
}

/// Whether an operator answer counts as "yes".
///
/// Only a literal `n` (either case) declines; empty input accepts.
pub fn is_affirmative(answer: &str) -> bool {
    !answer.trim().eq_ignore_ascii_case("n")
}

/// Prefix `message` with one tab per indent level.
pub fn indented(message: &str, indent: usize) -> String {
    let mut out = "\t".repeat(indent);
    out.push_str(message);
    out
}

/// Terminal reading answers from `input` and printing to `output`.
///
/// When a [`RunLog`] is attached, every message except questions is
/// mirrored into it.
pub struct ConsoleTerminal<R, W> {
    input: R,
    output: W,
    log: Option<RunLog>,
}

impl ConsoleTerminal<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Terminal bound to the process's stdin/stdout.
    pub fn stdio(log: Option<RunLog>) -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout(), log)
    }
}

impl<R: BufRead, W: Write> ConsoleTerminal<R, W> {
    pub fn new(input: R, output: W, log: Option<RunLog>) -> Self {
        Self { input, output, log }
    }

    /// The accumulated run log, if logging is enabled.
    pub fn log(&self) -> Option<&RunLog> {
        self.log.as_ref()
    }

    fn print(&mut self, colour: Option<&str>, line: &str) {
        let result = match colour {
            Some(code) => writeln!(self.output, "{code}{line}{ANSI_RESET}"),
            None => writeln!(self.output, "{line}"),
        };
        if let Err(e) = result.and_then(|_| self.output.flush()) {
            tracing::warn!(error = %e, "Failed to write to terminal");
        }
    }

    fn read_answer(&mut self) -> String {
        let mut answer = String::new();
        if let Err(e) = self.input.read_line(&mut answer) {
            tracing::warn!(error = %e, "Failed to read operator answer, assuming yes");
        }
        answer
    }
}

impl<R: BufRead, W: Write> Interaction for ConsoleTerminal<R, W> {
    fn notify(&mut self, level: Level, message: &str, indent: usize) {
        let line = indented(message, indent);
        let colour = match level {
            Level::Info => None,
            Level::Warning => Some(ANSI_YELLOW),
            Level::Error => Some(ANSI_RED),
            Level::Confirmation => Some(ANSI_GREEN),
        };
        self.print(colour, &line);
        if let Some(log) = self.log.as_mut() {
            log.append(&line);
        }
    }

    fn ask_yes_no(&mut self, prompt: &str, indent: usize) -> bool {
        let line = indented(prompt, indent);
        self.print(Some(ANSI_BLUE), &line);
        let answer = self.read_answer();
        is_affirmative(&answer)
    }
}
