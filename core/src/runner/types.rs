use std::ffi::OsString;
use std::fmt;

/// One of the three relayed pipes. Its name is the transcript tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Stdin,
    Stdout,
    Stderr,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Stdin => "stdin",
            Direction::Stdout => "stdout",
            Direction::Stderr => "stderr",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Term,
    Kill,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: Option<i32>,
    /// Terminating signal, when the platform reports one.
    pub signal: Option<i32>,
}

impl RunOutcome {
    pub fn describe(&self) -> String {
        match (self.exit_code, self.signal) {
            (Some(code), _) => format!("exited with code {code}"),
            (None, Some(sig)) => format!("killed by signal {sig}"),
            (None, None) => "exited".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerStartArgs {
    pub cmd: String,
    /// Passed through verbatim after the command.
    pub args: Vec<OsString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// Source reached end of stream.
    Eof,
    /// Child exited and the source had nothing more buffered.
    ChildExited,
    /// Read or write failed; the error was logged.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub direction: Direction,
    pub bytes: u64,
    pub end: RelayEnd,
}

/// Why the stdin relay, and with it the session, ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    StdinClosed,
    ChildExited,
    StdinFailed,
}

impl From<RelayEnd> for SessionEnd {
    fn from(end: RelayEnd) -> Self {
        match end {
            RelayEnd::Eof => SessionEnd::StdinClosed,
            RelayEnd::ChildExited => SessionEnd::ChildExited,
            RelayEnd::Failed => SessionEnd::StdinFailed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerResult {
    /// None when the child was not seen to exit within the grace period.
    pub outcome: Option<RunOutcome>,
    pub end: SessionEnd,
    pub duration_ms: u64,
    pub stdin: RelayStats,
    /// None when the relay had to be aborted.
    pub stdout: Option<RelayStats>,
    pub stderr: Option<RelayStats>,
    /// The child ignored the terminate request and was killed.
    pub killed: bool,
}
