use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub relay: RelayConfig,
}

/// Diagnostics for the wrapper itself. The transcript is configured separately
/// and is always written next to the executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr. Off by default because stderr carries the child's output.
    #[serde(default)]
    pub console: bool,

    /// If true, append to `<stem>.trace.log` under `directory` (beside the
    /// transcript if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "logpipe_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for the trace file.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: false,
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Bytes read per relay iteration. One byte keeps prompts without a
    /// trailing newline visible immediately.
    #[serde(default = "default_read_chunk")]
    pub read_chunk: usize,

    /// How long to wait for the child after the terminate request.
    #[serde(default = "default_terminate_grace_ms")]
    pub terminate_grace_ms: u64,

    /// Escalate to a hard kill if the child ignores the terminate request.
    #[serde(default = "default_kill_on_timeout")]
    pub kill_on_timeout: bool,

    /// How long the stdout/stderr relays may keep draining after teardown.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,

    #[serde(default)]
    pub interrupt: InterruptPolicy,

    #[serde(default)]
    pub exit_status: ExitStatusPolicy,
}

fn default_read_chunk() -> usize {
    1
}

fn default_terminate_grace_ms() -> u64 {
    3000
}

fn default_kill_on_timeout() -> bool {
    true
}

fn default_drain_grace_ms() -> u64 {
    500
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            read_chunk: default_read_chunk(),
            terminate_grace_ms: default_terminate_grace_ms(),
            kill_on_timeout: default_kill_on_timeout(),
            drain_grace_ms: default_drain_grace_ms(),
            interrupt: InterruptPolicy::default(),
            exit_status: ExitStatusPolicy::default(),
        }
    }
}

impl RelayConfig {
    pub fn read_chunk(&self) -> usize {
        self.read_chunk.max(1)
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}

/// What the wrapper does when it receives an interrupt (Ctrl-C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterruptPolicy {
    /// No handler is installed; the OS default applies to the wrapper.
    #[default]
    Default,
    /// The wrapper survives and delivers the interrupt to the child.
    Forward,
    /// The wrapper survives and drops the interrupt.
    Ignore,
}

impl FromStr for InterruptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "forward" => Ok(Self::Forward),
            "ignore" => Ok(Self::Ignore),
            other => Err(format!("unknown interrupt policy: {other}")),
        }
    }
}

/// How the wrapper's own exit status is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitStatusPolicy {
    /// Exit with the child's code, `128 + signal` if it was killed, `1` if unknown.
    #[default]
    Propagate,
    AlwaysZero,
}

impl FromStr for ExitStatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(Self::Propagate),
            "always-zero" | "always_zero" | "zero" => Ok(Self::AlwaysZero),
            other => Err(format!("unknown exit status policy: {other}")),
        }
    }
}
