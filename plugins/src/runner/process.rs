use super::{
    Liveness, LivenessSignal, RunOutcome, RunnerPlugin, RunnerSession, RunnerStartArgs, Signal,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawns the child as a regular process with three pipes.
pub struct ProcessRunnerPlugin {}

impl ProcessRunnerPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ProcessRunnerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunnerPlugin for ProcessRunnerPlugin {
    fn name(&self) -> &str {
        "process"
    }

    async fn start_session(&self, args: &RunnerStartArgs) -> Result<Box<dyn RunnerSession>> {
        let mut child = Command::new(&args.cmd)
            .args(&args.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to launch {}", args.cmd))?;

        let pid = child.id();
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (alive, liveness) = LivenessSignal::channel();
        let (signal_tx, signal_rx) = mpsc::channel(4);
        let reaper = tokio::spawn(reap(child, alive, signal_rx));

        tracing::info!(pid = ?pid, cmd = %args.cmd, argc = args.args.len(), "child spawned");

        Ok(Box::new(ProcessRunnerSession {
            pid,
            stdin,
            stdout,
            stderr,
            liveness,
            signal_tx,
            reaper: Some(reaper),
            outcome: None,
        }))
    }
}

/// Owns the child until it exits, then flips liveness.
///
/// Signals are delivered from here, while the child is not yet reaped, so its
/// pid cannot have been reused by the time `kill(2)` runs.
async fn reap(
    mut child: Child,
    alive: LivenessSignal,
    mut signals: mpsc::Receiver<Signal>,
) -> std::io::Result<ExitStatus> {
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(signal) = signals.recv() => {
                if let Err(e) = deliver(&mut child, signal) {
                    tracing::warn!(?signal, error = %e, "signal delivery failed");
                }
            }
        }
    };
    alive.mark_exited();
    status
}

fn deliver(child: &mut Child, signal: Signal) -> std::io::Result<()> {
    match signal {
        Signal::Kill => child.start_kill(),
        #[cfg(unix)]
        Signal::Term => send_unix_signal(child, libc::SIGTERM),
        #[cfg(unix)]
        Signal::Interrupt => send_unix_signal(child, libc::SIGINT),
        #[cfg(not(unix))]
        Signal::Term => child.start_kill(),
        #[cfg(not(unix))]
        Signal::Interrupt => {
            tracing::warn!("interrupt forwarding is not supported on this platform");
            Ok(())
        }
    }
}

#[cfg(unix)]
fn send_unix_signal(child: &Child, sig: libc::c_int) -> std::io::Result<()> {
    // id() is None once the child has been reaped
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let ret = unsafe { libc::kill(pid as i32, sig) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        // exited, not yet reaped
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

struct ProcessRunnerSession {
    pid: Option<u32>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    liveness: Liveness,
    signal_tx: mpsc::Sender<Signal>,
    reaper: Option<JoinHandle<std::io::Result<ExitStatus>>>,
    outcome: Option<RunOutcome>,
}

#[async_trait]
impl RunnerSession for ProcessRunnerSession {
    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>> {
        self.stdin
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncWrite + Unpin + Send>)
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    async fn signal(&mut self, signal: Signal) -> Result<()> {
        if !self.liveness.is_running() {
            return Ok(());
        }
        // a closed channel means the reaper already collected the child
        if self.signal_tx.send(signal).await.is_err() {
            tracing::debug!(?signal, "child already reaped, signal dropped");
        }
        Ok(())
    }

    async fn wait(&mut self) -> Result<RunOutcome> {
        if let Some(outcome) = &self.outcome {
            return Ok(outcome.clone());
        }
        let reaper = self.reaper.as_mut().context("child status already lost")?;
        let status = reaper.await.context("reaper task failed")??;
        self.reaper = None;

        let outcome = outcome_from(status);
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }
}

fn outcome_from(status: ExitStatus) -> RunOutcome {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    RunOutcome {
        exit_code: status.code(),
        signal,
    }
}
