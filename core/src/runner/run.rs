use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::RelayConfig;
use crate::error::RunnerError;
use crate::transcript::{LineLogger, TranscriptTx};

use super::abort::Terminator;
use super::io_pump::{relay, spawn_relay};
use super::liveness::Liveness;
use super::traits::RunnerSession;
use super::types::{Direction, RelayStats, RunOutcome, RunnerResult, SessionEnd, Signal};

/// The wrapper's own standard streams.
pub struct ParentStdio {
    pub stdin: Box<dyn AsyncRead + Unpin + Send>,
    pub stdout: Box<dyn AsyncWrite + Unpin + Send>,
    pub stderr: Box<dyn AsyncWrite + Unpin + Send>,
}

impl ParentStdio {
    pub fn inherit() -> Self {
        Self {
            stdin: Box::new(tokio::io::stdin()),
            stdout: Box::new(tokio::io::stdout()),
            stderr: Box::new(tokio::io::stderr()),
        }
    }
}

pub struct RunSessionArgs<'a> {
    pub session: Box<dyn RunnerSession>,
    pub parent: ParentStdio,
    pub transcript: TranscriptTx,
    pub relay: &'a RelayConfig,
    /// Interrupts to deliver to the child while the session runs.
    pub interrupts: Option<mpsc::Receiver<()>>,
}

/// Relays the child's stdio until the parent's stdin ends or the child exits,
/// then tears the session down.
///
/// stdout and stderr are relayed on background tasks; stdin is relayed on
/// the calling task and its end is the only trigger for teardown. Teardown
/// sends one terminate request, waits for the child (escalating to a kill if
/// configured), and gives the output relays `drain_grace_ms` to finish.
pub async fn run_session(args: RunSessionArgs<'_>) -> Result<RunnerResult, RunnerError> {
    let RunSessionArgs {
        mut session,
        parent,
        transcript,
        relay: cfg,
        mut interrupts,
    } = args;

    let started = Instant::now();
    let chunk = cfg.read_chunk();
    let liveness = session.liveness();

    let child_in = session
        .stdin()
        .ok_or_else(|| RunnerError::Spawn("child stdin is not piped".into()))?;
    let child_out = session
        .stdout()
        .ok_or_else(|| RunnerError::Spawn("child stdout is not piped".into()))?;
    let child_err = session
        .stderr()
        .ok_or_else(|| RunnerError::Spawn("child stderr is not piped".into()))?;

    let stdout_task = spawn_relay(
        child_out,
        parent.stdout,
        LineLogger::new(Direction::Stdout, transcript.clone()),
        liveness.clone(),
        chunk,
    );
    let stderr_task = spawn_relay(
        child_err,
        parent.stderr,
        LineLogger::new(Direction::Stderr, transcript.clone()),
        liveness.clone(),
        chunk,
    );

    let stdin_relay = relay(
        parent.stdin,
        child_in,
        LineLogger::new(Direction::Stdin, transcript.clone()),
        liveness.clone(),
        chunk,
    );
    tokio::pin!(stdin_relay);

    let stdin = loop {
        tokio::select! {
            stats = &mut stdin_relay => break stats,
            got = next_interrupt(&mut interrupts) => match got {
                Some(()) => {
                    tracing::info!(pid = ?session.pid(), "forwarding interrupt");
                    transcript.session("interrupt forwarded");
                    if let Err(e) = session.signal(Signal::Interrupt).await {
                        tracing::warn!(error = %e, "interrupt forward failed");
                    }
                }
                None => interrupts = None,
            },
        }
    };

    let end = SessionEnd::from(stdin.end);
    tracing::info!(end = ?end, stdin_bytes = stdin.bytes, "stdin relay ended");

    let mut terminator = Terminator::new();
    terminator.request(session.as_mut(), &transcript).await;

    let (outcome, killed) = await_exit(session.as_mut(), &liveness, cfg, &transcript).await;

    let grace = cfg.drain_grace();
    let (stdout, stderr) = tokio::join!(
        join_relay(stdout_task, Direction::Stdout, grace),
        join_relay(stderr_task, Direction::Stderr, grace),
    );

    Ok(RunnerResult {
        outcome,
        end,
        duration_ms: started.elapsed().as_millis() as u64,
        stdin,
        stdout,
        stderr,
        killed,
    })
}

async fn next_interrupt(rx: &mut Option<mpsc::Receiver<()>>) -> Option<()> {
    match rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn await_exit(
    session: &mut dyn RunnerSession,
    liveness: &Liveness,
    cfg: &RelayConfig,
    transcript: &TranscriptTx,
) -> (Option<RunOutcome>, bool) {
    let grace = cfg.terminate_grace();
    let mut killed = false;

    if tokio::time::timeout(grace, liveness.exited()).await.is_err() {
        if !cfg.kill_on_timeout {
            tracing::warn!(pid = ?session.pid(), "child still running after {:?}, leaving it", grace);
            transcript.session("child still running, not waiting");
            return (None, false);
        }

        tracing::warn!(pid = ?session.pid(), "child ignored terminate for {:?}, killing", grace);
        transcript.session("terminate grace elapsed, killing child");
        if let Err(e) = session.signal(Signal::Kill).await {
            tracing::warn!(error = %e, "kill failed");
        }
        killed = true;

        if tokio::time::timeout(grace, liveness.exited()).await.is_err() {
            tracing::error!(pid = ?session.pid(), "child did not exit after kill");
            return (None, killed);
        }
    }

    match session.wait().await {
        Ok(outcome) => {
            tracing::info!(exit_code = ?outcome.exit_code, signal = ?outcome.signal, "child exited");
            transcript.session(format!("child {}", outcome.describe()));
            (Some(outcome), killed)
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not collect child exit status");
            (None, killed)
        }
    }
}

async fn join_relay(
    mut task: JoinHandle<RelayStats>,
    direction: Direction,
    grace: Duration,
) -> Option<RelayStats> {
    match tokio::time::timeout(grace, &mut task).await {
        Ok(Ok(stats)) => Some(stats),
        Ok(Err(e)) => {
            tracing::error!(stream = %direction, error = %e, "relay task failed");
            None
        }
        Err(_) => {
            tracing::debug!(stream = %direction, "relay still blocked after {:?}, aborting", grace);
            task.abort();
            let _ = task.await;
            None
        }
    }
}
