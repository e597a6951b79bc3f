//! Wires the co-located files, the launcher and the relay session together.
use std::ffi::OsString;
use std::time::Duration;

use logpipe_core::config::{self, AppConfig, InterruptPolicy, WrapperPaths};
use logpipe_core::error::{CliError, RunnerError};
use logpipe_core::runner::exit::exit_code_for;
use logpipe_core::runner::{
    run_session, ParentStdio, RunSessionArgs, RunnerPlugin, RunnerStartArgs,
};
use logpipe_core::transcript::{start_transcript, TranscriptTx};
use logpipe_plugins::runner::ProcessRunnerPlugin;
use tokio::sync::mpsc;

const TRANSCRIPT_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Runs one session and returns the wrapper's exit code.
pub async fn run_app(
    paths: &WrapperPaths,
    cfg: &AppConfig,
    args: Vec<OsString>,
) -> Result<i32, CliError> {
    let writer = start_transcript(&paths.transcript)?;
    let transcript = writer.sender();

    let res = run_with_transcript(paths, cfg, args, &transcript).await;
    if let Err(e) = &res {
        tracing::error!(error = %e, "session failed");
        transcript.session(format!("session failed: {e}"));
    }

    drop(transcript);
    writer.close(TRANSCRIPT_CLOSE_GRACE).await;
    res
}

async fn run_with_transcript(
    paths: &WrapperPaths,
    cfg: &AppConfig,
    args: Vec<OsString>,
    transcript: &TranscriptTx,
) -> Result<i32, CliError> {
    let cmd = config::read_command(&paths.command)?;
    let start = RunnerStartArgs { cmd, args };

    let plugin = ProcessRunnerPlugin::new();
    let session = plugin
        .start_session(&start)
        .await
        .map_err(|e| RunnerError::Spawn(format!("{e:#}")))?;
    tracing::info!(plugin = plugin.name(), pid = ?session.pid(), "session started");
    transcript.session(match session.pid() {
        Some(pid) => format!("started {} (pid {pid})", start.cmd),
        None => format!("started {}", start.cmd),
    });

    let interrupts = spawn_interrupt_listener(cfg.relay.interrupt);

    let result = run_session(RunSessionArgs {
        session,
        parent: ParentStdio::inherit(),
        transcript: transcript.clone(),
        relay: &cfg.relay,
        interrupts,
    })
    .await?;

    tracing::info!(
        end = ?result.end,
        duration_ms = result.duration_ms,
        killed = result.killed,
        "session finished"
    );
    Ok(exit_code_for(&result, cfg.relay.exit_status))
}

/// Installs the Ctrl-C handling the policy asks for. Only `Forward` yields a
/// receiver for the session to deliver to the child.
pub fn spawn_interrupt_listener(policy: InterruptPolicy) -> Option<mpsc::Receiver<()>> {
    match policy {
        InterruptPolicy::Default => None,
        InterruptPolicy::Ignore => {
            tokio::spawn(async {
                while tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupt ignored");
                }
            });
            None
        }
        InterruptPolicy::Forward => {
            let (tx, rx) = mpsc::channel(8);
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if tx.send(()).await.is_err() {
                        break;
                    }
                }
            });
            Some(rx)
        }
    }
}
