#![cfg(unix)]

use std::ffi::OsString;
use std::time::Duration;

use logpipe_core::config::{ExitStatusPolicy, RelayConfig};
use logpipe_core::runner::exit::exit_code_for;
use logpipe_core::runner::{
    run_session, ParentStdio, RunSessionArgs, RunnerPlugin, RunnerResult, RunnerStartArgs,
    SessionEnd, Signal,
};
use logpipe_core::transcript::{TranscriptRecord, TranscriptTx};
use logpipe_plugins::runner::ProcessRunnerPlugin;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc::UnboundedReceiver;

struct Run {
    parent_stdin: DuplexStream,
    parent_stdout: DuplexStream,
    parent_stderr: DuplexStream,
    records: UnboundedReceiver<TranscriptRecord>,
    session: tokio::task::JoinHandle<RunnerResult>,
}

fn relay_config() -> RelayConfig {
    RelayConfig {
        terminate_grace_ms: 2000,
        drain_grace_ms: 500,
        ..RelayConfig::default()
    }
}

fn start_args(cmd: &str, args: &[&str]) -> RunnerStartArgs {
    RunnerStartArgs {
        cmd: cmd.to_string(),
        args: args.iter().map(OsString::from).collect(),
    }
}

async fn launch(cmd: &str, args: &[&str], relay: RelayConfig) -> Run {
    let session = ProcessRunnerPlugin::new()
        .start_session(&start_args(cmd, args))
        .await
        .expect("spawn");

    let (parent_stdin, stdin_end) = tokio::io::duplex(4096);
    let (stdout_end, parent_stdout) = tokio::io::duplex(4096);
    let (stderr_end, parent_stderr) = tokio::io::duplex(4096);
    let (transcript, records) = TranscriptTx::channel();

    let session = tokio::spawn(async move {
        run_session(RunSessionArgs {
            session,
            parent: ParentStdio {
                stdin: Box::new(stdin_end),
                stdout: Box::new(stdout_end),
                stderr: Box::new(stderr_end),
            },
            transcript,
            relay: &relay,
            interrupts: None,
        })
        .await
        .expect("session")
    });

    Run {
        parent_stdin,
        parent_stdout,
        parent_stderr,
        records,
        session,
    }
}

async fn finish(session: tokio::task::JoinHandle<RunnerResult>) -> RunnerResult {
    tokio::time::timeout(Duration::from_secs(10), session)
        .await
        .expect("session should end")
        .unwrap()
}

async fn read_all(mut rd: DuplexStream) -> String {
    let mut out = Vec::new();
    rd.read_to_end(&mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

fn tagged(rx: &mut UnboundedReceiver<TranscriptRecord>, tag: &str) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(rec) = rx.try_recv() {
        if rec.tag == tag {
            out.push(rec.text);
        }
    }
    out
}

#[tokio::test]
async fn echo_output_is_relayed_and_logged() {
    let mut run = launch("echo", &["hello"], relay_config()).await;

    let result = finish(run.session).await;

    assert_eq!(read_all(run.parent_stdout).await, "hello\n");
    assert_eq!(tagged(&mut run.records, "stdout"), vec!["hello".to_string()]);
    assert_eq!(result.end, SessionEnd::ChildExited);
    assert_eq!(exit_code_for(&result, ExitStatusPolicy::Propagate), 0);
    drop(run.parent_stdin);
}

#[tokio::test]
async fn arguments_pass_through_verbatim() {
    let run = launch("printf", &["%s|", "a b", "--", "-x", ""], relay_config()).await;

    finish(run.session).await;

    assert_eq!(read_all(run.parent_stdout).await, "a b|--|-x||");
}

#[tokio::test]
async fn interactive_child_sees_stdin_until_it_closes() {
    let mut run = launch("cat", &[], relay_config()).await;

    run.parent_stdin.write_all(b"ping\n").await.unwrap();
    let mut echoed = [0u8; 5];
    run.parent_stdout.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"ping\n");

    drop(run.parent_stdin);
    let result = finish(run.session).await;

    assert_eq!(result.end, SessionEnd::StdinClosed);
    assert!(result.outcome.is_some());
    assert!(!result.killed);

    let mut lines = Vec::new();
    while let Ok(rec) = run.records.try_recv() {
        lines.push((rec.tag, rec.text));
    }
    assert!(lines.contains(&("stdin".to_string(), "ping".to_string())));
    assert!(lines.contains(&("stdout".to_string(), "ping".to_string())));
    assert!(lines.contains(&("session".to_string(), "terminate requested".to_string())));
}

#[tokio::test]
async fn immediately_closed_stdin_does_not_hang() {
    let run = launch("cat", &[], relay_config()).await;
    drop(run.parent_stdin);

    let result = finish(run.session).await;

    assert_eq!(result.end, SessionEnd::StdinClosed);
    assert_eq!(result.stdin.bytes, 0);
    assert!(result.outcome.is_some());
}

#[tokio::test]
async fn stderr_is_relayed_separately() {
    let mut run = launch("sh", &["-c", "echo out; echo err >&2"], relay_config()).await;

    finish(run.session).await;

    assert_eq!(read_all(run.parent_stdout).await, "out\n");
    assert_eq!(read_all(run.parent_stderr).await, "err\n");
    assert_eq!(tagged(&mut run.records, "stderr"), vec!["err".to_string()]);
}

#[tokio::test]
async fn exit_code_is_propagated() {
    let run = launch("sh", &["-c", "exit 7"], relay_config()).await;

    let result = finish(run.session).await;

    assert_eq!(exit_code_for(&result, ExitStatusPolicy::Propagate), 7);
    assert_eq!(exit_code_for(&result, ExitStatusPolicy::AlwaysZero), 0);
}

#[tokio::test]
async fn child_ignoring_terminate_is_killed() {
    let relay = RelayConfig {
        terminate_grace_ms: 200,
        drain_grace_ms: 200,
        ..RelayConfig::default()
    };
    let run = launch("sh", &["-c", "trap '' TERM; exec sleep 30"], relay).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(run.parent_stdin);

    let result = finish(run.session).await;

    assert!(result.killed);
    assert_eq!(exit_code_for(&result, ExitStatusPolicy::Propagate), 128 + 9);
}

#[tokio::test]
async fn missing_executable_fails_to_spawn() {
    let res = ProcessRunnerPlugin::new()
        .start_session(&start_args("/nonexistent/logpipe-test-binary", &[]))
        .await;

    assert!(res.is_err());
}

#[tokio::test]
async fn signalling_an_exited_child_is_benign() {
    let mut session = ProcessRunnerPlugin::new()
        .start_session(&start_args("true", &[]))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(10), session.liveness().exited())
        .await
        .expect("true should exit");

    assert!(!session.is_running());
    session.signal(Signal::Term).await.unwrap();
    session.signal(Signal::Kill).await.unwrap();
    let outcome = session.wait().await.unwrap();
    assert_eq!(outcome.exit_code, Some(0));
    // cached
    assert_eq!(session.wait().await.unwrap(), outcome);
}

#[tokio::test]
async fn interrupt_is_delivered_to_a_running_child() {
    let mut session = ProcessRunnerPlugin::new()
        .start_session(&start_args(
            "sh",
            &["-c", "trap 'exit 3' INT; echo ready; while :; do sleep 0.05; done"],
        ))
        .await
        .unwrap();
    let mut stdout = session.stdout().unwrap();

    let mut ready = [0u8; 6];
    stdout.read_exact(&mut ready).await.unwrap();
    assert_eq!(&ready, b"ready\n");

    session.signal(Signal::Interrupt).await.unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(10), session.wait())
        .await
        .expect("child should exit on interrupt")
        .unwrap();

    assert_eq!(outcome.exit_code, Some(3));
    assert!(!session.is_running());
    // reaped: later signals are dropped
    session.signal(Signal::Term).await.unwrap();
}
