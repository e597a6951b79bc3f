use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::liveness::Liveness;
use super::types::{RunOutcome, RunnerStartArgs, Signal};

/// A spawned child with piped stdio. Each pipe can be taken once.
#[async_trait]
pub trait RunnerSession: Send {
    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>>;
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    fn pid(&self) -> Option<u32>;
    fn liveness(&self) -> Liveness;

    fn is_running(&self) -> bool {
        self.liveness().is_running()
    }

    /// Signalling a child that already exited is not an error.
    async fn signal(&mut self, signal: Signal) -> anyhow::Result<()>;
    async fn wait(&mut self) -> anyhow::Result<RunOutcome>;
}

#[async_trait]
pub trait RunnerPlugin: Send + Sync {
    fn name(&self) -> &str;
    async fn start_session(&self, args: &RunnerStartArgs)
        -> anyhow::Result<Box<dyn RunnerSession>>;
}
