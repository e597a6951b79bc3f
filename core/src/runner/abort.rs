use crate::transcript::TranscriptTx;

use super::traits::RunnerSession;
use super::types::Signal;

/// Issues the session's terminate request at most once.
#[derive(Debug, Default)]
pub struct Terminator {
    requested: bool,
}

impl Terminator {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn requested(&self) -> bool {
        self.requested
    }

    /// Sends `Signal::Term` the first time it is called; later calls are no-ops.
    /// Returns whether a request was sent by this call.
    pub async fn request(
        &mut self,
        session: &mut dyn RunnerSession,
        transcript: &TranscriptTx,
    ) -> bool {
        if self.requested {
            return false;
        }
        self.requested = true;

        let was_running = session.is_running();
        if let Err(e) = session.signal(Signal::Term).await {
            // child already gone
            tracing::debug!(error = %e, "terminate request failed");
        }
        tracing::info!(pid = ?session.pid(), was_running, "terminate requested");
        transcript.session("terminate requested");
        true
    }
}
