use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::error::RunnerError;
use crate::transcript::LineLogger;

use super::liveness::Liveness;
use super::types::{RelayEnd, RelayStats};

/// Upper bound on bytes forwarded after the child has exited. Matches the
/// default pipe capacity, which bounds what a dead child can have left behind.
pub const EXIT_DRAIN_BUDGET: u64 = 64 * 1024;

pub fn spawn_relay<R, W>(
    rd: R,
    wr: W,
    logger: LineLogger,
    liveness: Liveness,
    chunk: usize,
) -> JoinHandle<RelayStats>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(relay(rd, wr, logger, liveness, chunk))
}

/// Forwards `rd` to `wr` in reads of at most `chunk` bytes, feeding every
/// forwarded byte to `logger` after it was written.
///
/// Stops at end of stream, on the first I/O error, or once the child has
/// exited and `rd` has nothing left that is immediately readable. After the
/// exit at most [`EXIT_DRAIN_BUDGET`] more bytes are forwarded, so a source
/// kept busy by a grandchild cannot hold the relay open.
pub async fn relay<R, W>(
    mut rd: R,
    mut wr: W,
    mut logger: LineLogger,
    liveness: Liveness,
    chunk: usize,
) -> RelayStats
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let direction = logger.direction();
    let label = direction.as_str();
    let mut buf = vec![0u8; chunk.max(1)];
    let mut total = 0u64;
    let mut after_exit = 0u64;

    let res: Result<RelayEnd, RunnerError> = loop {
        if after_exit >= EXIT_DRAIN_BUDGET {
            tracing::debug!(stream = label, bytes = after_exit, "drain budget spent");
            break Ok(RelayEnd::ChildExited);
        }
        let read = tokio::select! {
            biased;
            r = rd.read(&mut buf) => r,
            _ = liveness.exited() => break Ok(RelayEnd::ChildExited),
        };
        let n = match read {
            Ok(n) => n,
            Err(e) => {
                break Err(RunnerError::StreamIo {
                    stream: label,
                    source: e,
                })
            }
        };
        if n == 0 {
            break Ok(RelayEnd::Eof);
        }

        if let Err(e) = forward(&mut wr, &buf[..n]).await {
            break Err(RunnerError::StreamIo {
                stream: label,
                source: e,
            });
        }
        total += n as u64;
        if !liveness.is_running() {
            after_exit += n as u64;
        }

        logger.record(&buf[..n]);
    };

    let end = match res {
        Ok(end) => end,
        Err(e) => {
            tracing::warn!(stream = label, error = %e, "relay failed");
            logger.note(format!("relay failed: {e}"));
            RelayEnd::Failed
        }
    };
    tracing::debug!(stream = label, bytes = total, end = ?end, "relay finished");

    RelayStats {
        direction,
        bytes: total,
        end,
    }
}

async fn forward<W>(wr: &mut W, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    wr.write_all(data).await?;
    wr.flush().await
}
