use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Tag for records about the session itself rather than a stream.
pub const SESSION_TAG: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRecord {
    pub at: DateTime<Local>,
    pub tag: String,
    pub text: String,
}

impl TranscriptRecord {
    pub fn now(tag: &str, text: impl Into<String>) -> Self {
        Self {
            at: Local::now(),
            tag: tag.to_string(),
            text: text.into(),
        }
    }

    /// `<HH:MM:SS>[<tag>] <text>`
    pub fn render(&self) -> String {
        format!("{}[{}] {}", self.at.format("%H:%M:%S"), self.tag, self.text)
    }
}

/// Sending half of the transcript. Cheap to clone; sends never block.
#[derive(Debug, Clone)]
pub struct TranscriptTx {
    tx: mpsc::UnboundedSender<TranscriptRecord>,
}

impl TranscriptTx {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TranscriptRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, tag: &str, text: impl Into<String>) {
        // writer gone: the record is dropped
        let _ = self.tx.send(TranscriptRecord::now(tag, text));
    }

    pub fn session(&self, text: impl Into<String>) {
        self.send(SESSION_TAG, text);
    }
}

/// Owns the transcript file; the only task that writes to it.
pub struct TranscriptWriter {
    tx: TranscriptTx,
    task: JoinHandle<()>,
}

impl TranscriptWriter {
    pub fn sender(&self) -> TranscriptTx {
        self.tx.clone()
    }

    /// Stops accepting records from this handle and waits for queued records
    /// to reach the file. Other live senders keep the writer open until
    /// `grace` elapses.
    pub async fn close(self, grace: Duration) {
        let Self { tx, mut task } = self;
        drop(tx);
        if tokio::time::timeout(grace, &mut task).await.is_err() {
            tracing::warn!("transcript writer still busy after {:?}, abandoning", grace);
            task.abort();
        }
    }
}

/// Opens `path` for appending (creating it if needed) and starts the writer task.
pub fn start_transcript(path: &Path) -> std::io::Result<TranscriptWriter> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let file = tokio::fs::File::from_std(file);

    let (tx, rx) = TranscriptTx::channel();
    let task = tokio::spawn(write_records(file, rx));

    Ok(TranscriptWriter { tx, task })
}

async fn write_records<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<TranscriptRecord>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(record) = rx.recv().await {
        let mut line = record.render();
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::error!(error.kind = "transcript.write", error.message = %e);
            return;
        }
        if let Err(e) = writer.flush().await {
            tracing::error!(error.kind = "transcript.flush", error.message = %e);
            return;
        }
    }
}
