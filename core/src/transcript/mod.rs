//! Stream transcript: per-direction line loggers feeding one file writer.

mod line;
mod writer;

pub use line::{LineAccumulator, LineLogger};
pub use writer::{start_transcript, TranscriptRecord, TranscriptTx, TranscriptWriter, SESSION_TAG};
