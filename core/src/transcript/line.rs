use crate::runner::Direction;

use super::writer::TranscriptTx;

/// Bytes of the current, not yet terminated line.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    buf: Vec<u8>,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one byte. On `\n` returns the completed line, lossily decoded
    /// with trailing whitespace trimmed, and starts a new one.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        self.buf.push(byte);
        if byte != b'\n' {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buf).trim_end().to_string();
        self.buf.clear();
        Some(line)
    }

    #[cfg(test)]
    fn pending(&self) -> &[u8] {
        &self.buf
    }
}

/// Line-buffered transcript logging for one direction.
///
/// Owned by exactly one relay; only complete lines are recorded.
#[derive(Debug)]
pub struct LineLogger {
    direction: Direction,
    acc: LineAccumulator,
    tx: TranscriptTx,
}

impl LineLogger {
    pub fn new(direction: Direction, tx: TranscriptTx) -> Self {
        Self {
            direction,
            acc: LineAccumulator::new(),
            tx,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn record(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if let Some(line) = self.acc.push(b) {
                self.tx.send(self.direction.as_str(), line);
            }
        }
    }

    /// Records a relay event (not stream content) under this direction's tag.
    pub fn note(&self, text: impl Into<String>) {
        self.tx.send(self.direction.as_str(), text);
    }

    #[cfg(test)]
    fn pending(&self) -> &[u8] {
        self.acc.pending()
    }
}
