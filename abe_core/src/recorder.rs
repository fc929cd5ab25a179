use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::{padding_len, BLOCK_SIZE};

/// Block-unit location of the most recent write relative to the start of
/// the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    /// Index of the block where the write started.
    pub start_block: usize,
    /// Number of blocks the write occupied.
    pub block_count: usize,
}

/// Returned (wrapped in an [`io::Error`] of kind `InvalidInput`) when a
/// write is not a whole number of blocks.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("data is not aligned to block size")]
pub struct AlignmentError;

/// A byte sink that reports where its last successful write landed, in
/// block units.
pub trait RecordingWrite: Write {
    /// Position of the most recent successful write. Replaced on every
    /// successful write; `None` until the first one.
    fn last_write(&self) -> Option<PositionInfo>;
}

/// Instrumented wrapper around an arbitrary writer.
///
/// # Write contract
/// Only byte slices whose length is an exact multiple of `block_size` are
/// accepted; anything else returns an [`AlignmentError`] without touching
/// the underlying writer. A fully accepted write records its position; a
/// short write by the underlying writer is passed through unrecorded.
///
/// The recorder knows nothing about sections or codecs — it is the sole
/// mechanism callers use to learn where each encoded section landed.
pub struct PositionRecorder<W: Write> {
    inner: W,
    block_size: usize,
    last_write: Option<PositionInfo>,
}

impl<W: Write> PositionRecorder<W> {
    /// Wrap `inner`, tracking positions in units of `block_size` bytes.
    ///
    /// # Panics
    /// Panics if `block_size` is odd — a misconfigured caller, not a data
    /// error.
    pub fn new(inner: W, block_size: usize) -> Self {
        assert!(block_size % 2 == 0, "block size must be an even number");
        Self {
            inner,
            block_size,
            last_write: None,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the recorder, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PositionRecorder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.len() % self.block_size != 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, AlignmentError));
        }

        let written = self.inner.write(buf)?;
        if written == buf.len() {
            let start_block = self
                .last_write
                .map_or(0, |last| last.start_block + last.block_count);
            self.last_write = Some(PositionInfo {
                start_block,
                block_count: buf.len() / self.block_size,
            });
        }

        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> RecordingWrite for PositionRecorder<W> {
    fn last_write(&self) -> Option<PositionInfo> {
        self.last_write
    }
}

/// Error from [`write_padded`].
#[derive(Debug, Error)]
pub enum WriteError {
    /// The sink failed or refused the block-aligned buffer.
    #[error("failed to write padded section")]
    Io(#[from] io::Error),
    /// The sink accepted fewer bytes than the padded section.
    #[error("short write: {written} of {expected} bytes")]
    Short { written: usize, expected: usize },
    /// The sink accepted the write but recorded no position for it.
    #[error("sink recorded no position for the write")]
    NotRecorded,
}

/// Pad `data` with zeros to the block alignment and push it through `rec`
/// in a single write, so the recorder captures one position for the whole
/// section. Returns that position.
pub fn write_padded<W: RecordingWrite>(rec: &mut W, data: &[u8]) -> Result<PositionInfo, WriteError> {
    let padded_len = data.len() + padding_len(data.len(), BLOCK_SIZE);
    let mut buffer = Vec::with_capacity(padded_len);
    buffer.extend_from_slice(data);
    buffer.resize(padded_len, 0);

    let written = rec.write(&buffer)?;
    if written != buffer.len() {
        return Err(WriteError::Short {
            written,
            expected: buffer.len(),
        });
    }

    rec.last_write().ok_or(WriteError::NotRecorded)
}
