//! # Output Module
//!
//! Destinations for process output streamed while an action runs.
//!
//! - [`OutputSink`]: anything a restart can stream bytes into
//! - [`AppLogger`]: the log sink an application exposes (timestamped lines
//!   tagged with a source label and a category)
//! - [`LogWriter`]: forwards output to an [`AppLogger`], synchronously or
//!   through a bounded background pipeline

pub mod log_writer;

use async_trait::async_trait;
use thiserror::Error;

use crate::services::StoreError;

pub use log_writer::{ConsumerState, LogWriter};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriterError {
    #[error("Log sink rejected output: {0}")]
    Sink(#[from] StoreError),

    #[error("Writer is closed")]
    Closed,

    #[error("Timeout waiting for writer to finish after {timeout_ms}ms")]
    WaitTimeout { timeout_ms: u64 },
}

impl WriterError {
    pub fn wait_timeout(timeout_ms: u64) -> Self {
        Self::WaitTimeout { timeout_ms }
    }
}

/// Log sink owned by an application.
///
/// Lines arrive as text: [`LogWriter`] decodes each chunk lossily, so invalid
/// UTF-8 in process output reaches the sink as U+FFFD replacement characters.
#[async_trait]
pub trait AppLogger: Send + Sync + std::fmt::Debug {
    async fn log(&self, line: &str, source: &str, category: &str) -> Result<(), StoreError>;
}

/// Byte-oriented output destination.
#[async_trait]
pub trait OutputSink: Send {
    /// Accept one chunk of output, returning how many bytes were taken.
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<usize, WriterError>;
}

/// Sink that accepts and drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardOutput;

#[async_trait]
impl OutputSink for DiscardOutput {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<usize, WriterError> {
        Ok(chunk.len())
    }
}

#[async_trait]
impl OutputSink for Vec<u8> {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<usize, WriterError> {
        self.extend_from_slice(chunk);
        Ok(chunk.len())
    }
}
