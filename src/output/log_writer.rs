//! # Log Writer
//!
//! Forwards streamed output to an application's log sink.
//!
//! A writer starts in synchronous mode: each write awaits the sink and
//! returns its error. After [`LogWriter::start_async`] writes copy the bytes
//! onto a bounded queue and return immediately; a single background task
//! drains the queue in write order.
//!
//! The consumer stops for good on the first sink failure. Entries still
//! queued, and any written afterwards, are dropped without an error reaching
//! the producer; the failure is visible through [`LogWriter::consumer_state`].
//! While the consumer is alive and the queue is full, writes wait for room.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

use super::{AppLogger, OutputSink, WriterError};
use crate::config::OutputConfig;
use crate::constants::output;

/// Lifecycle of the background consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    /// Write side closed and every queued entry forwarded
    Drained,
    /// Sink failed; remaining entries were dropped
    Stopped(String),
}

impl ConsumerState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug)]
struct AsyncPipe {
    sender: Option<mpsc::Sender<Vec<u8>>>,
    state: watch::Receiver<ConsumerState>,
}

#[derive(Debug)]
pub struct LogWriter {
    logger: Arc<dyn AppLogger>,
    source: Option<String>,
    default_source: String,
    category: String,
    capacity: usize,
    pipe: Option<AsyncPipe>,
}

impl LogWriter {
    pub fn new(logger: Arc<dyn AppLogger>) -> Self {
        Self {
            logger,
            source: None,
            default_source: output::DEFAULT_SOURCE.to_string(),
            category: output::LOG_CATEGORY.to_string(),
            capacity: output::ASYNC_BUFFER_CAPACITY,
            pipe: None,
        }
    }

    pub fn from_config(logger: Arc<dyn AppLogger>, config: &OutputConfig) -> Self {
        Self {
            default_source: config.default_source.clone(),
            category: config.log_category.clone(),
            capacity: config.async_buffer_capacity,
            ..Self::new(logger)
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Label attached to forwarded lines
    pub fn source(&self) -> &str {
        match self.source.as_deref() {
            Some(source) if !source.is_empty() => source,
            _ => &self.default_source,
        }
    }

    pub fn is_async(&self) -> bool {
        self.pipe.is_some()
    }

    /// Consumer state, or `None` when asynchronous mode was never started
    pub fn consumer_state(&self) -> Option<ConsumerState> {
        self.pipe.as_ref().map(|pipe| pipe.state.borrow().clone())
    }

    /// Switch to asynchronous mode and spawn the consumer task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_async(&mut self) {
        if self.pipe.is_some() {
            warn!(source = %self.source(), "LogWriter already in async mode");
            return;
        }

        let (sender, mut receiver) = mpsc::channel::<Vec<u8>>(self.capacity.max(1));
        let (state_tx, state_rx) = watch::channel(ConsumerState::Running);

        let logger = Arc::clone(&self.logger);
        let source = self.source().to_string();
        let category = self.category.clone();

        tokio::spawn(async move {
            while let Some(chunk) = receiver.recv().await {
                if let Err(err) = forward(logger.as_ref(), &chunk, &source, &category).await {
                    error!(source = %source, error = %err, "[LogWriter] failed to write async logs");
                    state_tx.send_replace(ConsumerState::Stopped(err.to_string()));
                    return;
                }
            }
            debug!(source = %source, "[LogWriter] async queue drained");
            state_tx.send_replace(ConsumerState::Drained);
        });

        self.pipe = Some(AsyncPipe {
            sender: Some(sender),
            state: state_rx,
        });
    }

    /// Write one chunk. Synchronous mode forwards it and returns the sink's
    /// error; asynchronous mode enqueues a copy and returns at once.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize, WriterError> {
        let Some(pipe) = self.pipe.as_ref() else {
            forward(self.logger.as_ref(), data, self.source(), &self.category).await?;
            return Ok(data.len());
        };

        let sender = pipe.sender.as_ref().ok_or(WriterError::Closed)?;
        if sender.send(data.to_vec()).await.is_err() {
            debug!(
                source = %self.source(),
                bytes = data.len(),
                "[LogWriter] consumer stopped, dropping output"
            );
        }
        Ok(data.len())
    }

    /// Signal end of stream. The consumer forwards what is still queued and
    /// then finishes. No-op in synchronous mode.
    pub fn close(&mut self) {
        if let Some(pipe) = self.pipe.as_mut() {
            pipe.sender.take();
        }
    }

    /// Wait for the consumer to finish, up to `timeout`.
    ///
    /// Returns immediately when asynchronous mode was never started. Timing
    /// out does not stop the consumer.
    pub async fn wait(&self, timeout: Duration) -> Result<(), WriterError> {
        let Some(pipe) = self.pipe.as_ref() else {
            return Ok(());
        };

        let mut state = pipe.state.clone();
        // A closed state channel means the consumer task is gone
        let finished = tokio::time::timeout(timeout, state.wait_for(ConsumerState::is_finished))
            .await
            .map(|_| ())
            .map_err(|_| WriterError::wait_timeout(timeout.as_millis() as u64));
        finished
    }
}

async fn forward(
    logger: &dyn AppLogger,
    data: &[u8],
    source: &str,
    category: &str,
) -> Result<(), WriterError> {
    let line = String::from_utf8_lossy(data);
    if let Cow::Owned(_) = line {
        debug!(source = %source, bytes = data.len(), "[LogWriter] replaced invalid UTF-8 in output");
    }
    logger.log(&line, source, category).await?;
    Ok(())
}

#[async_trait]
impl OutputSink for LogWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<usize, WriterError> {
        self.write(chunk).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StoreError;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct RecordingLogger {
        lines: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl AppLogger for RecordingLogger {
        async fn log(&self, line: &str, source: &str, category: &str) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::operation("log", "sink offline"));
            }
            self.lines
                .lock()
                .push((line.to_string(), source.to_string(), category.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sync_write_uses_default_source() {
        let logger = Arc::new(RecordingLogger::default());
        let mut writer = LogWriter::new(logger.clone());

        assert_eq!(writer.write(b"hello").await.unwrap(), 5);
        assert_eq!(
            logger.lines.lock().clone(),
            vec![("hello".to_string(), "harbor".to_string(), "api".to_string())]
        );
        assert!(writer.consumer_state().is_none());
    }

    #[tokio::test]
    async fn test_sync_write_uses_explicit_source() {
        let logger = Arc::new(RecordingLogger::default());
        let mut writer = LogWriter::new(logger.clone()).with_source("deploy");
        writer.write(b"x").await.unwrap();
        assert_eq!(logger.lines.lock()[0].1, "deploy");
    }

    #[tokio::test]
    async fn test_sync_write_propagates_sink_error() {
        let logger = Arc::new(RecordingLogger {
            fail: true,
            ..Default::default()
        });
        let mut writer = LogWriter::new(logger);
        let result = writer.write(b"hello").await;
        assert!(matches!(result, Err(WriterError::Sink(_))));
    }

    #[tokio::test]
    async fn test_wait_without_async_is_noop() {
        let writer = LogWriter::new(Arc::new(RecordingLogger::default()));
        assert!(writer.wait(Duration::from_millis(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_write_after_close_is_rejected() {
        let mut writer = LogWriter::new(Arc::new(RecordingLogger::default()));
        writer.start_async();
        writer.close();
        assert_eq!(writer.write(b"late").await, Err(WriterError::Closed));
        writer.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(writer.consumer_state(), Some(ConsumerState::Drained));
    }

    #[tokio::test]
    async fn test_async_failure_stops_consumer_silently() {
        let logger = Arc::new(RecordingLogger {
            fail: true,
            ..Default::default()
        });
        let mut writer = LogWriter::new(logger);
        writer.start_async();

        assert_eq!(writer.write(b"one").await.unwrap(), 3);
        writer.wait(Duration::from_secs(1)).await.unwrap();
        assert!(matches!(
            writer.consumer_state(),
            Some(ConsumerState::Stopped(_))
        ));

        // Later writes are dropped without surfacing an error
        assert_eq!(writer.write(b"two").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_forwarded_with_replacement() {
        let logger = Arc::new(RecordingLogger::default());
        let mut writer = LogWriter::new(logger.clone());

        assert_eq!(writer.write(b"ok \xff\xfe").await.unwrap(), 5);
        assert_eq!(logger.lines.lock()[0].0, "ok \u{fffd}\u{fffd}");
    }
}
