//! Log sinks for exercising the output writer

use std::sync::Arc;

use async_trait::async_trait;
use harbor_reconciler::output::AppLogger;
use harbor_reconciler::services::{StoreError, StoreResult};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedLine {
    pub line: String,
    pub source: String,
    pub category: String,
}

/// Records every line; optionally fails from the `fail_from`-th call on
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<LoggedLine>>,
    calls: Mutex<usize>,
    fail_from: Option<usize>,
}

impl RecordingLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_from(call: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_from: Some(call),
            ..Self::default()
        })
    }

    pub fn lines(&self) -> Vec<LoggedLine> {
        self.lines.lock().clone()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl AppLogger for RecordingLogger {
    async fn log(&self, line: &str, source: &str, category: &str) -> StoreResult<()> {
        let call = {
            let mut calls = self.calls.lock();
            *calls += 1;
            *calls
        };
        if self.fail_from.is_some_and(|from| call >= from) {
            return Err(StoreError::operation("log", "log collection unavailable"));
        }
        self.lines.lock().push(LoggedLine {
            line: line.to_string(),
            source: source.to_string(),
            category: category.to_string(),
        });
        Ok(())
    }
}

/// A sink whose `log` never completes
#[derive(Debug, Default)]
pub struct StalledLogger;

#[async_trait]
impl AppLogger for StalledLogger {
    async fn log(&self, _line: &str, _source: &str, _category: &str) -> StoreResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}
