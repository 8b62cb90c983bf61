//! # Queue Consumer
//!
//! Polling loop that pulls deliveries from the reconciler's queues and hands
//! each one to the [`ActionDispatcher`]. Deliveries within a batch are
//! distinct messages and are dispatched concurrently; the loop sleeps for the
//! polling interval when every queue came back empty or failed.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, error, info};

use super::dispatcher::ActionDispatcher;
use crate::config::QueueConfig;
use crate::messaging::{MessagingResult, Transport};

pub struct QueueConsumer {
    transport: Arc<dyn Transport>,
    dispatcher: Arc<ActionDispatcher>,
    queue_names: Vec<String>,
    batch_size: usize,
    visibility_timeout: Duration,
    polling_interval: Duration,
}

impl std::fmt::Debug for QueueConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConsumer")
            .field("queue_names", &self.queue_names)
            .field("batch_size", &self.batch_size)
            .field("visibility_timeout", &self.visibility_timeout)
            .field("polling_interval", &self.polling_interval)
            .finish_non_exhaustive()
    }
}

impl QueueConsumer {
    pub fn new(
        transport: Arc<dyn Transport>,
        dispatcher: Arc<ActionDispatcher>,
        config: &QueueConfig,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            queue_names: config.queue_names(),
            batch_size: config.batch_size,
            visibility_timeout: config.visibility_timeout(),
            polling_interval: config.polling_interval(),
        }
    }

    pub fn queue_names(&self) -> &[String] {
        &self.queue_names
    }

    /// Receive one batch from a queue and dispatch it. Returns the number of
    /// deliveries handled.
    pub async fn poll_queue(&self, queue_name: &str) -> MessagingResult<usize> {
        let deliveries = self
            .transport
            .deliver(queue_name, self.batch_size, self.visibility_timeout)
            .await?;

        if deliveries.is_empty() {
            return Ok(0);
        }

        debug!(
            queue = %queue_name,
            count = deliveries.len(),
            "📬 Dispatching batch"
        );
        join_all(deliveries.iter().map(|d| self.dispatcher.handle(d))).await;
        Ok(deliveries.len())
    }

    /// Poll every queue once. Transport errors are logged per queue and do
    /// not stop the other queues from being polled.
    pub async fn poll_once(&self) -> usize {
        let mut handled = 0;
        for queue_name in &self.queue_names {
            match self.poll_queue(queue_name).await {
                Ok(count) => handled += count,
                Err(e) => error!(queue = %queue_name, error = %e, "Error polling queue"),
            }
        }
        handled
    }

    /// Run until `shutdown` fires or its sender is dropped. Returns the total
    /// number of deliveries handled.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) -> u64 {
        info!(
            queues = ?self.queue_names,
            batch_size = self.batch_size,
            polling_interval_ms = self.polling_interval.as_millis() as u64,
            "🔄 Starting queue consumer loop"
        );

        let mut total: u64 = 0;
        loop {
            let handled = self.poll_once().await;
            total += handled as u64;

            if handled > 0 {
                match shutdown.try_recv() {
                    Err(oneshot::error::TryRecvError::Empty) => continue,
                    _ => break,
                }
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(self.polling_interval) => {}
            }
        }

        info!(handled = total, "🛑 Queue consumer loop stopped");
        total
    }
}
