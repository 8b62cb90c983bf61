//! # Reconciler Bootstrap
//!
//! Process-scoped lifecycle for the reconciler. The transport and the
//! collaborators are constructed by the caller and passed in; nothing here is
//! global state.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use harbor_reconciler::bootstrap::ReconcilerSystem;
//! use harbor_reconciler::config::ReconcilerConfig;
//! use harbor_reconciler::messaging::InMemoryTransport;
//! use harbor_reconciler::services::{InMemoryAppStore, InMemoryServiceRegistry};
//!
//! # async fn run() -> harbor_reconciler::Result<()> {
//! let system = ReconcilerSystem::new(
//!     ReconcilerConfig::default(),
//!     Arc::new(InMemoryTransport::new()),
//!     Arc::new(InMemoryAppStore::new()),
//!     Arc::new(InMemoryServiceRegistry::new()),
//! );
//! let handle = system.start().await?;
//! // ...
//! handle.shutdown(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ReconcilerConfig;
use crate::error::{ReconcilerError, Result};
use crate::logging::log_queue_operation;
use crate::messaging::{Message, MessageId, Transport};
use crate::output::{AppLogger, LogWriter};
use crate::reconciler::{ActionDispatcher, QueueConsumer, ReadinessCheck, ServiceBinder};
use crate::services::{AppStore, ServiceRegistry};

/// Owns the wiring between transport, dispatcher and consumer
pub struct ReconcilerSystem {
    config: ReconcilerConfig,
    transport: Arc<dyn Transport>,
    dispatcher: Arc<ActionDispatcher>,
}

impl std::fmt::Debug for ReconcilerSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilerSystem")
            .field("config", &self.config)
            .field("transport", &self.transport.provider_name())
            .finish()
    }
}

impl ReconcilerSystem {
    pub fn new(
        config: ReconcilerConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn AppStore>,
        registry: Arc<dyn ServiceRegistry>,
    ) -> Self {
        let dispatcher = Arc::new(ActionDispatcher::new(
            transport.clone(),
            ReadinessCheck::new(store.clone()),
            ServiceBinder::new(store, registry),
        ));
        Self {
            config,
            transport,
            dispatcher,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub fn dispatcher(&self) -> Arc<ActionDispatcher> {
        self.dispatcher.clone()
    }

    /// Writer forwarding output into `logger` with the configured defaults
    pub fn log_writer(&self, logger: Arc<dyn AppLogger>) -> LogWriter {
        LogWriter::from_config(logger, &self.config.output)
    }

    /// Create both queues if they do not exist yet
    pub async fn ensure_queues(&self) -> Result<()> {
        for queue_name in self.config.queue.queue_names() {
            self.transport.ensure_queue(&queue_name).await?;
            log_queue_operation("ensure_queue", &queue_name, None, "ready", None);
        }
        Ok(())
    }

    /// Put messages on the internal queue for immediate delivery
    pub async fn enqueue<I>(&self, messages: I) -> Result<Vec<MessageId>>
    where
        I: IntoIterator<Item = Message>,
    {
        let queue_name = &self.config.queue.internal_queue_name;
        let mut ids = Vec::new();
        for message in messages {
            ids.push(self.transport.put(queue_name, &message, Duration::ZERO).await?);
        }
        log_queue_operation("enqueue", queue_name, Some(ids.len()), "sent", None);
        Ok(ids)
    }

    /// Ensure the queues exist and spawn the consumer loop
    pub async fn start(&self) -> Result<ReconcilerHandle> {
        self.ensure_queues().await?;

        let consumer = QueueConsumer::new(
            self.transport.clone(),
            self.dispatcher.clone(),
            &self.config.queue,
        );
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let task = tokio::spawn(consumer.run(shutdown_receiver));

        info!(
            transport = self.transport.provider_name(),
            queues = ?self.config.queue.queue_names(),
            "🚀 Reconciler system started"
        );
        Ok(ReconcilerHandle {
            shutdown_sender: Some(shutdown_sender),
            task: Some(task),
        })
    }
}

/// Handle to a running consumer loop
#[derive(Debug)]
pub struct ReconcilerHandle {
    /// Shutdown signal sender (Some when running, None when stopped)
    shutdown_sender: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<u64>>,
}

impl ReconcilerHandle {
    pub fn is_running(&self) -> bool {
        self.shutdown_sender.is_some()
    }

    /// Ask the consumer loop to stop after its current batch
    pub fn stop(&mut self) -> Result<()> {
        if let Some(sender) = self.shutdown_sender.take() {
            sender
                .send(())
                .map_err(|_| ReconcilerError::lifecycle("Failed to send shutdown signal"))?;
            info!("🛑 Reconciler shutdown requested");
        } else {
            warn!("Reconciler already stopped");
        }
        Ok(())
    }

    /// Wait for the consumer loop to exit. Returns the number of deliveries
    /// it handled.
    pub async fn join(&mut self, timeout: Duration) -> Result<u64> {
        let Some(task) = self.task.as_mut() else {
            return Err(ReconcilerError::lifecycle("Consumer loop already joined"));
        };
        let handled = tokio::time::timeout(timeout, task)
            .await
            .map_err(|_| {
                ReconcilerError::lifecycle(format!(
                    "Consumer loop did not stop within {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| ReconcilerError::lifecycle(format!("Consumer loop failed: {e}")))?;
        self.task = None;
        Ok(handled)
    }

    /// Stop and wait for the loop to exit
    pub async fn shutdown(mut self, timeout: Duration) -> Result<u64> {
        self.stop()?;
        self.join(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{Action, InMemoryTransport};
    use crate::services::{InMemoryApp, InMemoryAppStore, InMemoryServiceRegistry};

    fn system(transport: Arc<InMemoryTransport>, store: Arc<InMemoryAppStore>) -> ReconcilerSystem {
        let mut config = ReconcilerConfig::default();
        config.queue.polling_interval_ms = 10;
        ReconcilerSystem::new(
            config,
            transport,
            store,
            Arc::new(InMemoryServiceRegistry::new()),
        )
    }

    #[tokio::test]
    async fn test_enqueue_puts_on_internal_queue() {
        let transport = Arc::new(InMemoryTransport::new());
        let system = system(transport.clone(), Arc::new(InMemoryAppStore::new()));
        system.ensure_queues().await.unwrap();

        let ids = system
            .enqueue([
                Message::new(Action::StartApp, ["blog"]),
                Message::new(Action::BindService, ["blog", "blog/0"]),
            ])
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(transport.queue_length("harbor-app").await, 2);
        assert_eq!(transport.queue_length("harbor-app-public").await, 0);
    }

    #[tokio::test]
    async fn test_enqueue_without_queues_fails() {
        let system = system(
            Arc::new(InMemoryTransport::new()),
            Arc::new(InMemoryAppStore::new()),
        );
        let result = system
            .enqueue([Message::new(Action::StartApp, ["blog"])])
            .await;
        assert!(matches!(result, Err(ReconcilerError::Messaging(_))));
    }

    #[tokio::test]
    async fn test_start_processes_and_shuts_down() {
        let transport = Arc::new(InMemoryTransport::new());
        let store = Arc::new(InMemoryAppStore::new());
        let app = store.insert(InMemoryApp::new("blog").with_unit("blog/0", "started"));
        let system = system(transport.clone(), store);

        let mut handle = system.start().await.unwrap();
        assert!(handle.is_running());
        system
            .enqueue([Message::new(Action::StartApp, ["blog"])])
            .await
            .unwrap();

        for _ in 0..100 {
            if app.restart_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(app.restart_count(), 1);

        handle.stop().unwrap();
        assert!(!handle.is_running());
        let handled = handle.join(Duration::from_secs(2)).await.unwrap();
        assert_eq!(handled, 1);
        assert!(handle.join(Duration::from_secs(1)).await.is_err());
    }
}
