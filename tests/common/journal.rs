//! Collaborator wrappers that record the order of side effects

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use harbor_reconciler::messaging::{
    Delivery, InMemoryTransport, Message, MessageId, MessagingResult, Transport,
};
use harbor_reconciler::models::Unit;
use harbor_reconciler::output::OutputSink;
use harbor_reconciler::services::{
    AppStore, Application, InMemoryApp, InMemoryAppStore, StoreResult,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEvent {
    Acknowledged { receipt: String },
    EnvironmentPersisted { app: String },
    Restarted { app: String },
}

#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<JournalEvent>>>,
}

impl Journal {
    pub fn record(&self, event: JournalEvent) {
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<JournalEvent> {
        self.events.lock().clone()
    }

    pub fn position(&self, matches: impl Fn(&JournalEvent) -> bool) -> Option<usize> {
        self.events().iter().position(matches)
    }

    pub fn count(&self, matches: impl Fn(&JournalEvent) -> bool) -> usize {
        self.events().iter().filter(|e| matches(e)).count()
    }

    pub fn acks(&self) -> usize {
        self.count(|e| matches!(e, JournalEvent::Acknowledged { .. }))
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

pub struct JournalingTransport {
    inner: Arc<InMemoryTransport>,
    journal: Journal,
}

impl JournalingTransport {
    pub fn new(inner: Arc<InMemoryTransport>, journal: Journal) -> Self {
        Self { inner, journal }
    }
}

#[async_trait]
impl Transport for JournalingTransport {
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        self.inner.ensure_queue(queue_name).await
    }

    async fn put(
        &self,
        queue_name: &str,
        message: &Message,
        delay: Duration,
    ) -> MessagingResult<MessageId> {
        self.inner.put(queue_name, message, delay).await
    }

    async fn deliver(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<Delivery>> {
        self.inner
            .deliver(queue_name, max_messages, visibility_timeout)
            .await
    }

    async fn acknowledge(&self, delivery: &Delivery) -> MessagingResult<()> {
        self.inner.acknowledge(delivery).await?;
        self.journal.record(JournalEvent::Acknowledged {
            receipt: delivery.receipt_handle.to_string(),
        });
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "journaling"
    }
}

#[derive(Debug)]
pub struct JournaledApp {
    inner: Arc<InMemoryApp>,
    journal: Journal,
}

#[async_trait]
impl Application for JournaledApp {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn units(&self) -> Vec<Unit> {
        self.inner.units()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    async fn restart(&self, output: &mut dyn OutputSink) -> StoreResult<()> {
        self.inner.restart(output).await?;
        self.journal.record(JournalEvent::Restarted {
            app: self.name().to_string(),
        });
        Ok(())
    }

    async fn persist_environment(&self) -> StoreResult<()> {
        self.inner.persist_environment().await?;
        self.journal.record(JournalEvent::EnvironmentPersisted {
            app: self.name().to_string(),
        });
        Ok(())
    }
}

pub struct JournalingStore {
    inner: Arc<InMemoryAppStore>,
    journal: Journal,
}

impl JournalingStore {
    pub fn new(inner: Arc<InMemoryAppStore>, journal: Journal) -> Self {
        Self { inner, journal }
    }
}

#[async_trait]
impl AppStore for JournalingStore {
    async fn get(&self, name: &str) -> StoreResult<Option<Arc<dyn Application>>> {
        if self.inner.get(name).await?.is_none() {
            return Ok(None);
        }
        Ok(self.inner.app(name).map(|inner| {
            Arc::new(JournaledApp {
                inner,
                journal: self.journal.clone(),
            }) as Arc<dyn Application>
        }))
    }
}
