#![allow(dead_code)]

pub mod journal;
pub mod loggers;
pub mod strategies;

pub use journal::*;
pub use loggers::*;

use std::sync::Arc;
use std::time::Duration;

use harbor_reconciler::messaging::{Action, Delivery, InMemoryTransport, Message, Transport};
use harbor_reconciler::reconciler::{ActionDispatcher, ReadinessCheck, ServiceBinder};
use harbor_reconciler::services::{InMemoryAppStore, InMemoryServiceRegistry};

pub const QUEUE: &str = "harbor-app";
pub const VISIBILITY: Duration = Duration::from_secs(30);

/// Dispatcher wired to in-memory collaborators that journal every
/// acknowledgement, environment persistence and restart.
pub struct Harness {
    pub transport: Arc<InMemoryTransport>,
    pub store: Arc<InMemoryAppStore>,
    pub registry: Arc<InMemoryServiceRegistry>,
    pub journal: Journal,
    pub dispatcher: ActionDispatcher,
}

impl Harness {
    pub fn new() -> Self {
        let journal = Journal::default();
        let transport = Arc::new(InMemoryTransport::with_queues(&[QUEUE]));
        let store = Arc::new(InMemoryAppStore::new());
        let registry = Arc::new(InMemoryServiceRegistry::new());

        let journaled_transport = Arc::new(JournalingTransport::new(
            transport.clone(),
            journal.clone(),
        ));
        let journaled_store = Arc::new(JournalingStore::new(store.clone(), journal.clone()));

        let dispatcher = ActionDispatcher::new(
            journaled_transport,
            ReadinessCheck::new(journaled_store.clone()),
            ServiceBinder::new(journaled_store, registry.clone()),
        );

        Self {
            transport,
            store,
            registry,
            journal,
            dispatcher,
        }
    }

    pub async fn put(&self, action: Action, args: &[&str]) {
        let message = Message::new(action, args.iter().copied());
        self.transport
            .put(QUEUE, &message, Duration::ZERO)
            .await
            .expect("put message");
    }

    /// Put a message and take its first delivery
    pub async fn deliver(&self, action: Action, args: &[&str]) -> Delivery {
        self.put(action, args).await;
        self.next_delivery()
            .await
            .expect("message should be deliverable")
    }

    pub async fn next_delivery(&self) -> Option<Delivery> {
        self.transport
            .deliver(QUEUE, 1, VISIBILITY)
            .await
            .expect("deliver")
            .pop()
    }

    /// Lapse every visibility timeout and take the next delivery, as the
    /// transport would once the timeout expires.
    pub async fn redeliver(&self) -> Option<Delivery> {
        self.transport.expire_visibility(QUEUE).await;
        self.next_delivery().await
    }
}
