//! # In-Memory Transport
//!
//! Thread-safe in-memory queues with visibility-timeout redelivery, for tests
//! and local development.
//!
//! - **Visibility timeout**: a delivered message is hidden until it is
//!   acknowledged or the timeout lapses, after which it is delivered again
//! - **Delay**: `put` with a non-zero delay hides the message until the delay
//!   elapses
//! - **Wire format**: payloads are stored as JSON, as a database-backed queue
//!   would store them

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::errors::{MessagingError, MessagingResult};
use super::message::Message;
use super::transport::{Delivery, MessageId, ReceiptHandle, Transport};

/// Acknowledged ids remembered per queue for [`InMemoryTransport::ack_count`]
const ACK_HISTORY_LIMIT: usize = 1024;

#[derive(Debug, Clone)]
struct StoredMessage {
    id: u64,
    payload: Vec<u8>,
    enqueued_at: DateTime<Utc>,
    /// None = visible now
    visible_at: Option<DateTime<Utc>>,
    receive_count: u32,
}

#[derive(Debug)]
struct InMemoryQueue {
    messages: VecDeque<StoredMessage>,
    next_id: u64,
    total_sent: u64,
    total_received: u64,
    total_acked: u64,
    /// Most recent acknowledgements, oldest first
    acked_ids: VecDeque<u64>,
}

impl InMemoryQueue {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            next_id: 1,
            total_sent: 0,
            total_received: 0,
            total_acked: 0,
            acked_ids: VecDeque::new(),
        }
    }
}

/// Snapshot of a queue's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounters {
    pub pending: usize,
    pub sent: u64,
    pub received: u64,
    pub acked: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryTransport {
    queues: RwLock<HashMap<String, InMemoryQueue>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queues(queue_names: &[&str]) -> Self {
        let queues = queue_names
            .iter()
            .map(|name| (name.to_string(), InMemoryQueue::new()))
            .collect();
        Self {
            queues: RwLock::new(queues),
        }
    }

    /// Messages still held by the queue, visible or not
    pub async fn queue_length(&self, queue_name: &str) -> usize {
        let queues = self.queues.read().await;
        queues.get(queue_name).map(|q| q.messages.len()).unwrap_or(0)
    }

    pub async fn counters(&self, queue_name: &str) -> QueueCounters {
        let queues = self.queues.read().await;
        queues
            .get(queue_name)
            .map(|q| QueueCounters {
                pending: q.messages.len(),
                sent: q.total_sent,
                received: q.total_received,
                acked: q.total_acked,
            })
            .unwrap_or_default()
    }

    /// How many times the given delivery's message was acknowledged
    pub async fn ack_count(&self, delivery: &Delivery) -> usize {
        let Ok(id) = delivery.receipt_handle.as_str().parse::<u64>() else {
            return 0;
        };
        let queues = self.queues.read().await;
        queues
            .get(&delivery.queue_name)
            .map(|q| q.acked_ids.iter().filter(|acked| **acked == id).count())
            .unwrap_or(0)
    }

    /// Make every hidden message visible now, as if all visibility timeouts
    /// had lapsed.
    pub async fn expire_visibility(&self, queue_name: &str) {
        let mut queues = self.queues.write().await;
        if let Some(queue) = queues.get_mut(queue_name) {
            for msg in queue.messages.iter_mut() {
                msg.visible_at = None;
            }
        }
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::weeks(52))
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        let mut queues = self.queues.write().await;
        queues
            .entry(queue_name.to_string())
            .or_insert_with(InMemoryQueue::new);
        Ok(())
    }

    async fn put(
        &self,
        queue_name: &str,
        message: &Message,
        delay: Duration,
    ) -> MessagingResult<MessageId> {
        let payload = serde_json::to_vec(message)?;

        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let id = queue.next_id;
        queue.next_id += 1;
        queue.total_sent += 1;

        let now = Utc::now();
        let visible_at = (!delay.is_zero()).then(|| now + to_chrono(delay));

        queue.messages.push_back(StoredMessage {
            id,
            payload,
            enqueued_at: now,
            visible_at,
            receive_count: 0,
        });

        debug!(queue = %queue_name, message_id = id, action = %message.action, "📤 Message put");
        Ok(MessageId::from(id))
    }

    async fn deliver(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<Delivery>> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let now = Utc::now();
        let hidden_until = now + to_chrono(visibility_timeout);

        // Decode the whole batch before hiding anything
        let batch = queue
            .messages
            .iter()
            .enumerate()
            .filter(|(_, msg)| msg.visible_at.map(|vt| vt <= now).unwrap_or(true))
            .take(max_messages)
            .map(|(index, msg)| -> MessagingResult<(usize, Message)> {
                Ok((index, serde_json::from_slice(&msg.payload)?))
            })
            .collect::<MessagingResult<Vec<_>>>()?;

        let mut delivered = Vec::with_capacity(batch.len());
        for (index, message) in batch {
            let Some(msg) = queue.messages.get_mut(index) else {
                continue;
            };
            msg.visible_at = Some(hidden_until);
            msg.receive_count += 1;
            queue.total_received += 1;

            delivered.push(Delivery::new(
                queue_name,
                ReceiptHandle::from(msg.id),
                message,
                msg.receive_count,
                msg.enqueued_at,
            ));
        }

        Ok(delivered)
    }

    async fn acknowledge(&self, delivery: &Delivery) -> MessagingResult<()> {
        let handle = delivery.receipt_handle.as_str();
        let id: u64 = handle
            .parse()
            .map_err(|_| MessagingError::invalid_receipt_handle(handle))?;

        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(&delivery.queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(&delivery.queue_name))?;

        let pos = queue
            .messages
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| MessagingError::message_not_found(handle))?;

        queue.messages.remove(pos);
        queue.total_acked += 1;
        if queue.acked_ids.len() >= ACK_HISTORY_LIMIT {
            queue.acked_ids.pop_front();
        }
        queue.acked_ids.push_back(id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}
