//! # Transport Seam
//!
//! Provider-agnostic contract for the message transport the reconciler
//! consumes from. The transport owns delivery, redelivery and durability:
//! delivery is at-least-once, there is no ordering guarantee across distinct
//! messages, and a message that is never acknowledged comes back once its
//! visibility timeout lapses.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::errors::MessagingResult;
use super::message::Message;

/// Identifier assigned by the transport when a message is put
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Handle used to acknowledge one particular delivery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(pub String);

impl ReceiptHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ReceiptHandle {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// One delivery of a message. The same message may be delivered many times.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub queue_name: String,
    pub receipt_handle: ReceiptHandle,
    pub message: Message,
    /// Number of times this message has been handed out, including this one
    pub receive_count: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl Delivery {
    pub fn new(
        queue_name: impl Into<String>,
        receipt_handle: ReceiptHandle,
        message: Message,
        receive_count: u32,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            queue_name: queue_name.into(),
            receipt_handle,
            message,
            receive_count,
            enqueued_at,
        }
    }

    pub fn is_redelivery(&self) -> bool {
        self.receive_count > 1
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Create a queue if it does not exist (idempotent)
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()>;

    /// Put a message on a queue. `delay` is advisory: the message should not
    /// be delivered before it elapses.
    async fn put(
        &self,
        queue_name: &str,
        message: &Message,
        delay: Duration,
    ) -> MessagingResult<MessageId>;

    /// Hand out up to `max_messages` visible messages, hiding each for
    /// `visibility_timeout` unless acknowledged first.
    async fn deliver(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<Delivery>>;

    /// Remove a delivered message permanently
    async fn acknowledge(&self, delivery: &Delivery) -> MessagingResult<()>;

    fn provider_name(&self) -> &'static str;
}
