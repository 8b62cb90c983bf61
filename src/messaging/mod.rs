//! # Messaging Module
//!
//! Message model and the transport seam the reconciler consumes intents from.

pub mod errors;
pub mod in_memory;
pub mod message;
pub mod transport;

pub use errors::{MessagingError, MessagingResult};
pub use in_memory::{InMemoryTransport, QueueCounters};
pub use message::{Action, Message};
pub use transport::{Delivery, MessageId, ReceiptHandle, Transport};
