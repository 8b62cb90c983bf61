//! # Reconciler
//!
//! Drives applications toward the state a delivered intent asks for.
//!
//! ```text
//! Transport ─deliver─▶ QueueConsumer ─▶ ActionDispatcher ─▶ ReadinessCheck ─▶ UnitView
//!                                              │
//!                                              ├─▶ Application::restart / persist_environment
//!                                              └─▶ ServiceBinder ─▶ ServiceRegistry
//! ```
//!
//! The dispatcher holds no state shared across deliveries; everything it
//! decides on is read fresh from the store for each message.

pub mod consumer;
pub mod dispatcher;
pub mod errors;
pub mod readiness;
pub mod service_bind;

pub use consumer::QueueConsumer;
pub use dispatcher::{ActionDispatcher, DispatchReport, DispatchState, Disposition};
pub use errors::DispatchError;
pub use readiness::{classify, NotReadyKind, Readiness, ReadinessCheck};
pub use service_bind::{BindSummary, ServiceBinder};
