#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Harbor Reconciler
//!
//! Asynchronous reconciliation core of the Harbor application-hosting
//! platform.
//!
//! ## Overview
//!
//! Deployment tooling and provisioning agents cannot run long state
//! transitions inline with a user request. They enqueue intents instead, and
//! this crate consumes them in the background: it checks that the target
//! application and units are in a state where the action may proceed,
//! performs it, and either acknowledges the message or leaves it for the
//! transport to redeliver.
//!
//! ## Module Organization
//!
//! - [`models`] - Units and the per-message unit view
//! - [`messaging`] - Messages, the transport seam and an in-memory transport
//! - [`services`] - Application store and service registry collaborators
//! - [`reconciler`] - Readiness check, service binding, action dispatcher, queue consumer
//! - [`output`] - Async output writer forwarding process output to an app log
//! - [`bootstrap`] - Process-scoped lifecycle
//! - [`config`] - Layered configuration
//! - [`error`] - Crate-level error type
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use harbor_reconciler::messaging::{Action, InMemoryTransport, Message};
//! use harbor_reconciler::services::{InMemoryApp, InMemoryAppStore, InMemoryServiceRegistry};
//! use harbor_reconciler::{ReconcilerConfig, ReconcilerSystem};
//!
//! # async fn example() -> harbor_reconciler::Result<()> {
//! let store = Arc::new(InMemoryAppStore::new());
//! store.insert(InMemoryApp::new("blog").with_unit("blog/0", "started"));
//!
//! let system = ReconcilerSystem::new(
//!     ReconcilerConfig::default(),
//!     Arc::new(InMemoryTransport::new()),
//!     store,
//!     Arc::new(InMemoryServiceRegistry::new()),
//! );
//! let handle = system.start().await?;
//! system
//!     .enqueue([Message::new(Action::RegenerateApprcAndStart, ["blog"])])
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod output;
pub mod reconciler;
pub mod services;

pub use bootstrap::{ReconcilerHandle, ReconcilerSystem};
pub use config::{ConfigManager, ReconcilerConfig};
pub use error::{ReconcilerError, Result};
pub use logging::init_structured_logging;
pub use messaging::{Action, Delivery, InMemoryTransport, Message, Transport};
pub use models::{Unit, UnitView};
pub use output::{LogWriter, OutputSink};
pub use reconciler::{ActionDispatcher, DispatchError, DispatchReport, Disposition};
