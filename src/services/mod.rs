//! # Services
//!
//! Collaborators the reconciler talks to: the application store, the service
//! registry and the applications themselves.

pub mod errors;
pub mod memory;
pub mod traits;

pub use errors::{StoreError, StoreResult};
pub use memory::{
    AppLogEntry, InMemoryApp, InMemoryAppStore, InMemoryServiceInstance, InMemoryServiceRegistry,
};
pub use traits::{AppStore, Application, ServiceCatalog, ServiceInstance, ServiceRegistry};
