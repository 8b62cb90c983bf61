//! # Collaborator Traits
//!
//! Narrow contracts for the systems the reconciler reads from and acts on.
//! Their internals (persistence, process control, service provisioning) live
//! outside this crate.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use super::errors::StoreResult;
use crate::models::Unit;
use crate::output::OutputSink;

/// A hosted application as loaded from the store.
#[async_trait]
pub trait Application: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Snapshot of the application's units, in store order
    fn units(&self) -> Vec<Unit>;

    fn is_available(&self) -> bool;

    /// Drive the application's units to the running state, streaming process
    /// output into `output`.
    async fn restart(&self, output: &mut dyn OutputSink) -> StoreResult<()>;

    /// Persist the application's resolved environment representation.
    async fn persist_environment(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait AppStore: Send + Sync + 'static {
    /// Load an application by name. `Ok(None)` means it does not exist.
    async fn get(&self, name: &str) -> StoreResult<Option<Arc<dyn Application>>>;
}

#[async_trait]
pub trait ServiceInstance: Send + Sync + Debug {
    fn name(&self) -> &str;

    async fn bind_unit(&self, unit: &Unit) -> StoreResult<()>;
}

/// Open connection to the service registry.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Every service instance whose bound-applications set contains `app_name`
    async fn instances_bound_to(&self, app_name: &str)
        -> StoreResult<Vec<Arc<dyn ServiceInstance>>>;
}

#[async_trait]
pub trait ServiceRegistry: Send + Sync + 'static {
    async fn connect(&self) -> StoreResult<Box<dyn ServiceCatalog>>;
}
