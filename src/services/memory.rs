//! # In-Memory Collaborators
//!
//! Store, application and service-registry implementations backed by process
//! memory. They record every call and support failure injection, which makes
//! them the collaborators of choice for tests and local runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::errors::{StoreError, StoreResult};
use super::traits::{AppStore, Application, ServiceCatalog, ServiceInstance, ServiceRegistry};
use crate::constants::unit_status;
use crate::models::Unit;
use crate::output::{AppLogger, OutputSink};

/// One line recorded in an application's log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLogEntry {
    pub timestamp: DateTime<Utc>,
    pub line: String,
    pub source: String,
    pub category: String,
}

#[derive(Debug, Default)]
struct AppState {
    units: Vec<Unit>,
    available: bool,
    restart_count: usize,
    env_persist_count: usize,
    restart_failure: Option<String>,
    persist_failure: Option<String>,
    log_failure: Option<String>,
    log_entries: Vec<AppLogEntry>,
}

#[derive(Debug)]
pub struct InMemoryApp {
    name: String,
    state: Mutex<AppState>,
}

impl InMemoryApp {
    /// New available application without units
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(AppState {
                available: true,
                ..Default::default()
            }),
        }
    }

    pub fn with_unit(self, name: impl Into<String>, status: impl Into<String>) -> Self {
        self.state.lock().units.push(Unit::new(name, status));
        self
    }

    pub fn unavailable(self) -> Self {
        self.state.lock().available = false;
        self
    }

    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    pub fn set_unit_status(&self, unit_name: &str, status: impl Into<String>) {
        let mut state = self.state.lock();
        if let Some(unit) = state.units.iter_mut().find(|u| u.name == unit_name) {
            unit.status = status.into();
        }
    }

    pub fn add_unit(&self, name: impl Into<String>, status: impl Into<String>) {
        self.state.lock().units.push(Unit::new(name, status));
    }

    pub fn fail_restart(&self, message: Option<&str>) {
        self.state.lock().restart_failure = message.map(str::to_string);
    }

    pub fn fail_persist(&self, message: Option<&str>) {
        self.state.lock().persist_failure = message.map(str::to_string);
    }

    pub fn fail_logs(&self, message: Option<&str>) {
        self.state.lock().log_failure = message.map(str::to_string);
    }

    pub fn restart_count(&self) -> usize {
        self.state.lock().restart_count
    }

    pub fn env_persist_count(&self) -> usize {
        self.state.lock().env_persist_count
    }

    pub fn log_entries(&self) -> Vec<AppLogEntry> {
        self.state.lock().log_entries.clone()
    }
}

#[async_trait]
impl Application for InMemoryApp {
    fn name(&self) -> &str {
        &self.name
    }

    fn units(&self) -> Vec<Unit> {
        self.state.lock().units.clone()
    }

    fn is_available(&self) -> bool {
        self.state.lock().available
    }

    async fn restart(&self, output: &mut dyn OutputSink) -> StoreResult<()> {
        let (unit_names, failure) = {
            let mut state = self.state.lock();
            state.restart_count += 1;
            let names: Vec<String> = state.units.iter().map(|u| u.name.clone()).collect();
            (names, state.restart_failure.clone())
        };

        for unit_name in &unit_names {
            let line = format!("---> Restarting unit {unit_name}\n");
            output
                .write_chunk(line.as_bytes())
                .await
                .map_err(|e| StoreError::operation("restart", e.to_string()))?;
        }

        if let Some(message) = failure {
            return Err(StoreError::operation("restart", message));
        }

        let mut state = self.state.lock();
        for unit in state.units.iter_mut() {
            unit.status = unit_status::STARTED.to_string();
        }
        debug!(app = %self.name, units = unit_names.len(), "App restarted");
        Ok(())
    }

    async fn persist_environment(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        if let Some(message) = state.persist_failure.clone() {
            return Err(StoreError::operation("persist_environment", message));
        }
        state.env_persist_count += 1;
        Ok(())
    }
}

#[async_trait]
impl AppLogger for InMemoryApp {
    async fn log(&self, line: &str, source: &str, category: &str) -> StoreResult<()> {
        let mut state = self.state.lock();
        if let Some(message) = state.log_failure.clone() {
            return Err(StoreError::operation("log", message));
        }
        state.log_entries.push(AppLogEntry {
            timestamp: Utc::now(),
            line: line.to_string(),
            source: source.to_string(),
            category: category.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAppStore {
    apps: DashMap<String, Arc<InMemoryApp>>,
    connection_failure: Mutex<Option<String>>,
}

impl InMemoryAppStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application, returning the shared handle tests can inspect
    pub fn insert(&self, app: InMemoryApp) -> Arc<InMemoryApp> {
        let app = Arc::new(app);
        self.apps.insert(app.name.clone(), Arc::clone(&app));
        app
    }

    pub fn app(&self, name: &str) -> Option<Arc<InMemoryApp>> {
        self.apps.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn fail_connections(&self, message: Option<&str>) {
        *self.connection_failure.lock() = message.map(str::to_string);
    }
}

#[async_trait]
impl AppStore for InMemoryAppStore {
    async fn get(&self, name: &str) -> StoreResult<Option<Arc<dyn Application>>> {
        if let Some(message) = self.connection_failure.lock().clone() {
            return Err(StoreError::connection(message));
        }
        Ok(self
            .apps
            .get(name)
            .map(|entry| Arc::clone(entry.value()) as Arc<dyn Application>))
    }
}

#[derive(Debug)]
pub struct InMemoryServiceInstance {
    name: String,
    apps: Vec<String>,
    bound_units: Mutex<Vec<Unit>>,
    bind_attempts: Mutex<usize>,
    bind_failure: Mutex<Option<String>>,
}

impl InMemoryServiceInstance {
    pub fn new<I, S>(name: impl Into<String>, apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            apps: apps.into_iter().map(Into::into).collect(),
            bound_units: Mutex::new(Vec::new()),
            bind_attempts: Mutex::new(0),
            bind_failure: Mutex::new(None),
        }
    }

    pub fn fail_binds(&self, message: Option<&str>) {
        *self.bind_failure.lock() = message.map(str::to_string);
    }

    pub fn bound_units(&self) -> Vec<Unit> {
        self.bound_units.lock().clone()
    }

    pub fn bind_attempts(&self) -> usize {
        *self.bind_attempts.lock()
    }

    fn is_bound_to(&self, app_name: &str) -> bool {
        self.apps.iter().any(|app| app == app_name)
    }
}

#[async_trait]
impl ServiceInstance for InMemoryServiceInstance {
    fn name(&self) -> &str {
        &self.name
    }

    async fn bind_unit(&self, unit: &Unit) -> StoreResult<()> {
        *self.bind_attempts.lock() += 1;
        if let Some(message) = self.bind_failure.lock().clone() {
            return Err(StoreError::operation("bind_unit", message));
        }
        self.bound_units.lock().push(unit.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryServiceRegistry {
    instances: Mutex<Vec<Arc<InMemoryServiceInstance>>>,
    connection_failure: Mutex<Option<String>>,
    query_failure: Mutex<Option<String>>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, instance: InMemoryServiceInstance) -> Arc<InMemoryServiceInstance> {
        let instance = Arc::new(instance);
        self.instances.lock().push(Arc::clone(&instance));
        instance
    }

    pub fn fail_connections(&self, message: Option<&str>) {
        *self.connection_failure.lock() = message.map(str::to_string);
    }

    pub fn fail_queries(&self, message: Option<&str>) {
        *self.query_failure.lock() = message.map(str::to_string);
    }
}

#[async_trait]
impl ServiceRegistry for InMemoryServiceRegistry {
    async fn connect(&self) -> StoreResult<Box<dyn ServiceCatalog>> {
        if let Some(message) = self.connection_failure.lock().clone() {
            return Err(StoreError::connection(message));
        }
        Ok(Box::new(InMemoryCatalog {
            instances: self.instances.lock().clone(),
            query_failure: self.query_failure.lock().clone(),
        }))
    }
}

struct InMemoryCatalog {
    instances: Vec<Arc<InMemoryServiceInstance>>,
    query_failure: Option<String>,
}

#[async_trait]
impl ServiceCatalog for InMemoryCatalog {
    async fn instances_bound_to(
        &self,
        app_name: &str,
    ) -> StoreResult<Vec<Arc<dyn ServiceInstance>>> {
        if let Some(message) = &self.query_failure {
            return Err(StoreError::query("instances_bound_to", message.clone()));
        }
        Ok(self
            .instances
            .iter()
            .filter(|instance| instance.is_bound_to(app_name))
            .map(|instance| Arc::clone(instance) as Arc<dyn ServiceInstance>)
            .collect())
    }
}
