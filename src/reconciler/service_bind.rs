//! # Service-Bind Operation
//!
//! Attaches one unit of an application to every service instance bound to
//! that application. Binding is best-effort: a failure on one instance is
//! logged and the remaining instances are still attempted.
//!
//! Only the first resolved unit of the request is bound; a message always
//! targets exactly one unit and extra unit names are ignored.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use super::errors::DispatchError;
use crate::messaging::Message;
use crate::models::UnitView;
use crate::services::{AppStore, ServiceRegistry};

/// Outcome of a bind pass that reached the instance loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindSummary {
    pub app: String,
    pub unit: String,
    pub bound: Vec<String>,
    pub failed: Vec<String>,
}

impl BindSummary {
    pub fn attempted(&self) -> usize {
        self.bound.len() + self.failed.len()
    }
}

#[derive(Clone)]
pub struct ServiceBinder {
    store: Arc<dyn AppStore>,
    registry: Arc<dyn ServiceRegistry>,
}

impl fmt::Debug for ServiceBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceBinder").finish_non_exhaustive()
    }
}

impl ServiceBinder {
    pub fn new(store: Arc<dyn AppStore>, registry: Arc<dyn ServiceRegistry>) -> Self {
        Self { store, registry }
    }

    /// Bind the message's unit to every instance bound to its application.
    ///
    /// Errors:
    /// - `MalformedIntent`: no application or no unit named
    /// - `BindTargetMissing`: the application does not exist (terminal)
    /// - `OperationFailure`: store, registry connection or instance query failed
    /// - `UnitMissing`: none of the requested names resolve yet
    pub async fn bind(&self, message: &Message) -> Result<BindSummary, DispatchError> {
        let action = &message.action;
        let Some(app_name) = message.app_name() else {
            return Err(DispatchError::malformed(
                action,
                "this action requires at least 1 argument",
            ));
        };

        let app = self
            .store
            .get(app_name)
            .await
            .map_err(|e| DispatchError::operation_failure(action, "load app", e.to_string()))?
            .ok_or_else(|| DispatchError::bind_target_missing(action, app_name))?;

        let catalog = self
            .registry
            .connect()
            .await
            .map_err(|e| DispatchError::operation_failure(action, "connect", e.to_string()))?;

        if message.unit_names().is_empty() {
            return Err(DispatchError::malformed(
                action,
                "this action requires a unit name",
            ));
        }
        let view = UnitView::select(&app.units(), message.unit_names());
        let Some(unit) = view.first() else {
            return Err(DispatchError::unit_missing(
                action,
                app_name,
                message.unit_names(),
            ));
        };

        let instances = catalog.instances_bound_to(app_name).await.map_err(|e| {
            DispatchError::operation_failure(action, "find service instances", e.to_string())
        })?;

        let mut summary = BindSummary {
            app: app_name.to_string(),
            unit: unit.name.clone(),
            ..Default::default()
        };

        for instance in instances {
            match instance.bind_unit(unit).await {
                Ok(()) => summary.bound.push(instance.name().to_string()),
                Err(err) => {
                    warn!(
                        unit = %unit.name,
                        instance = %instance.name(),
                        error = %err,
                        "Error binding the unit with the service instance"
                    );
                    summary.failed.push(instance.name().to_string());
                }
            }
        }

        info!(
            app = %summary.app,
            unit = %summary.unit,
            bound = summary.bound.len(),
            failed = summary.failed.len(),
            "🔗 Unit bound to service instances"
        );
        Ok(summary)
    }
}
