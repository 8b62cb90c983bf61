//! # Action Dispatcher
//!
//! Retry-aware state machine that drives one delivered message to an
//! outcome: acknowledged (handled, or given up on for good) or left for the
//! transport to redeliver.
//!
//! ## States and transitions
//!
//! | State                          | Outcome                                  | Ack? | Next        |
//! |--------------------------------|------------------------------------------|------|-------------|
//! | entry                          | `regenerate-apprc`                       |      | Regenerating { then_start: false } |
//! | entry                          | `regenerate-apprc-start-app`             |      | Regenerating { then_start: true }  |
//! | entry                          | `start-app`                              |      | Starting    |
//! | entry                          | `bind-service`                           |      | Binding     |
//! | entry                          | unrecognized tag                         |      | Rejected    |
//! | Regenerating                   | no arguments                             | no   | Finished    |
//! | Regenerating                   | app missing / store error                | no   | Finished    |
//! | Regenerating                   | units not ready, transitional            | no   | Finished    |
//! | Regenerating                   | units not ready, terminal                | yes  | Finished    |
//! | Regenerating                   | ready: ack, then persist environment     | yes  | Starting if `then_start`, else Finished |
//! | Starting                       | no arguments                             | no   | Finished    |
//! | Starting                       | app missing / not ready (either kind)    | no   | Finished    |
//! | Starting                       | restart failed                           | no   | Finished    |
//! | Starting                       | restart succeeded                        | yes  | Finished    |
//! | Binding                        | bind succeeded (best-effort)             | yes  | Finished    |
//! | Binding                        | app missing                              | yes  | Finished    |
//! | Binding                        | any other error                          | no   | Finished    |
//! | Rejected                       | always                                   | yes  | Finished    |
//!
//! A message is acknowledged at most once per dispatch: the combined action
//! acknowledges when regeneration succeeds and the start phase does not
//! acknowledge again.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::errors::DispatchError;
use super::readiness::{NotReadyKind, Readiness, ReadinessCheck};
use super::service_bind::ServiceBinder;
use crate::logging::log_dispatch_operation;
use crate::messaging::{Action, Delivery, Transport};
use crate::output::DiscardOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    /// Checking readiness and persisting the environment
    Regenerating { then_start: bool },
    /// Checking readiness and restarting the application
    Starting,
    /// Binding a unit to the application's service instances
    Binding,
    /// Unrecognized action, acknowledged without retry
    Rejected,
    Finished,
}

impl DispatchState {
    /// First state for a message carrying `action`
    pub fn entry(action: &Action) -> Self {
        match action {
            Action::RegenerateApprc => Self::Regenerating { then_start: false },
            Action::RegenerateApprcAndStart => Self::Regenerating { then_start: true },
            Action::StartApp => Self::Starting,
            Action::BindService => Self::Binding,
            Action::Unknown(_) => Self::Rejected,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regenerating { .. } => write!(f, "regenerating"),
            Self::Starting => write!(f, "starting"),
            Self::Binding => write!(f, "binding"),
            Self::Rejected => write!(f, "rejected"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// What happened to the delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Acknowledged,
    LeftForRedelivery,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acknowledged => write!(f, "acknowledged"),
            Self::LeftForRedelivery => write!(f, "left_for_redelivery"),
        }
    }
}

/// Record of a finished dispatch, for logs and tests
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub dispatch_id: Uuid,
    pub action: Action,
    pub app_name: Option<String>,
    /// States visited, in order
    pub path: Vec<DispatchState>,
    pub disposition: Disposition,
    /// Last error that stopped or degraded the dispatch
    pub error: Option<DispatchError>,
    pub duration_ms: u64,
}

impl DispatchReport {
    pub fn is_acknowledged(&self) -> bool {
        self.disposition == Disposition::Acknowledged
    }
}

/// Per-delivery bookkeeping threaded through the state handlers
struct DispatchRun<'a> {
    delivery: &'a Delivery,
    acknowledged: bool,
    path: Vec<DispatchState>,
    error: Option<DispatchError>,
}

impl<'a> DispatchRun<'a> {
    fn new(delivery: &'a Delivery) -> Self {
        Self {
            delivery,
            acknowledged: false,
            path: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, err: DispatchError) {
        warn!(
            error_kind = err.kind(),
            error = %err,
            receive_count = self.delivery.receive_count,
            "Dispatch did not complete"
        );
        self.error = Some(err);
    }
}

pub struct ActionDispatcher {
    transport: Arc<dyn Transport>,
    readiness: ReadinessCheck,
    binder: ServiceBinder,
}

impl fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("transport", &self.transport.provider_name())
            .finish_non_exhaustive()
    }
}

impl ActionDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        readiness: ReadinessCheck,
        binder: ServiceBinder,
    ) -> Self {
        Self {
            transport,
            readiness,
            binder,
        }
    }

    /// Entry point the consumer loop calls once per delivery. The outcome is
    /// observable only through acknowledgement and logs.
    pub async fn handle(&self, delivery: &Delivery) {
        self.dispatch(delivery).await;
    }

    /// Run the state machine for one delivery and report what happened.
    #[instrument(
        skip(self, delivery),
        fields(
            action = %delivery.message.action,
            queue = %delivery.queue_name,
            receipt = %delivery.receipt_handle,
            receive_count = delivery.receive_count
        )
    )]
    pub async fn dispatch(&self, delivery: &Delivery) -> DispatchReport {
        let started = Instant::now();
        let dispatch_id = Uuid::new_v4();
        let mut run = DispatchRun::new(delivery);

        debug!(%dispatch_id, args = ?delivery.message.args, "📥 Dispatching message");

        let mut state = DispatchState::entry(&delivery.message.action);
        while !state.is_terminal() {
            run.path.push(state);
            state = match state {
                DispatchState::Regenerating { then_start } => {
                    self.regenerate(&mut run, then_start).await
                }
                DispatchState::Starting => self.start(&mut run).await,
                DispatchState::Binding => self.bind(&mut run).await,
                DispatchState::Rejected => self.reject(&mut run).await,
                DispatchState::Finished => DispatchState::Finished,
            };
        }

        let disposition = if run.acknowledged {
            Disposition::Acknowledged
        } else {
            Disposition::LeftForRedelivery
        };
        let report = DispatchReport {
            dispatch_id,
            action: delivery.message.action.clone(),
            app_name: delivery.message.app_name().map(str::to_string),
            path: run.path,
            disposition,
            error: run.error,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        log_dispatch_operation(
            report.action.as_str(),
            report.dispatch_id,
            report.app_name.as_deref(),
            &report.disposition.to_string(),
            delivery.receive_count,
            report.duration_ms,
            report.error.as_ref().map(DispatchError::kind),
        );
        report
    }

    async fn regenerate(&self, run: &mut DispatchRun<'_>, then_start: bool) -> DispatchState {
        let delivery = run.delivery;
        let message = &delivery.message;
        let action = &message.action;
        let Some(app_name) = message.app_name() else {
            run.fail(DispatchError::malformed(
                action,
                "this action requires at least 1 argument",
            ));
            return DispatchState::Finished;
        };

        let readiness = match self.readiness.check(app_name, message.unit_names()).await {
            Ok(readiness) => readiness,
            Err(err) => {
                run.fail(DispatchError::operation_failure(
                    action,
                    "load app",
                    err.to_string(),
                ));
                return DispatchState::Finished;
            }
        };

        match readiness {
            Readiness::AppMissing => {
                run.fail(DispatchError::app_missing(action, app_name));
                DispatchState::Finished
            }
            Readiness::NotReady { kind, state, .. } => {
                run.fail(DispatchError::units_not_ready(action, app_name, kind, state));
                if kind == NotReadyKind::Terminal {
                    self.acknowledge(run).await;
                }
                DispatchState::Finished
            }
            Readiness::Ready { app, .. } => {
                self.acknowledge(run).await;
                match app.persist_environment().await {
                    Ok(()) => debug!(app = %app_name, "📝 Environment persisted"),
                    Err(err) => {
                        error!(app = %app_name, error = %err, "Failed to persist app environment")
                    }
                }
                if then_start {
                    DispatchState::Starting
                } else {
                    DispatchState::Finished
                }
            }
        }
    }

    async fn start(&self, run: &mut DispatchRun<'_>) -> DispatchState {
        let delivery = run.delivery;
        let message = &delivery.message;
        let action = &message.action;
        let Some(app_name) = message.app_name() else {
            run.fail(DispatchError::malformed(
                action,
                "this action requires at least 1 argument",
            ));
            return DispatchState::Finished;
        };

        let app = match self.readiness.check(app_name, message.unit_names()).await {
            Ok(Readiness::Ready { app, .. }) => app,
            Ok(Readiness::AppMissing) => {
                run.fail(DispatchError::app_missing(action, app_name));
                return DispatchState::Finished;
            }
            Ok(Readiness::NotReady { kind, state, .. }) => {
                run.fail(DispatchError::units_not_ready(action, app_name, kind, state));
                return DispatchState::Finished;
            }
            Err(err) => {
                run.fail(DispatchError::operation_failure(
                    action,
                    "load app",
                    err.to_string(),
                ));
                return DispatchState::Finished;
            }
        };

        let mut output = DiscardOutput;
        match app.restart(&mut output).await {
            Ok(()) => {
                info!(app = %app_name, "🚀 App restarted");
                self.acknowledge(run).await;
            }
            Err(err) => {
                run.fail(DispatchError::operation_failure(
                    action,
                    "restart",
                    err.to_string(),
                ));
            }
        }
        DispatchState::Finished
    }

    async fn bind(&self, run: &mut DispatchRun<'_>) -> DispatchState {
        match self.binder.bind(&run.delivery.message).await {
            Ok(summary) => {
                debug!(
                    app = %summary.app,
                    unit = %summary.unit,
                    attempted = summary.attempted(),
                    "Bind pass complete"
                );
                self.acknowledge(run).await;
            }
            Err(err @ DispatchError::BindTargetMissing { .. }) => {
                run.fail(err);
                self.acknowledge(run).await;
            }
            Err(err) => run.fail(err),
        }
        DispatchState::Finished
    }

    async fn reject(&self, run: &mut DispatchRun<'_>) -> DispatchState {
        let err = DispatchError::unknown_action(&run.delivery.message.action);
        run.fail(err);
        self.acknowledge(run).await;
        DispatchState::Finished
    }

    /// Acknowledge the delivery unless this dispatch already has.
    async fn acknowledge(&self, run: &mut DispatchRun<'_>) {
        if run.acknowledged {
            return;
        }
        match self.transport.acknowledge(run.delivery).await {
            Ok(()) => {
                run.acknowledged = true;
                debug!(receipt = %run.delivery.receipt_handle, "✅ Message acknowledged");
            }
            Err(err) => {
                warn!(
                    receipt = %run.delivery.receipt_handle,
                    error = %err,
                    "Failed to acknowledge message, it will be redelivered"
                );
            }
        }
    }
}
