//! # Dispatch Error Taxonomy
//!
//! Why a dispatch did not complete its action. Whether a given error leads to
//! acknowledgement or redelivery depends on the phase that produced it and is
//! decided by the dispatcher's transition table, not by the error itself.

use thiserror::Error;

use super::readiness::NotReadyKind;
use crate::messaging::Action;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Required arguments are missing from the message
    #[error("Error handling {action:?}: {reason}")]
    MalformedIntent { action: String, reason: String },

    /// Target application not found in the regenerate/start flows
    #[error("Error handling {action:?}: app {app:?} does not exist")]
    AppMissing { action: String, app: String },

    /// Target application not found in the bind flow
    #[error("Error handling {action:?}: app {app:?} does not exist, giving up")]
    BindTargetMissing { action: String, app: String },

    /// None of the requested unit names resolve to a unit of the application
    #[error("Error handling {action:?} for the app {app:?}: units {units:?} not found")]
    UnitMissing {
        action: String,
        app: String,
        units: Vec<String>,
    },

    #[error("Error handling {action:?} for the app {app:?}: {}", describe_not_ready(.kind, .state))]
    UnitsNotReady {
        action: String,
        app: String,
        kind: NotReadyKind,
        state: String,
    },

    /// A side-effecting operation or a store access failed
    #[error("Error handling {action:?}: {operation} failed: {message}")]
    OperationFailure {
        action: String,
        operation: String,
        message: String,
    },

    #[error("Error handling {action:?}: invalid action")]
    UnknownAction { action: String },
}

fn describe_not_ready(kind: &NotReadyKind, state: &str) -> String {
    match kind {
        NotReadyKind::Terminal => format!("units are in {state:?} state"),
        NotReadyKind::Transitional => "all units must be started".to_string(),
    }
}

impl DispatchError {
    pub fn malformed(action: &Action, reason: impl Into<String>) -> Self {
        Self::MalformedIntent {
            action: action.to_string(),
            reason: reason.into(),
        }
    }

    pub fn app_missing(action: &Action, app: impl Into<String>) -> Self {
        Self::AppMissing {
            action: action.to_string(),
            app: app.into(),
        }
    }

    pub fn bind_target_missing(action: &Action, app: impl Into<String>) -> Self {
        Self::BindTargetMissing {
            action: action.to_string(),
            app: app.into(),
        }
    }

    pub fn unit_missing(action: &Action, app: impl Into<String>, units: &[String]) -> Self {
        Self::UnitMissing {
            action: action.to_string(),
            app: app.into(),
            units: units.to_vec(),
        }
    }

    pub fn units_not_ready(
        action: &Action,
        app: impl Into<String>,
        kind: NotReadyKind,
        state: impl Into<String>,
    ) -> Self {
        Self::UnitsNotReady {
            action: action.to_string(),
            app: app.into(),
            kind,
            state: state.into(),
        }
    }

    pub fn operation_failure(
        action: &Action,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::OperationFailure {
            action: action.to_string(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn unknown_action(action: &Action) -> Self {
        Self::UnknownAction {
            action: action.to_string(),
        }
    }

    /// Short machine-friendly name for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedIntent { .. } => "malformed_intent",
            Self::AppMissing { .. } => "app_missing",
            Self::BindTargetMissing { .. } => "bind_target_missing",
            Self::UnitMissing { .. } => "unit_missing",
            Self::UnitsNotReady {
                kind: NotReadyKind::Terminal,
                ..
            } => "units_not_ready_terminal",
            Self::UnitsNotReady {
                kind: NotReadyKind::Transitional,
                ..
            } => "units_not_ready_transitional",
            Self::OperationFailure { .. } => "operation_failure",
            Self::UnknownAction { .. } => "unknown_action",
        }
    }
}
