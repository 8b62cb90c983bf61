//! # Readiness Check
//!
//! Decides whether an application, and the units a message asked about, are
//! in a state where a side-effecting action may proceed.
//!
//! The check only reads: it fetches the application fresh from the store on
//! every call, so running it twice for one message (once per phase of a
//! combined action) or again on redelivery is safe.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::unit_status;
use crate::models::UnitView;
use crate::services::{AppStore, Application, StoreResult};

/// Why a present application is not ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotReadyKind {
    /// Every selected unit shares a failure status; waiting will not help
    Terminal,
    /// Units are still moving; worth retrying later
    Transitional,
}

impl fmt::Display for NotReadyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal => write!(f, "terminal"),
            Self::Transitional => write!(f, "transitional"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Readiness {
    Ready {
        app: Arc<dyn Application>,
        view: UnitView,
    },
    AppMissing,
    NotReady {
        app: Arc<dyn Application>,
        view: UnitView,
        kind: NotReadyKind,
        /// Status shared by the selected units, or `""`
        state: String,
    },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn not_ready_kind(&self) -> Option<NotReadyKind> {
        match self {
            Self::NotReady { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Classify a view of an existing application.
///
/// Ready iff the application is available and every selected unit is
/// started; otherwise terminal iff the selected units share `error` or
/// `down`.
pub fn classify(available: bool, view: &UnitView) -> Option<(NotReadyKind, String)> {
    if available && view.started() {
        return None;
    }

    let state = view.state().to_string();
    let kind = if unit_status::is_terminal_failure(&state) {
        NotReadyKind::Terminal
    } else {
        NotReadyKind::Transitional
    };
    Some((kind, state))
}

#[derive(Clone)]
pub struct ReadinessCheck {
    store: Arc<dyn AppStore>,
}

impl fmt::Debug for ReadinessCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessCheck").finish_non_exhaustive()
    }
}

impl ReadinessCheck {
    pub fn new(store: Arc<dyn AppStore>) -> Self {
        Self { store }
    }

    pub async fn check(&self, app_name: &str, unit_names: &[String]) -> StoreResult<Readiness> {
        let Some(app) = self.store.get(app_name).await? else {
            debug!(app = %app_name, "Readiness: app not found");
            return Ok(Readiness::AppMissing);
        };

        let view = UnitView::select(&app.units(), unit_names);
        let readiness = match classify(app.is_available(), &view) {
            None => Readiness::Ready { app, view },
            Some((kind, state)) => Readiness::NotReady {
                app,
                view,
                kind,
                state,
            },
        };

        debug!(
            app = %app_name,
            requested_units = unit_names.len(),
            ready = readiness.is_ready(),
            not_ready_kind = ?readiness.not_ready_kind(),
            "Readiness evaluated"
        );
        Ok(readiness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryApp, InMemoryAppStore, StoreError};

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn check_with(app: InMemoryApp) -> ReadinessCheck {
        let store = InMemoryAppStore::new();
        store.insert(app);
        ReadinessCheck::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_ready_when_available_and_started() {
        let check = check_with(
            InMemoryApp::new("blog")
                .with_unit("blog/0", "started")
                .with_unit("blog/1", "started"),
        );
        let readiness = check
            .check("blog", &names(&["blog/0", "blog/1"]))
            .await
            .unwrap();
        assert!(readiness.is_ready());
    }

    #[tokio::test]
    async fn test_missing_app() {
        let check = check_with(InMemoryApp::new("blog"));
        let readiness = check.check("shop", &[]).await.unwrap();
        assert!(matches!(readiness, Readiness::AppMissing));
    }

    #[tokio::test]
    async fn test_unavailable_app_is_not_ready() {
        let check = check_with(
            InMemoryApp::new("blog")
                .with_unit("blog/0", "started")
                .unavailable(),
        );
        let readiness = check.check("blog", &names(&["blog/0"])).await.unwrap();
        assert_eq!(
            readiness.not_ready_kind(),
            Some(NotReadyKind::Transitional)
        );
    }

    #[tokio::test]
    async fn test_uniform_failure_is_terminal() {
        let check = check_with(
            InMemoryApp::new("blog")
                .with_unit("blog/0", "down")
                .with_unit("blog/1", "down"),
        );
        let readiness = check
            .check("blog", &names(&["blog/0", "blog/1"]))
            .await
            .unwrap();
        match readiness {
            Readiness::NotReady { kind, state, .. } => {
                assert_eq!(kind, NotReadyKind::Terminal);
                assert_eq!(state, "down");
            }
            other => panic!("expected NotReady, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mixed_failure_is_transitional() {
        let check = check_with(
            InMemoryApp::new("blog")
                .with_unit("blog/0", "error")
                .with_unit("blog/1", "pending"),
        );
        let readiness = check
            .check("blog", &names(&["blog/0", "blog/1"]))
            .await
            .unwrap();
        assert_eq!(
            readiness.not_ready_kind(),
            Some(NotReadyKind::Transitional)
        );
    }

    #[tokio::test]
    async fn test_empty_selection_ignores_unit_statuses() {
        let check = check_with(InMemoryApp::new("blog").with_unit("blog/0", "error"));
        let readiness = check.check("blog", &[]).await.unwrap();
        assert!(readiness.is_ready());
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let store = InMemoryAppStore::new();
        store.fail_connections(Some("timeout"));
        let check = ReadinessCheck::new(Arc::new(store));
        let result = check.check("blog", &[]).await;
        assert!(matches!(result, Err(StoreError::Connection { .. })));
    }

    #[test]
    fn test_classify_unavailable_with_terminal_units() {
        let units = vec![crate::models::Unit::new("blog/0", "error")];
        let view = UnitView::select(&units, &["blog/0"]);
        assert_eq!(
            classify(false, &view),
            Some((NotReadyKind::Terminal, "error".to_string()))
        );
    }
}
