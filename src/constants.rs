//! # System Constants
//!
//! Wire tags, queue names, unit status tokens and output-writer defaults shared
//! across the reconciler.

/// Action tags carried in the `action` field of a queue message
pub mod actions {
    pub const REGENERATE_APPRC: &str = "regenerate-apprc";
    pub const START_APP: &str = "start-app";
    pub const REGENERATE_APPRC_AND_START: &str = "regenerate-apprc-start-app";
    pub const BIND_SERVICE: &str = "bind-service";
}

/// Queue names used by the reconciler
pub mod queues {
    /// Queue for messages the platform enqueues for itself
    pub const INTERNAL_QUEUE_NAME: &str = "harbor-app";
    /// Queue for messages published by external actors
    pub const PUBLIC_QUEUE_NAME: &str = "harbor-app-public";
}

/// Unit status tokens with meaning to the reconciler.
///
/// The status domain is open; anything not listed here is transitional.
pub mod unit_status {
    pub const STARTED: &str = "started";
    pub const ERROR: &str = "error";
    pub const DOWN: &str = "down";

    /// Statuses after which a regenerate request gives up permanently
    pub const TERMINAL_FAILURES: &[&str] = &[ERROR, DOWN];

    /// Status reported for a requested unit name the application does not have
    pub const UNRESOLVED: &str = "";

    pub fn is_terminal_failure(status: &str) -> bool {
        TERMINAL_FAILURES.contains(&status)
    }
}

/// Unit selection rules
pub mod selection {
    /// An empty list of requested unit names selects no units at all, so the
    /// view is vacuously "all started" and reports no shared state. It does
    /// NOT mean "every unit of the application". Unverified against product
    /// intent; do not change without deciding whether empty should mean all.
    pub const EMPTY_SELECTION_SELECTS_NO_UNITS: bool = true;
}

/// Async output writer defaults
pub mod output {
    /// Bounded queue capacity between producer and consumer
    pub const ASYNC_BUFFER_CAPACITY: usize = 1000;
    /// Source label used when a writer has none set
    pub const DEFAULT_SOURCE: &str = "harbor";
    /// Log category attached to forwarded output
    pub const LOG_CATEGORY: &str = "api";
    /// Default bound for `LogWriter::wait`
    pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;
}

/// Consumer loop defaults
pub mod system {
    pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: u64 = 300;
    pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 1_000;
    pub const DEFAULT_BATCH_SIZE: usize = 10;
    pub const ENVIRONMENT_VARIABLE: &str = "HARBOR_ENV";
    pub const DEFAULT_ENVIRONMENT: &str = "development";
}
