use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::unit_status;

/// A process instance of an application.
///
/// `status` is an open string domain. Only `"started"` (success) and
/// `"error"`/`"down"` (failure) carry meaning here; every other value is
/// transitional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub status: String,
}

impl Unit {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.status == unit_status::STARTED
    }

    pub fn is_terminal_failure(&self) -> bool {
        unit_status::is_terminal_failure(&self.status)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.status)
    }
}
