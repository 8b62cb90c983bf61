//! # Queue Messages
//!
//! Intents delivered to the reconciler. A message names an action and carries
//! positional arguments: `args[0]` is the target application, `args[1..]` are
//! the unit names the action applies to.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::actions;

/// Closed set of actions the dispatcher understands.
///
/// Unrecognized tags are preserved in [`Action::Unknown`] so they can be
/// logged and rejected instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    RegenerateApprc,
    StartApp,
    RegenerateApprcAndStart,
    BindService,
    Unknown(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Self::RegenerateApprc => actions::REGENERATE_APPRC,
            Self::StartApp => actions::START_APP,
            Self::RegenerateApprcAndStart => actions::REGENERATE_APPRC_AND_START,
            Self::BindService => actions::BIND_SERVICE,
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<&str> for Action {
    fn from(tag: &str) -> Self {
        match tag {
            actions::REGENERATE_APPRC => Self::RegenerateApprc,
            actions::START_APP => Self::StartApp,
            actions::REGENERATE_APPRC_AND_START => Self::RegenerateApprcAndStart,
            actions::BIND_SERVICE => Self::BindService,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Action {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Unknown(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub action: Action,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Message {
    pub fn new<I, S>(action: Action, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Target application name, if the message has any arguments
    pub fn app_name(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Requested unit names (empty when only the application is named)
    pub fn unit_names(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_json(json: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json)
    }
}
