use thiserror::Error;

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use crate::output::WriterError;
use crate::reconciler::DispatchError;
use crate::services::StoreError;

#[derive(Error, Debug)]
pub enum ReconcilerError {
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Output error: {0}")]
    Output(#[from] WriterError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Startup or shutdown of the reconciler system failed
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

impl ReconcilerError {
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ReconcilerError>;
