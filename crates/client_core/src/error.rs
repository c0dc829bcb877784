use thiserror::Error;

use crate::validator::FieldErrors;

/// Failures surfaced to the presentation layer.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    Server(String),
    #[error("roll number cannot change once a student exists")]
    RollIdChanged,
    #[error("no dialog is open for this action")]
    NoDialog,
    #[error("another operation is in progress")]
    Busy,
}

impl SyncError {
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
