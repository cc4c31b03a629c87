//! Errors raised at the task store seam.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request to content store failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Content store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode content store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Task {id} not found")]
    NotFound { id: String },

    #[error("Invalid content store endpoint '{0}'")]
    InvalidEndpoint(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound { .. } => true,
            StoreError::Status { status, .. } => *status == 404,
            _ => false,
        }
    }
}
