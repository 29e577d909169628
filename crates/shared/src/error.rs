//! Error body returned by the mission server, and its client-side form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A non-2xx reply that carried an [`ApiError`] body.
#[derive(Debug, Error)]
#[error("mission server rejected request with status {status} ({:?}): {}", error.code, error.message)]
pub struct RejectedRequest {
    pub status: u16,
    pub error: ApiError,
}
