//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across the HTTP layer and the
//! service facade, along with a helper mapper to HTTP status codes.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// No credential, or an expired/unverifiable one.
    Unauthenticated { code: String, message: String },
    /// Authenticated, but policy denies the action.
    Forbidden { code: String, message: String },
    NotFound { code: String, message: String },
    /// Malformed input: bad enum value, empty text, out-of-range pagination.
    Validation { code: String, message: String },
    /// Lifecycle rule violation (e.g. reopening a closed complaint).
    InvalidTransition { code: String, message: String },
    /// Domain rule violation (e.g. deleting the last admin account).
    InvalidOperation { code: String, message: String },
    /// Storage/classifier/training collaborator failure; surfaced as-is, never retried here.
    Upstream { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Unauthenticated { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Validation { code, .. }
            | AppError::InvalidTransition { code, .. }
            | AppError::InvalidOperation { code, .. }
            | AppError::Upstream { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Unauthenticated { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Validation { message, .. }
            | AppError::InvalidTransition { message, .. }
            | AppError::InvalidOperation { message, .. }
            | AppError::Upstream { message, .. } => message.as_str(),
        }
    }

    pub fn unauthenticated(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Unauthenticated { code: code.into(), message: msg.into() } }
    pub fn forbidden(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn not_found(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn validation(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn invalid_transition(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::InvalidTransition { code: code.into(), message: msg.into() } }
    pub fn invalid_operation(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::InvalidOperation { code: code.into(), message: msg.into() } }
    pub fn upstream(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Upstream { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Unauthenticated { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Validation { .. } => 400,
            AppError::InvalidTransition { .. } => 409,
            AppError::InvalidOperation { .. } => 409,
            AppError::Upstream { .. } => 502,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: collaborator failures surface as Upstream unless downcasted elsewhere
        AppError::Upstream { code: "upstream_error".into(), message: err.to_string() }
    }
}
