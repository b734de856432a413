//! Unified error handling for the PesaChama backend
//!
//! Every fallible path converges on [`AppError`], which carries the HTTP
//! status mapping and the user-facing message. Callback handlers never let
//! an `AppError` escape as-is: the provider retries aggressively on
//! non-2xx, so only genuinely retryable failures map to 5xx there.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::database::error::DatabaseError;
use crate::mpesa::error::MpesaError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Bad or missing input; no record was created
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The provider synchronously refused the initiating call
    #[error("Provider rejected request: {description}")]
    ProviderRejected {
        code: Option<String>,
        description: String,
    },

    /// Network failure or a non-JSON response from the provider
    #[error("Provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    /// Callback payload lacks a usable correlation key
    #[error("Malformed callback: {message}")]
    MalformedCallback { message: String },

    /// Store read/write failed; safe to retry
    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

impl AppError {
    pub fn validation(message: impl Into<String>, field: &str) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::ProviderRejected { .. } => StatusCode::BAD_REQUEST,
            AppError::ProviderUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AppError::MalformedCallback { .. } => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller
    pub fn user_message(&self) -> String {
        match self {
            // Provider descriptions are surfaced verbatim so the client can
            // show the real rejection reason
            AppError::ProviderRejected { description, .. } => description.clone(),
            AppError::Persistence(_) => "Internal storage error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<MpesaError> for AppError {
    fn from(err: MpesaError) -> Self {
        match err {
            MpesaError::Rejected { code, description } => {
                AppError::ProviderRejected { code, description }
            }
            MpesaError::Unavailable { message } => AppError::ProviderUnavailable { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.user_message() }));
        (status, body).into_response()
    }
}
