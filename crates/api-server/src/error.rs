//! Maps the core error taxonomy onto HTTP responses.

use crate::rest::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nexus_core::NexusError;
use tracing::error;

/// Message returned for every server-side failure. Store details stay in the logs.
const INTERNAL_MESSAGE: &str = "Failed to fetch retention analytics";

#[derive(Debug)]
pub struct ApiError(pub NexusError);

impl From<NexusError> for ApiError {
    fn from(e: NexusError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match &self.0 {
            NexusError::InvalidInput(_) => "invalid_input",
            NexusError::Unauthenticated => "unauthenticated",
            NexusError::AccessDenied => "access_denied",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            error!(error = %self.0, "Retention request failed");
            INTERNAL_MESSAGE.to_string()
        };
        (
            status,
            Json(ErrorResponse {
                error: self.code().to_string(),
                message,
            }),
        )
            .into_response()
    }
}
