//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::FailureKind;
use domain::DomainError;
use serde::Serialize;
use totals::TotalsError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Command handling error.
    Domain(DomainError),
    /// Totals query error.
    Totals(TotalsError),
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: FailureKind,
}

impl ApiError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::BadRequest(_) => FailureKind::ValidationFailure,
            ApiError::Domain(err) => err.kind(),
            ApiError::Totals(err) => err.kind(),
        }
    }
}

/// Maps a failure category to its HTTP status.
pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::ValidationFailure => StatusCode::BAD_REQUEST,
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::ConcurrencyConflict => StatusCode::CONFLICT,
        FailureKind::DependencyFailure => StatusCode::BAD_GATEWAY,
        FailureKind::UnexpectedFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Domain(err) => err.to_string(),
            ApiError::Totals(err) => err.to_string(),
        };

        metrics::counter!("api_request_failures_total", "kind" => kind.to_string()).increment(1);
        if status.is_server_error() {
            tracing::error!(error = %message, %kind, "request failed");
        } else {
            tracing::debug!(error = %message, %kind, "request rejected");
        }

        let body = ErrorBody {
            error: message,
            kind,
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<TotalsError> for ApiError {
    fn from(err: TotalsError) -> Self {
        ApiError::Totals(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
