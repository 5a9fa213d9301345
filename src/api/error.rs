//! API-layer error type for HTTP responses.
//!
//! Mirrors the teacher's `api::error::ApiError` shape (a small wrapper
//! type, an `IntoResponse` impl, `From<DomainError>` conversions) but
//! carries TVM's own five-kind taxonomy ([`VendingError`]) instead of
//! flowplane's HTTP-resource-CRUD one. `status_code`/`wire_code` are
//! delegated to `VendingError` itself (spec §6/§7) rather than re-derived
//! here.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::errors::{TvmError, VendingError};

/// Wraps a [`VendingError`] for the HTTP boundary. Infrastructure failures
/// ([`TvmError`]) arrive here already converted to `VendingError::Transient`
/// (spec §4.3/§7: "storage errors propagate as TransientError").
#[derive(Debug)]
pub struct ApiError(VendingError);

#[derive(Serialize)]
struct ErrorBody {
    /// One of spec §6's six wire error codes, stable across transports.
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Authorization errors deliberately don't disclose which grant was
        // missing (spec §7); the wire message is the `Display` impl's fixed
        // string, never a formatted detail.
        let body = ErrorBody { error: self.0.wire_code(), message: self.0.to_string() };

        (status, Json(body)).into_response()
    }
}

impl From<VendingError> for ApiError {
    fn from(error: VendingError) -> Self {
        Self(error)
    }
}

impl From<TvmError> for ApiError {
    fn from(error: TvmError) -> Self {
        Self(VendingError::from(error))
    }
}
