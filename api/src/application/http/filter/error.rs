use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use listfilter_core::domain::common::ListFilterError;

/// Response-side wrapper for filter failures, so handlers can end with
/// `?`. Only store and serialization trouble ever reaches this; invalid
/// filter input is skipped long before.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Filter(#[from] ListFilterError),
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    code: String,
    message: String,
    status: i64,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Filter(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "E_FILTER_STORE",
                e.to_string(),
            ),
        };

        let error_response = ErrorResponse {
            code: code.to_string(),
            message,
            status: status.as_u16() as i64,
        };

        let body = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"code":"INTERNAL_SERVER_ERROR","message":"Failed to serialize error response"}"#
                .to_string()
        });

        axum::response::Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(body.clone().into())
            .unwrap_or_else(|_| axum::response::Response::new(body.into()))
    }
}
