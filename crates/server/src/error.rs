use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::debug;

use memorydb_common::StorageError;

/// Erro devolvido pela API HTTP.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("requisição inválida: {0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Storage(StorageError::KeyNotFound) => (StatusCode::NOT_FOUND, "item_not_found"),
            ApiError::Storage(StorageError::Expired) => (StatusCode::NOT_FOUND, "key_expired"),
            ApiError::Storage(StorageError::InvalidType) => {
                (StatusCode::BAD_REQUEST, "invalid_data_type")
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        debug!("erro na API: {code} ({status}): {self}");

        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
