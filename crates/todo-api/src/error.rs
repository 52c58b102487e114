use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::TodoError;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error, Span};

/// 項目名 → メッセージ
pub type FieldErrors = BTreeMap<String, String>;

const VALIDATION_MESSAGE: &str = "Validation errors in your request";
const BODY_ERROR_HINT: &str = "Check your body request";
const NOT_FOUND_MESSAGE: &str = "Item not found";
const INTERNAL_MESSAGE: &str = "There is something error";

/// API のエラー
///
/// `Body` と `Internal` の文言はログ用で、レスポンスには固定文言を返す。
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("invalid request body: {0}")]
    Body(String),

    #[error("item not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Body(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TodoError> for ApiError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::NotFound => ApiError::NotFound,
            TodoError::Storage(detail) => ApiError::Internal(detail),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    code: u16,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = ErrorBody {
            success: false,
            code: status.as_u16(),
            message: NOT_FOUND_MESSAGE,
            errors: None,
            error: None,
        };

        match self {
            ApiError::Validation(errors) => {
                debug!(?errors, "request validation failed");
                body.message = VALIDATION_MESSAGE;
                body.errors = Some(errors);
            }
            ApiError::Body(detail) => {
                debug!(%detail, "request body rejected");
                body.message = VALIDATION_MESSAGE;
                body.error = Some(BODY_ERROR_HINT);
            }
            ApiError::NotFound => {}
            ApiError::Internal(detail) => {
                error!(error = %detail, "request failed");
                Span::current().record("otel.status_code", "ERROR");
                body.message = INTERNAL_MESSAGE;
            }
        }

        (status, Json(body)).into_response()
    }
}
