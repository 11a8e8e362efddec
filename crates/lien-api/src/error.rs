//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use lien_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unprocessable: {0}")]
  Unprocessable(String),

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Core(e) => match e {
        CoreError::ProjectNotFound(_) | CoreError::DeadlineNotFound(_) => {
          StatusCode::NOT_FOUND
        }
        CoreError::InvalidTransition { .. } | CoreError::PartialSync(_) => {
          StatusCode::CONFLICT
        }
        CoreError::MissingFact { .. }
        | CoreError::UnsupportedRule { .. }
        | CoreError::DateOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let body = match &self {
      ApiError::Core(CoreError::PartialSync(report)) => {
        json!({ "error": self.to_string(), "report": report })
      }
      _ => json!({ "error": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
