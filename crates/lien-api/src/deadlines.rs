//! Handlers for `/deadlines` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/deadlines/:id` | Single derived view |
//! | `DELETE` | `/deadlines/:id` | Hard delete, for corrections |
//! | `POST`   | `/deadlines/:id/status` | Body: `{"status":"completed","note":"..."}` |
//! | `POST`   | `/deadlines/:id/reopen` | Clears the completion marker |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use lien_core::{
  deadline::DeadlineView,
  service::DeadlineService,
  status::DeadlineStatus,
  store::DeadlineStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /deadlines/:id`
pub async fn get_one<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DeadlineView>, ApiError> {
  Ok(Json(service.get_deadline(id).await?))
}

/// `DELETE /deadlines/:id`
pub async fn delete_one<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  service.delete_deadline(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: DeadlineStatus,
  /// Free text kept with a completion, e.g. a certified-mail tracking number.
  pub note:   Option<String>,
}

/// `POST /deadlines/:id/status`
pub async fn set_status<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<DeadlineView>, ApiError> {
  Ok(Json(service.update_deadline_status(id, body.status, body.note).await?))
}

/// `POST /deadlines/:id/reopen`
pub async fn reopen<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DeadlineView>, ApiError> {
  Ok(Json(service.reopen_deadline(id).await?))
}
