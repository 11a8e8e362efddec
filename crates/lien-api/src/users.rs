//! Handlers for per-user aggregate endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users/:id/deadlines` | Every deadline across the user's projects |
//! | `GET`  | `/users/:id/stats` | Dashboard counts |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use lien_core::{
  deadline::DeadlineView,
  service::{DashboardStats, DeadlineService},
  store::DeadlineStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /users/:id/deadlines`
pub async fn deadlines<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<DeadlineView>>, ApiError> {
  Ok(Json(service.fetch_deadlines_by_user(user_id).await?))
}

/// `GET /users/:id/stats`
pub async fn stats<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<DashboardStats>, ApiError> {
  Ok(Json(service.get_dashboard_stats(user_id).await?))
}
