//! Handler for `GET /reminders[?window_days=N]`.
//!
//! Returns the open deadlines, across all users, due within the window.
//! The window defaults to the service's urgency window.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use lien_core::{
  deadline::DeadlineView,
  service::DeadlineService,
  store::DeadlineStore,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ReminderParams {
  pub window_days: Option<u32>,
}

/// `GET /reminders[?window_days=N]`
pub async fn handler<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Query(params): Query<ReminderParams>,
) -> Result<Json<Vec<DeadlineView>>, ApiError> {
  let window = params
    .window_days
    .unwrap_or(service.policy().urgent_within_days);
  Ok(Json(service.get_deadlines_needing_reminders(window).await?))
}
