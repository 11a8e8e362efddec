//! Handlers for `/projects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/projects?user_id=<id>` | Projects owned by one user |
//! | `POST`   | `/projects` | Body: `{"user_id":"...","name":"..."}`; returns 201 |
//! | `GET`    | `/projects/:id` | 404 if not found |
//! | `DELETE` | `/projects/:id` | Also deletes every deadline of the project |
//! | `GET`    | `/projects/:id/deadlines` | Derived views, soonest first |
//! | `POST`   | `/projects/:id/deadlines` | Body: `ProjectFacts`; first computation |
//! | `PUT`    | `/projects/:id/deadlines` | Body: `ProjectFacts`; recompute in place |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use lien_core::{
  deadline::{DeadlineView, NewProject, Project},
  facts::ProjectFacts,
  service::{DeadlineService, SyncReport},
  store::DeadlineStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub user_id: Uuid,
}

/// `GET /projects?user_id=<id>`
pub async fn list<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Project>>, ApiError> {
  Ok(Json(service.list_projects(params.user_id).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /projects`
pub async fn create<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Json(body): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError> {
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("project name must not be empty".into()));
  }
  let project = service.create_project(body).await?;
  Ok((StatusCode::CREATED, Json(project)))
}

// ─── Get / delete ─────────────────────────────────────────────────────────────

/// `GET /projects/:id`
pub async fn get_one<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
  Ok(Json(service.get_project(id).await?))
}

/// `DELETE /projects/:id`
pub async fn delete_one<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  service.delete_project(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Deadlines ────────────────────────────────────────────────────────────────

/// `GET /projects/:id/deadlines`
pub async fn deadlines<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<DeadlineView>>, ApiError> {
  // Distinguish an unknown project from one with no deadlines yet.
  service.get_project(id).await?;
  Ok(Json(service.fetch_deadlines_by_project(id).await?))
}

/// `POST /projects/:id/deadlines`: returns 201 + the [`SyncReport`].
pub async fn create_deadlines<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(id): Path<Uuid>,
  Json(facts): Json<ProjectFacts>,
) -> Result<impl IntoResponse, ApiError> {
  let report = service.create_project_deadlines(id, facts).await?;
  Ok((StatusCode::CREATED, Json(report)))
}

/// `PUT /projects/:id/deadlines`
pub async fn update_deadlines<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Path(id): Path<Uuid>,
  Json(facts): Json<ProjectFacts>,
) -> Result<Json<SyncReport>, ApiError> {
  Ok(Json(service.update_project_deadlines(id, facts).await?))
}
