//! Handler for `POST /calculate`.
//!
//! Stateless rule evaluation: nothing is persisted. The body carries the
//! project facts plus an optional list of categories; all categories are
//! evaluated when the list is omitted. In that case categories the facts
//! cannot satisfy come back under `skipped` with the reason. A category named
//! explicitly in `categories` must be computable, otherwise the request fails
//! with 422.

use std::sync::Arc;

use axum::{Json, extract::State};
use lien_core::{
  Error,
  deadline::Category,
  facts::ProjectFacts,
  rules::Evaluation,
  service::DeadlineService,
  store::DeadlineStore,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CalculateBody {
  #[serde(flatten)]
  pub facts:      ProjectFacts,
  #[serde(default)]
  pub categories: Option<Vec<Category>>,
}

#[derive(Debug, Serialize)]
pub struct SkippedCategory {
  pub deadline_type: Category,
  pub reason:        String,
}

#[derive(Debug, Serialize)]
pub struct CalculateResponse {
  pub deadlines: Vec<Evaluation>,
  pub skipped:   Vec<SkippedCategory>,
}

/// `POST /calculate`
pub async fn handler<S: DeadlineStore>(
  State(service): State<Arc<DeadlineService<S>>>,
  Json(body): Json<CalculateBody>,
) -> Result<Json<CalculateResponse>, ApiError> {
  if !service.rules().supports(&body.facts.jurisdiction) {
    return Err(ApiError::Unprocessable(format!(
      "unsupported jurisdiction: {}",
      body.facts.jurisdiction
    )));
  }

  let explicit = body.categories.is_some();
  let categories = body
    .categories
    .unwrap_or_else(|| Category::all().collect());

  let mut response = CalculateResponse { deadlines: Vec::new(), skipped: Vec::new() };
  for category in categories {
    match service.evaluate(category, &body.facts) {
      Ok(evaluation) => response.deadlines.push(evaluation),
      Err(e @ (Error::MissingFact { .. } | Error::UnsupportedRule { .. })) if !explicit => {
        response.skipped.push(SkippedCategory {
          deadline_type: category,
          reason:        e.to_string(),
        });
      }
      Err(e) => return Err(e.into()),
    }
  }
  Ok(Json(response))
}
