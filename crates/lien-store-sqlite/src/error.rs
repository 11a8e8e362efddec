//! Error type for `lien-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored discriminant no longer maps onto a domain enum.
  #[error("unknown {kind} value in store: {value:?}")]
  UnknownValue { kind: &'static str, value: String },

  /// The project already has a deadline of this category.
  #[error("project {project_id} already has a {category} deadline")]
  Conflict {
    project_id: uuid::Uuid,
    category:   String,
  },

  #[error("project not found: {0}")]
  ProjectNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
