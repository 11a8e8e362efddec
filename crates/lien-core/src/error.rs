//! Error types for `lien-core`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  deadline::Category,
  facts::{DateFact, Jurisdiction},
  service::SyncReport,
  status::DeadlineStatus,
};

/// The storage operation that was being attempted when a backend failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageOp {
  Create,
  Update,
  Read,
  Delete,
}

impl fmt::Display for StorageOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Create => "create",
      Self::Update => "update",
      Self::Read => "read",
      Self::Delete => "delete",
    })
  }
}

/// Identity of the record a storage operation targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
  Project(Uuid),
  Deadline(Uuid),
  ProjectCategory(Uuid, Category),
  User(Uuid),
  /// The open-deadline range scan behind reminder queries.
  DueRange,
}

impl fmt::Display for StorageTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Project(id) => write!(f, "project {id}"),
      Self::Deadline(id) => write!(f, "deadline {id}"),
      Self::ProjectCategory(id, cat) => write!(f, "project {id} / {cat}"),
      Self::User(id) => write!(f, "user {id}"),
      Self::DueRange => f.write_str("open deadlines by due date"),
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{category} requires the `{fact}` date, which is not set")]
  MissingFact { category: Category, fact: DateFact },

  #[error("no {category} rule applies in jurisdiction {jurisdiction}")]
  UnsupportedRule {
    category:     Category,
    jurisdiction: Jurisdiction,
  },

  #[error("deadline {deadline_id} cannot move from {from} to {to}")]
  InvalidTransition {
    deadline_id: Uuid,
    from:        DeadlineStatus,
    to:          DeadlineStatus,
  },

  #[error("{category} date computed from {trigger} is outside the supported calendar range")]
  DateOutOfRange { category: Category, trigger: DateFact },

  #[error("project not found: {0}")]
  ProjectNotFound(Uuid),

  #[error("deadline not found: {0}")]
  DeadlineNotFound(Uuid),

  #[error("storage {op} failed for {target}: {source}")]
  Storage {
    op:     StorageOp,
    target: StorageTarget,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("deadline sync partially applied: {} of {} writes failed", .0.failed().count(), .0.attempted())]
  PartialSync(Box<SyncReport>),
}

impl Error {
  /// Wrap a backend error with the attempted operation and record identity.
  pub fn storage<E>(op: StorageOp, target: StorageTarget, source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage { op, target, source: Box::new(source) }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
