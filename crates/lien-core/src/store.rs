//! The `DeadlineStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `lien-store-sqlite`).
//! The lifecycle service and the API depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::deadline::{Category, DeadlineRecord, NewProject, Project};

/// One write of a sync batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadlineWrite {
  Insert(DeadlineRecord),
  Update(DeadlineRecord),
}

impl DeadlineWrite {
  pub fn record(&self) -> &DeadlineRecord {
    match self {
      Self::Insert(record) | Self::Update(record) => record,
    }
  }

  pub fn category(&self) -> Category { self.record().category }
}

/// Per-write result of [`DeadlineStore::apply_batch`]: `Ok(false)` means an
/// update found no record with that `deadline_id`.
pub type BatchOutcome<E> = Vec<Result<bool, E>>;

/// Abstraction over a deadline store backend.
///
/// Backends must enforce `(project_id, category)` as a unique key on
/// deadline records, and must surface their own timeouts as errors rather
/// than blocking indefinitely.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DeadlineStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Projects ──────────────────────────────────────────────────────────

  /// Create and persist a new project. `project_id` and `created_at` are
  /// assigned by the store.
  fn add_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  /// Retrieve a project by UUID. Returns `None` if not found.
  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  /// List the projects owned by `user_id`.
  fn list_projects(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Project>, Self::Error>> + Send + '_;

  /// Delete a project and, in the same transaction, all of its deadlines.
  /// Returns `false` if the project did not exist.
  fn delete_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Deadlines ─────────────────────────────────────────────────────────

  /// Insert a new record. Fails if the project already has a record for the
  /// same category.
  fn insert_deadline(
    &self,
    record: DeadlineRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Overwrite the record with the same `deadline_id`. Returns `false` if no
  /// such record exists.
  fn update_deadline(
    &self,
    record: DeadlineRecord,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Apply `writes` as one unit of visibility: readers observe either none
  /// of them or every write that succeeded. A failing write is undone on its
  /// own and reported in its slot without aborting the others. The outer
  /// error means nothing was applied.
  fn apply_batch(
    &self,
    writes: Vec<DeadlineWrite>,
  ) -> impl Future<Output = Result<BatchOutcome<Self::Error>, Self::Error>> + Send + '_;

  fn get_deadline(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DeadlineRecord>, Self::Error>> + Send + '_;

  fn deadlines_for_project(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DeadlineRecord>, Self::Error>> + Send + '_;

  fn deadlines_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DeadlineRecord>, Self::Error>> + Send + '_;

  /// Records not yet completed whose deadline falls in `from..=to`, across
  /// all users.
  fn open_deadlines_due_between(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DeadlineRecord>, Self::Error>> + Send + '_;

  /// Hard delete. Returns `false` if the record did not exist.
  fn delete_deadline(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
