//! The deadline lifecycle service.
//!
//! Orchestrates rule evaluation against a project's current facts, keeps the
//! persisted set of [`DeadlineRecord`]s in step with them, and answers the
//! reminder and dashboard queries. Status is always derived at read time from
//! the injected [`Clock`]; nothing derived is trusted from storage.
//!
//! The service performs no retries. Storage failures surface immediately as
//! [`Error::Storage`]; during a bulk sync they are collected per category into
//! a [`SyncReport`]. A sync's writes go to the store as one batch, so readers
//! never see a project with only part of a recomputation applied.

use std::{
  collections::{BTreeMap, HashMap},
  sync::Arc,
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  calendar,
  clock::{Clock, SystemClock},
  deadline::{Category, DeadlineRecord, DeadlineView, NewProject, Project},
  error::{StorageOp, StorageTarget},
  facts::{DateFact, ProjectFacts},
  rules::{Evaluation, RuleTable},
  status::{DeadlineStatus, Urgency, UrgencyPolicy},
  store::{DeadlineStore, DeadlineWrite},
};

// ─── Sync report ─────────────────────────────────────────────────────────────

/// Why a category produced no write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
  /// The trigger date for this category is not (or no longer) known.
  MissingFact { fact: DateFact },
  /// The jurisdiction has no rule for this category and these facts.
  NoRule,
}

/// What happened to one category during a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CategoryOutcome {
  Created { deadline: DeadlineRecord },
  Updated { deadline: DeadlineRecord },
  /// Recomputation produced the same deadline; nothing was written.
  Unchanged { deadline_id: Uuid },
  /// The record is completed and was left as is.
  KeptCompleted { deadline_id: Uuid },
  Skipped { reason: SkipReason },
  Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryResult {
  pub category: Category,
  #[serde(flatten)]
  pub outcome:  CategoryOutcome,
}

/// Per-category account of a create or update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub project_id: Uuid,
  pub results:    Vec<CategoryResult>,
}

impl SyncReport {
  pub fn outcome(&self, category: Category) -> Option<&CategoryOutcome> {
    self
      .results
      .iter()
      .find(|r| r.category == category)
      .map(|r| &r.outcome)
  }

  pub fn failed(&self) -> impl Iterator<Item = &CategoryResult> {
    self
      .results
      .iter()
      .filter(|r| matches!(r.outcome, CategoryOutcome::Failed { .. }))
  }

  /// Categories for which a write was attempted, successful or not.
  pub fn attempted(&self) -> usize {
    self
      .results
      .iter()
      .filter(|r| {
        matches!(
          r.outcome,
          CategoryOutcome::Created { .. }
            | CategoryOutcome::Updated { .. }
            | CategoryOutcome::Failed { .. }
        )
      })
      .count()
  }

  pub fn is_complete(&self) -> bool { self.failed().next().is_none() }
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// Aggregate counts over all of a user's deadlines.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
  pub total:         usize,
  pub upcoming:      usize,
  /// Subset of `upcoming` inside the urgency window.
  pub urgent:        usize,
  pub overdue:       usize,
  pub completed:     usize,
  pub by_category:   BTreeMap<Category, usize>,
  /// The soonest deadline that is still upcoming.
  pub next_deadline: Option<DeadlineView>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncMode {
  Create,
  Update,
}

pub struct DeadlineService<S> {
  store:  Arc<S>,
  rules:  RuleTable,
  policy: UrgencyPolicy,
  clock:  Arc<dyn Clock>,
}

impl<S> Clone for DeadlineService<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      rules:  self.rules.clone(),
      policy: self.policy,
      clock:  self.clock.clone(),
    }
  }
}

impl<S: DeadlineStore> DeadlineService<S> {
  /// A service using the baseline rule table, the default urgency window,
  /// and the system clock.
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      rules: RuleTable::baseline(),
      policy: UrgencyPolicy::default(),
      clock: Arc::new(SystemClock),
    }
  }

  pub fn with_rules(mut self, rules: RuleTable) -> Self {
    self.rules = rules;
    self
  }

  pub fn with_policy(mut self, policy: UrgencyPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_clock(mut self, clock: impl Clock) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn rules(&self) -> &RuleTable { &self.rules }

  pub fn policy(&self) -> UrgencyPolicy { self.policy }

  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }

  fn view(&self, record: DeadlineRecord, now: DateTime<Utc>) -> DeadlineView {
    record.view(now, self.policy)
  }

  fn views(&self, records: Vec<DeadlineRecord>, now: DateTime<Utc>) -> Vec<DeadlineView> {
    let mut views: Vec<_> =
      records.into_iter().map(|r| self.view(r, now)).collect();
    views.sort_by_key(|v| (v.record.deadline_date, v.record.category));
    views
  }

  // ── Projects ──────────────────────────────────────────────────────────

  pub async fn create_project(&self, input: NewProject) -> Result<Project> {
    let user_id = input.user_id;
    let project = self
      .store
      .add_project(input)
      .await
      .map_err(|e| Error::storage(StorageOp::Create, StorageTarget::User(user_id), e))?;
    tracing::info!(project_id = %project.project_id, %user_id, "created project");
    Ok(project)
  }

  pub async fn get_project(&self, project_id: Uuid) -> Result<Project> {
    self
      .store
      .get_project(project_id)
      .await
      .map_err(|e| {
        Error::storage(StorageOp::Read, StorageTarget::Project(project_id), e)
      })?
      .ok_or(Error::ProjectNotFound(project_id))
  }

  pub async fn list_projects(&self, user_id: Uuid) -> Result<Vec<Project>> {
    self
      .store
      .list_projects(user_id)
      .await
      .map_err(|e| Error::storage(StorageOp::Read, StorageTarget::User(user_id), e))
  }

  /// Delete a project together with all of its deadlines.
  pub async fn delete_project(&self, project_id: Uuid) -> Result<()> {
    let deleted = self
      .store
      .delete_project(project_id)
      .await
      .map_err(|e| {
        Error::storage(StorageOp::Delete, StorageTarget::Project(project_id), e)
      })?;
    if !deleted {
      return Err(Error::ProjectNotFound(project_id));
    }
    tracing::info!(%project_id, "deleted project and its deadlines");
    Ok(())
  }

  // ── Rule evaluation ───────────────────────────────────────────────────

  /// Stateless evaluation of one category against the current clock.
  pub fn evaluate(
    &self,
    category: Category,
    facts: &ProjectFacts,
  ) -> Result<Evaluation> {
    self.rules.evaluate(category, facts, self.now(), self.policy)
  }

  // ── Sync ──────────────────────────────────────────────────────────────

  /// Compute and persist every category `facts` satisfy. Categories whose
  /// trigger date is absent, or that the jurisdiction does not define, are
  /// skipped. A category that already has a record fails with the store's
  /// uniqueness error; use [`update_project_deadlines`](Self::update_project_deadlines)
  /// to recompute.
  pub async fn create_project_deadlines(
    &self,
    project_id: Uuid,
    facts: ProjectFacts,
  ) -> Result<SyncReport> {
    self.sync(project_id, facts, SyncMode::Create).await
  }

  /// Recompute every category in place. Completed records are never touched;
  /// records whose trigger date has disappeared are left as they are.
  pub async fn update_project_deadlines(
    &self,
    project_id: Uuid,
    facts: ProjectFacts,
  ) -> Result<SyncReport> {
    self.sync(project_id, facts, SyncMode::Update).await
  }

  async fn sync(
    &self,
    project_id: Uuid,
    facts: ProjectFacts,
    mode: SyncMode,
  ) -> Result<SyncReport> {
    let project = self.get_project(project_id).await?;
    let now = self.now();

    let mut existing: HashMap<Category, DeadlineRecord> = match mode {
      SyncMode::Create => HashMap::new(),
      SyncMode::Update => self
        .store
        .deadlines_for_project(project_id)
        .await
        .map_err(|e| {
          Error::storage(StorageOp::Read, StorageTarget::Project(project_id), e)
        })?
        .into_iter()
        .map(|r| (r.category, r))
        .collect(),
    };

    let mut results = Vec::new();
    let mut writes = Vec::new();
    let mut unsupported = None;
    let mut any_rule = false;

    for category in Category::all() {
      let application = match self.rules.apply(category, &facts) {
        Ok(application) => application,
        Err(Error::MissingFact { fact, .. }) => {
          any_rule = true;
          tracing::debug!(%project_id, %category, %fact, "skipping category");
          results.push(CategoryResult {
            category,
            outcome: CategoryOutcome::Skipped {
              reason: SkipReason::MissingFact { fact },
            },
          });
          continue;
        }
        Err(e @ Error::UnsupportedRule { .. }) => {
          unsupported.get_or_insert(e);
          results.push(CategoryResult {
            category,
            outcome: CategoryOutcome::Skipped { reason: SkipReason::NoRule },
          });
          continue;
        }
        Err(e) => {
          any_rule = true;
          tracing::warn!(%project_id, %category, error = %e, "rule evaluation failed");
          results.push(CategoryResult {
            category,
            outcome: CategoryOutcome::Failed { error: e.to_string() },
          });
          continue;
        }
      };
      any_rule = true;

      match existing.remove(&category) {
        Some(record) if record.is_completed() => {
          results.push(CategoryResult {
            category,
            outcome: CategoryOutcome::KeptCompleted {
              deadline_id: record.deadline_id,
            },
          });
        }
        Some(record) if record.matches(&application, &facts) => {
          results.push(CategoryResult {
            category,
            outcome: CategoryOutcome::Unchanged {
              deadline_id: record.deadline_id,
            },
          });
        }
        Some(mut record) => {
          record.reapply(application, facts.clone(), now);
          writes.push(DeadlineWrite::Update(record));
        }
        None => {
          let record =
            DeadlineRecord::new(&project, application, facts.clone(), now);
          writes.push(DeadlineWrite::Insert(record));
        }
      }
    }

    // Nothing in the table applies at all: a configuration problem rather
    // than a project that is merely missing dates.
    if !any_rule && let Some(e) = unsupported {
      return Err(e);
    }

    results.extend(self.apply(project_id, writes).await?);
    results.sort_by_key(|r| r.category);

    let report = SyncReport { project_id, results };
    if !report.is_complete() {
      for failure in report.failed() {
        if let CategoryOutcome::Failed { error } = &failure.outcome {
          tracing::warn!(%project_id, category = %failure.category, %error, "deadline write failed");
        }
      }
      return Err(Error::PartialSync(Box::new(report)));
    }

    tracing::info!(
      %project_id,
      written = report.attempted(),
      ?mode,
      "synced project deadlines"
    );
    Ok(report)
  }

  /// Send one sync's writes to the store as a single batch and turn the
  /// per-write results into report entries.
  async fn apply(
    &self,
    project_id: Uuid,
    writes: Vec<DeadlineWrite>,
  ) -> Result<Vec<CategoryResult>> {
    if writes.is_empty() {
      return Ok(Vec::new());
    }

    let outcomes = self
      .store
      .apply_batch(writes.clone())
      .await
      .map_err(|e| {
        Error::storage(StorageOp::Update, StorageTarget::Project(project_id), e)
      })?;

    Ok(
      writes
        .into_iter()
        .zip(outcomes)
        .map(|(write, outcome)| {
          let category = write.category();
          let target = StorageTarget::ProjectCategory(project_id, category);
          let outcome = match (write, outcome) {
            (DeadlineWrite::Insert(deadline), Ok(_)) => {
              CategoryOutcome::Created { deadline }
            }
            (DeadlineWrite::Update(deadline), Ok(true)) => {
              CategoryOutcome::Updated { deadline }
            }
            (DeadlineWrite::Update(deadline), Ok(false)) => CategoryOutcome::Failed {
              error: Error::DeadlineNotFound(deadline.deadline_id).to_string(),
            },
            (DeadlineWrite::Insert(_), Err(e)) => CategoryOutcome::Failed {
              error: Error::storage(StorageOp::Create, target, e).to_string(),
            },
            (DeadlineWrite::Update(_), Err(e)) => CategoryOutcome::Failed {
              error: Error::storage(StorageOp::Update, target, e).to_string(),
            },
          };
          CategoryResult { category, outcome }
        })
        .collect(),
    )
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn fetch_deadlines_by_project(
    &self,
    project_id: Uuid,
  ) -> Result<Vec<DeadlineView>> {
    let records = self
      .store
      .deadlines_for_project(project_id)
      .await
      .map_err(|e| {
        Error::storage(StorageOp::Read, StorageTarget::Project(project_id), e)
      })?;
    Ok(self.views(records, self.now()))
  }

  pub async fn fetch_deadlines_by_user(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<DeadlineView>> {
    let records = self
      .store
      .deadlines_for_user(user_id)
      .await
      .map_err(|e| Error::storage(StorageOp::Read, StorageTarget::User(user_id), e))?;
    Ok(self.views(records, self.now()))
  }

  async fn load_deadline(&self, deadline_id: Uuid) -> Result<DeadlineRecord> {
    self
      .store
      .get_deadline(deadline_id)
      .await
      .map_err(|e| {
        Error::storage(StorageOp::Read, StorageTarget::Deadline(deadline_id), e)
      })?
      .ok_or(Error::DeadlineNotFound(deadline_id))
  }

  pub async fn get_deadline(&self, deadline_id: Uuid) -> Result<DeadlineView> {
    let record = self.load_deadline(deadline_id).await?;
    Ok(self.view(record, self.now()))
  }

  // ── Status transitions ────────────────────────────────────────────────

  async fn store_update(&self, record: DeadlineRecord) -> Result<DeadlineRecord> {
    let deadline_id = record.deadline_id;
    let found = self
      .store
      .update_deadline(record.clone())
      .await
      .map_err(|e| {
        Error::storage(StorageOp::Update, StorageTarget::Deadline(deadline_id), e)
      })?;
    if !found {
      return Err(Error::DeadlineNotFound(deadline_id));
    }
    Ok(record)
  }

  /// The only path that marks a deadline completed.
  ///
  /// Completing an already-completed record is a no-op. Asking a completed
  /// record for any other status fails with [`Error::InvalidTransition`]; use
  /// [`reopen_deadline`](Self::reopen_deadline). Asking an open record for
  /// `upcoming` or `overdue` changes nothing, since those are derived.
  pub async fn update_deadline_status(
    &self,
    deadline_id: Uuid,
    status: DeadlineStatus,
    note: Option<String>,
  ) -> Result<DeadlineView> {
    let mut record = self.load_deadline(deadline_id).await?;
    let now = self.now();

    match (record.is_completed(), status) {
      (true, DeadlineStatus::Completed) => {}
      (true, to) => {
        return Err(Error::InvalidTransition {
          deadline_id,
          from: DeadlineStatus::Completed,
          to,
        });
      }
      (false, DeadlineStatus::Completed) => {
        record.completed_at = Some(now);
        record.note = note;
        record.updated_at = now;
        record = self.store_update(record).await?;
        tracing::info!(%deadline_id, category = %record.category, "deadline completed");
      }
      (false, _) => {}
    }

    Ok(self.view(record, now))
  }

  /// Clear the completion marker of a completed deadline.
  pub async fn reopen_deadline(&self, deadline_id: Uuid) -> Result<DeadlineView> {
    let mut record = self.load_deadline(deadline_id).await?;
    let now = self.now();

    if !record.is_completed() {
      let from = record.clone().view(now, self.policy).status;
      return Err(Error::InvalidTransition {
        deadline_id,
        from,
        to: DeadlineStatus::Upcoming,
      });
    }

    record.completed_at = None;
    record.updated_at = now;
    let record = self.store_update(record).await?;
    tracing::info!(%deadline_id, category = %record.category, "deadline reopened");
    Ok(self.view(record, now))
  }

  /// Hard delete, for corrections only.
  pub async fn delete_deadline(&self, deadline_id: Uuid) -> Result<()> {
    let deleted = self
      .store
      .delete_deadline(deadline_id)
      .await
      .map_err(|e| {
        Error::storage(StorageOp::Delete, StorageTarget::Deadline(deadline_id), e)
      })?;
    if !deleted {
      return Err(Error::DeadlineNotFound(deadline_id));
    }
    tracing::info!(%deadline_id, "deleted deadline");
    Ok(())
  }

  // ── Aggregates ────────────────────────────────────────────────────────

  pub async fn get_dashboard_stats(&self, user_id: Uuid) -> Result<DashboardStats> {
    let views = self.fetch_deadlines_by_user(user_id).await?;
    let mut stats = DashboardStats { total: views.len(), ..Default::default() };

    for view in &views {
      match view.status {
        DeadlineStatus::Upcoming => {
          stats.upcoming += 1;
          if view.urgency == Urgency::Urgent {
            stats.urgent += 1;
          }
        }
        DeadlineStatus::Overdue => stats.overdue += 1,
        DeadlineStatus::Completed => stats.completed += 1,
      }
      *stats.by_category.entry(view.record.category).or_default() += 1;
    }

    // Views are sorted by date, so the first upcoming one is the next due.
    stats.next_deadline = views
      .into_iter()
      .find(|v| v.status == DeadlineStatus::Upcoming);
    Ok(stats)
  }

  /// Open deadlines due within `window_days` days from today, inclusive.
  /// Overdue and completed deadlines are never returned.
  pub async fn get_deadlines_needing_reminders(
    &self,
    window_days: u32,
  ) -> Result<Vec<DeadlineView>> {
    let now = self.now();
    let today = now.date_naive();
    let until = calendar::add_days(today, window_days).unwrap_or(NaiveDate::MAX);

    let records = self
      .store
      .open_deadlines_due_between(today, until)
      .await
      .map_err(|e| Error::storage(StorageOp::Read, StorageTarget::DueRange, e))?;

    let window = i64::from(window_days);
    Ok(
      self
        .views(records, now)
        .into_iter()
        .filter(|v| {
          v.status == DeadlineStatus::Upcoming
            && (0..=window).contains(&v.days_remaining)
        })
        .collect(),
    )
  }
}
