//! Deadline records and the project envelope that owns them.
//!
//! A [`DeadlineRecord`] stores only what the rule engine produced plus the
//! authoritative completion marker. Status, urgency, and days remaining are
//! never stored; they are derived on every read into a [`DeadlineView`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

use crate::{
  facts::{DateFact, Jurisdiction, ProjectFacts},
  rules::RuleApplication,
  status::{Classification, DeadlineStatus, Urgency, UrgencyPolicy},
};

// ─── Category ────────────────────────────────────────────────────────────────

/// The kind of statutory deadline. `(project_id, category)` is a natural key.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
  PreliminaryNotice,
  MechanicsLien,
  FundsTrapping,
  RetentionRelease,
}

impl Category {
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }
}

// ─── Project ─────────────────────────────────────────────────────────────────

/// A thin envelope tying deadlines to the user who owns the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub project_id: Uuid,
  pub user_id:    Uuid,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::DeadlineStore::add_project`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
  pub user_id: Uuid,
  pub name:    String,
}

// ─── DeadlineRecord ──────────────────────────────────────────────────────────

/// The persisted result of applying one rule to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineRecord {
  pub deadline_id:   Uuid,
  pub project_id:    Uuid,
  pub user_id:       Uuid,
  pub category:      Category,
  pub deadline_date: NaiveDate,
  pub jurisdiction:  Jurisdiction,
  /// Which project date the rule was keyed on.
  pub trigger:       DateFact,
  pub trigger_date:  NaiveDate,
  /// Snapshot of the facts the deadline was derived from.
  pub facts:         ProjectFacts,
  /// Set only by an explicit completion (notice sent, lien filed, ...).
  pub completed_at:  Option<DateTime<Utc>>,
  pub note:          Option<String>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl DeadlineRecord {
  /// A fresh, open record for `application`.
  pub fn new(
    project: &Project,
    application: RuleApplication,
    facts: ProjectFacts,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      deadline_id: Uuid::new_v4(),
      project_id: project.project_id,
      user_id: project.user_id,
      category: application.category,
      deadline_date: application.deadline_date,
      jurisdiction: application.jurisdiction,
      trigger: application.trigger,
      trigger_date: application.trigger_date,
      facts,
      completed_at: None,
      note: None,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn is_completed(&self) -> bool { self.completed_at.is_some() }

  /// Whether `application` (derived from `facts`) would change this record.
  pub fn matches(&self, application: &RuleApplication, facts: &ProjectFacts) -> bool {
    self.deadline_date == application.deadline_date
      && self.trigger == application.trigger
      && self.trigger_date == application.trigger_date
      && self.jurisdiction == application.jurisdiction
      && &self.facts == facts
  }

  /// Recompute in place, keeping identity, creation time, and completion.
  pub fn reapply(
    &mut self,
    application: RuleApplication,
    facts: ProjectFacts,
    now: DateTime<Utc>,
  ) {
    self.deadline_date = application.deadline_date;
    self.jurisdiction = application.jurisdiction;
    self.trigger = application.trigger;
    self.trigger_date = application.trigger_date;
    self.facts = facts;
    self.updated_at = now;
  }

  /// Derive the read model for this record at `now`.
  pub fn view(self, now: DateTime<Utc>, policy: UrgencyPolicy) -> DeadlineView {
    let classification =
      Classification::at(self.deadline_date, now, self.is_completed(), policy);
    DeadlineView {
      status: classification.status,
      urgency: classification.urgency,
      days_remaining: classification.days_remaining,
      record: self,
    }
  }
}

// ─── DeadlineView ────────────────────────────────────────────────────────────

/// A record plus its status as of the moment it was read. Never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineView {
  #[serde(flatten)]
  pub record:         DeadlineRecord,
  pub status:         DeadlineStatus,
  pub urgency:        Urgency,
  pub days_remaining: i64,
}
