//! Project facts: the input to every deadline computation.
//!
//! Facts are produced upstream (project setup, date edits) and are treated as
//! an immutable snapshot for the duration of one computation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

// ─── Claimant and project classification ─────────────────────────────────────

/// The claimant's contractual position on the project.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  GeneralContractor,
  Subcontractor,
  Supplier,
  Laborer,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectType {
  Residential,
  Commercial,
}

// ─── Jurisdiction ────────────────────────────────────────────────────────────

/// A jurisdiction code such as `TX`. Codes are case-insensitive and always
/// held in upper case so table lookups are stable.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub struct Jurisdiction(String);

impl Jurisdiction {
  pub fn new(code: impl AsRef<str>) -> Self {
    Self(code.as_ref().trim().to_ascii_uppercase())
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl From<String> for Jurisdiction {
  fn from(s: String) -> Self { Self::new(s) }
}

impl From<&str> for Jurisdiction {
  fn from(s: &str) -> Self { Self::new(s) }
}

impl From<Jurisdiction> for String {
  fn from(j: Jurisdiction) -> Self { j.0 }
}

impl fmt::Display for Jurisdiction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Date facts ──────────────────────────────────────────────────────────────

/// Names one of the optional calendar dates in [`ProjectFacts`]. Rules select
/// their trigger through this, and [`crate::Error::MissingFact`] reports it.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DateFact {
  /// First day of the overall project.
  ProjectStart,
  /// First day the claimant furnished labor or materials.
  WorkStart,
  /// Last day the claimant furnished labor or materials.
  LastWork,
  /// Completion of the overall project.
  Completion,
}

/// Everything the rule engine knows about a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFacts {
  pub role:          Role,
  pub project_type:  ProjectType,
  pub jurisdiction:  Jurisdiction,
  #[serde(default)]
  pub project_start: Option<NaiveDate>,
  #[serde(default)]
  pub work_start:    Option<NaiveDate>,
  #[serde(default)]
  pub last_work:     Option<NaiveDate>,
  #[serde(default)]
  pub completion:    Option<NaiveDate>,
}

impl ProjectFacts {
  /// Facts with no dates recorded yet.
  pub fn new(
    role: Role,
    project_type: ProjectType,
    jurisdiction: impl Into<Jurisdiction>,
  ) -> Self {
    Self {
      role,
      project_type,
      jurisdiction: jurisdiction.into(),
      project_start: None,
      work_start: None,
      last_work: None,
      completion: None,
    }
  }

  pub fn date(&self, fact: DateFact) -> Option<NaiveDate> {
    match fact {
      DateFact::ProjectStart => self.project_start,
      DateFact::WorkStart => self.work_start,
      DateFact::LastWork => self.last_work,
      DateFact::Completion => self.completion,
    }
  }

  pub fn with_date(mut self, fact: DateFact, date: NaiveDate) -> Self {
    let slot = match fact {
      DateFact::ProjectStart => &mut self.project_start,
      DateFact::WorkStart => &mut self.work_start,
      DateFact::LastWork => &mut self.last_work,
      DateFact::Completion => &mut self.completion,
    };
    *slot = Some(date);
    self
  }
}
