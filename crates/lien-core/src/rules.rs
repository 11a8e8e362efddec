//! The deadline rule engine.
//!
//! Rules are data: a [`RuleTable`] maps `jurisdiction → category → clauses`.
//! Each [`RuleClause`] says when it applies (role / project type), which
//! project date triggers it, and how the deadline is offset from that date.
//! The first clause whose condition matches the facts wins.
//!
//! Everything here is pure. Callers inject `now`; the system clock is never
//! read.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  calendar,
  deadline::Category,
  facts::{DateFact, Jurisdiction, ProjectFacts, ProjectType, Role},
  status::{Classification, DeadlineStatus, Urgency, UrgencyPolicy},
};

/// Code of the jurisdiction whose rules ship built in.
pub const BASELINE_JURISDICTION: &str = "TX";

// ─── Clause building blocks ──────────────────────────────────────────────────

/// When a clause applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
  #[default]
  Always,
  /// The claimant holds one of these roles.
  Role { roles: Vec<Role> },
  ProjectType { project_type: ProjectType },
}

impl Condition {
  pub fn matches(&self, facts: &ProjectFacts) -> bool {
    match self {
      Self::Always => true,
      Self::Role { roles } => roles.contains(&facts.role),
      Self::ProjectType { project_type } => *project_type == facts.project_type,
    }
  }
}

/// How a deadline is derived from its trigger date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Offset {
  /// `day` of the month `months_after` months past the trigger month.
  DayOfMonth { months_after: u32, day: u32 },
  /// Whole calendar months, clamped to the end of shorter months.
  Months { months: u32 },
  /// Fixed number of calendar days.
  Days { days: u32 },
}

impl Offset {
  pub fn apply(self, trigger: NaiveDate) -> Option<NaiveDate> {
    match self {
      Self::DayOfMonth { months_after, day } => {
        calendar::day_of_month_after(trigger, months_after, day)
      }
      Self::Months { months } => calendar::add_months(trigger, months),
      Self::Days { days } => calendar::add_days(trigger, days),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleClause {
  #[serde(default)]
  pub when:    Condition,
  pub trigger: DateFact,
  pub offset:  Offset,
}

impl RuleClause {
  pub fn new(when: Condition, trigger: DateFact, offset: Offset) -> Self {
    Self { when, trigger, offset }
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// A recorded rule application: the only legitimate source of a deadline date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleApplication {
  pub category:      Category,
  pub jurisdiction:  Jurisdiction,
  pub trigger:       DateFact,
  pub trigger_date:  NaiveDate,
  pub deadline_date: NaiveDate,
}

/// A rule application classified at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
  #[serde(rename = "deadline_type")]
  pub category:       Category,
  pub deadline_date:  NaiveDate,
  pub status:         DeadlineStatus,
  pub urgency:        Urgency,
  pub days_remaining: i64,
  pub jurisdiction:   Jurisdiction,
  pub trigger:        DateFact,
  pub trigger_date:   NaiveDate,
}

// ─── RuleTable ───────────────────────────────────────────────────────────────

type CategoryRules = BTreeMap<Category, Vec<RuleClause>>;

/// `jurisdiction → category → clauses`. Serialises as a nested map, so extra
/// jurisdictions can be loaded from a config file and merged over the
/// baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
  jurisdictions: BTreeMap<Jurisdiction, CategoryRules>,
}

impl RuleTable {
  /// The built-in table for [`BASELINE_JURISDICTION`].
  pub fn baseline() -> Self {
    use Condition as C;
    let mut table = Self::default();
    let tx = Jurisdiction::new(BASELINE_JURISDICTION);
    // "15th day of the second month", counting the trigger month as the first.
    let notice_day = Offset::DayOfMonth { months_after: 1, day: 15 };

    table
      .insert(tx.clone(), Category::PreliminaryNotice, vec![
        RuleClause::new(
          C::Role { roles: vec![Role::GeneralContractor] },
          DateFact::ProjectStart,
          notice_day,
        ),
        RuleClause::new(
          C::Role {
            roles: vec![Role::Subcontractor, Role::Supplier, Role::Laborer],
          },
          DateFact::WorkStart,
          notice_day,
        ),
      ])
      .insert(tx.clone(), Category::MechanicsLien, vec![
        RuleClause::new(
          C::ProjectType { project_type: ProjectType::Residential },
          DateFact::LastWork,
          Offset::Months { months: 4 },
        ),
        RuleClause::new(
          C::ProjectType { project_type: ProjectType::Commercial },
          DateFact::Completion,
          Offset::Months { months: 3 },
        ),
      ])
      .insert(tx.clone(), Category::FundsTrapping, vec![RuleClause::new(
        C::Always,
        DateFact::ProjectStart,
        notice_day,
      )])
      .insert(tx, Category::RetentionRelease, vec![RuleClause::new(
        C::Always,
        DateFact::Completion,
        Offset::Days { days: 30 },
      )]);
    table
  }

  /// Set the clauses for one jurisdiction/category pair, replacing any
  /// existing ones.
  pub fn insert(
    &mut self,
    jurisdiction: Jurisdiction,
    category: Category,
    clauses: Vec<RuleClause>,
  ) -> &mut Self {
    self
      .jurisdictions
      .entry(jurisdiction)
      .or_default()
      .insert(category, clauses);
    self
  }

  /// Overlay `other` on this table. Pairs present in `other` win.
  pub fn merge(&mut self, other: RuleTable) -> &mut Self {
    for (jurisdiction, categories) in other.jurisdictions {
      let slot = self.jurisdictions.entry(jurisdiction).or_default();
      slot.extend(categories);
    }
    self
  }

  pub fn jurisdictions(&self) -> impl Iterator<Item = &Jurisdiction> {
    self.jurisdictions.keys()
  }

  pub fn supports(&self, jurisdiction: &Jurisdiction) -> bool {
    self.jurisdictions.contains_key(jurisdiction)
  }

  pub fn clauses(
    &self,
    jurisdiction: &Jurisdiction,
    category: Category,
  ) -> Option<&[RuleClause]> {
    self
      .jurisdictions
      .get(jurisdiction)
      .and_then(|rules| rules.get(&category))
      .map(Vec::as_slice)
  }

  /// Compute the deadline date for `category` from `facts`.
  ///
  /// Fails with [`Error::UnsupportedRule`] if the jurisdiction has no clause
  /// for this category matching the facts, and with [`Error::MissingFact`] if
  /// the matching clause's trigger date is absent. A missing date is never
  /// replaced by a default.
  pub fn apply(
    &self,
    category: Category,
    facts: &ProjectFacts,
  ) -> Result<RuleApplication> {
    let unsupported = || Error::UnsupportedRule {
      category,
      jurisdiction: facts.jurisdiction.clone(),
    };

    let clause = self
      .clauses(&facts.jurisdiction, category)
      .ok_or_else(unsupported)?
      .iter()
      .find(|clause| clause.when.matches(facts))
      .ok_or_else(unsupported)?;

    let trigger_date = facts
      .date(clause.trigger)
      .ok_or(Error::MissingFact { category, fact: clause.trigger })?;

    let deadline_date = clause
      .offset
      .apply(trigger_date)
      .ok_or(Error::DateOutOfRange { category, trigger: clause.trigger })?;

    Ok(RuleApplication {
      category,
      jurisdiction: facts.jurisdiction.clone(),
      trigger: clause.trigger,
      trigger_date,
      deadline_date,
    })
  }

  /// [`apply`](Self::apply) and classify the result as of `now`.
  pub fn evaluate(
    &self,
    category: Category,
    facts: &ProjectFacts,
    now: DateTime<Utc>,
    policy: UrgencyPolicy,
  ) -> Result<Evaluation> {
    let application = self.apply(category, facts)?;
    let classification =
      Classification::at(application.deadline_date, now, false, policy);
    Ok(Evaluation {
      category,
      deadline_date: application.deadline_date,
      status: classification.status,
      urgency: classification.urgency,
      days_remaining: classification.days_remaining,
      jurisdiction: application.jurisdiction,
      trigger: application.trigger,
      trigger_date: application.trigger_date,
    })
  }
}
