//! Status and urgency classification relative to an injected "now".

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::calendar::days_between;

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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeadlineStatus {
  Upcoming,
  Overdue,
  /// Terminal; set only by an explicit completion.
  Completed,
}

impl DeadlineStatus {
  pub fn is_terminal(self) -> bool { matches!(self, Self::Completed) }
}

/// A finer signal layered on top of [`DeadlineStatus`].
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Urgency {
  Urgent,
  Normal,
}

/// How close an upcoming deadline must be to count as urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyPolicy {
  pub urgent_within_days: u32,
}

impl Default for UrgencyPolicy {
  fn default() -> Self { Self { urgent_within_days: 7 } }
}

/// The derived state of a deadline at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
  pub status:         DeadlineStatus,
  pub urgency:        Urgency,
  /// Calendar days from today to the deadline; negative once overdue.
  pub days_remaining: i64,
}

impl Classification {
  /// Classify `deadline` as seen from `now`. Days are counted between UTC
  /// calendar dates, so a deadline is still upcoming (0 days) on its own day.
  pub fn at(
    deadline: NaiveDate,
    now: DateTime<Utc>,
    completed: bool,
    policy: UrgencyPolicy,
  ) -> Self {
    let days_remaining = days_between(now.date_naive(), deadline);
    let status = if completed {
      DeadlineStatus::Completed
    } else if days_remaining < 0 {
      DeadlineStatus::Overdue
    } else {
      DeadlineStatus::Upcoming
    };
    let urgency = if status == DeadlineStatus::Upcoming
      && days_remaining <= i64::from(policy.urgent_within_days)
    {
      Urgency::Urgent
    } else {
      Urgency::Normal
    };
    Self { status, urgency, days_remaining }
  }
}
