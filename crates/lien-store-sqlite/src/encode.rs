//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Calendar dates are stored as
//! INTEGER day numbers (days since 0001-01-01 CE, counting it as day 1), so
//! SQL comparison and ordering stay chronological across chrono's whole date
//! range, including years past 9999 that have no fixed-width text form. Enums are
//! stored as their snake_case names, the facts snapshot as compact JSON, and
//! UUIDs as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, Datelike as _, NaiveDate, Utc};
use lien_core::{
  deadline::{Category, DeadlineRecord, Project},
  facts::{DateFact, Jurisdiction, ProjectFacts},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> i32 { d.num_days_from_ce() }

pub fn decode_date(days: i32) -> Result<NaiveDate> {
  NaiveDate::from_num_days_from_ce_opt(days)
    .ok_or_else(|| Error::DateParse(format!("day number {days} out of range")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownValue { kind, value: s.to_owned() })
}

pub fn encode_category(c: Category) -> String { c.to_string() }

pub fn decode_category(s: &str) -> Result<Category> { decode_enum("category", s) }

pub fn decode_date_fact(s: &str) -> Result<DateFact> { decode_enum("date fact", s) }

// ─── Facts snapshot ──────────────────────────────────────────────────────────

pub fn encode_facts(facts: &ProjectFacts) -> Result<String> {
  Ok(serde_json::to_string(facts)?)
}

pub fn decode_facts(s: &str) -> Result<ProjectFacts> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `projects` row.
pub struct RawProject {
  pub project_id: String,
  pub user_id:    String,
  pub name:       String,
  pub created_at: String,
}

impl RawProject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_id: row.get(0)?,
      user_id:    row.get(1)?,
      name:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      project_id: decode_uuid(&self.project_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawDeadline::from_row`].
pub const DEADLINE_COLUMNS: &str = "deadline_id, project_id, user_id, category,
  deadline_date, jurisdiction, trigger_fact, trigger_date, facts_json,
  completed_at, note, created_at, updated_at";

/// Raw strings read directly from a `deadlines` row.
pub struct RawDeadline {
  pub deadline_id:   String,
  pub project_id:    String,
  pub user_id:       String,
  pub category:      String,
  pub deadline_date: i32,
  pub jurisdiction:  String,
  pub trigger_fact:  String,
  pub trigger_date:  i32,
  pub facts_json:    String,
  pub completed_at:  Option<String>,
  pub note:          Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawDeadline {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      deadline_id:   row.get(0)?,
      project_id:    row.get(1)?,
      user_id:       row.get(2)?,
      category:      row.get(3)?,
      deadline_date: row.get(4)?,
      jurisdiction:  row.get(5)?,
      trigger_fact:  row.get(6)?,
      trigger_date:  row.get(7)?,
      facts_json:    row.get(8)?,
      completed_at:  row.get(9)?,
      note:          row.get(10)?,
      created_at:    row.get(11)?,
      updated_at:    row.get(12)?,
    })
  }

  /// Encode a record into column order for INSERT / UPDATE statements.
  pub fn encode(record: &DeadlineRecord) -> Result<Self> {
    Ok(Self {
      deadline_id:   encode_uuid(record.deadline_id),
      project_id:    encode_uuid(record.project_id),
      user_id:       encode_uuid(record.user_id),
      category:      encode_category(record.category),
      deadline_date: encode_date(record.deadline_date),
      jurisdiction:  record.jurisdiction.to_string(),
      trigger_fact:  record.trigger.to_string(),
      trigger_date:  encode_date(record.trigger_date),
      facts_json:    encode_facts(&record.facts)?,
      completed_at:  record.completed_at.map(encode_dt),
      note:          record.note.clone(),
      created_at:    encode_dt(record.created_at),
      updated_at:    encode_dt(record.updated_at),
    })
  }

  pub fn into_record(self) -> Result<DeadlineRecord> {
    Ok(DeadlineRecord {
      deadline_id:   decode_uuid(&self.deadline_id)?,
      project_id:    decode_uuid(&self.project_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      category:      decode_category(&self.category)?,
      deadline_date: decode_date(self.deadline_date)?,
      jurisdiction:  Jurisdiction::new(&self.jurisdiction),
      trigger:       decode_date_fact(&self.trigger_fact)?,
      trigger_date:  decode_date(self.trigger_date)?,
      facts:         decode_facts(&self.facts_json)?,
      completed_at:  self.completed_at.as_deref().map(decode_dt).transpose()?,
      note:          self.note,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}
