//! [`SqliteStore`], the SQLite implementation of [`DeadlineStore`].

use std::{path::Path, time::Duration};

use chrono::{NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use lien_core::{
  deadline::{DeadlineRecord, NewProject, Project},
  store::{BatchOutcome, DeadlineStore, DeadlineWrite},
};

use crate::{
  Error, Result,
  encode::{
    DEADLINE_COLUMNS, RawDeadline, RawProject, encode_date, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

/// How long a statement waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// What one deadline write did inside SQLite, before mapping to [`Error`].
enum RowOutcome {
  Written,
  Missing,
  Duplicate,
  MissingProject,
  Failed(rusqlite::Error),
}

impl RowOutcome {
  fn into_result(self, record: &DeadlineRecord) -> Result<bool> {
    match self {
      Self::Written => Ok(true),
      Self::Missing => Ok(false),
      Self::Duplicate => Err(Error::Conflict {
        project_id: record.project_id,
        category:   record.category.to_string(),
      }),
      Self::MissingProject => Err(Error::ProjectNotFound(record.project_id)),
      Self::Failed(e) => Err(Error::Database(e.into())),
    }
  }
}

fn insert_row(conn: &rusqlite::Connection, raw: &RawDeadline) -> RowOutcome {
  let result = conn.execute(
    &format!(
      "INSERT INTO deadlines ({DEADLINE_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
    ),
    rusqlite::params![
      raw.deadline_id,
      raw.project_id,
      raw.user_id,
      raw.category,
      raw.deadline_date,
      raw.jurisdiction,
      raw.trigger_fact,
      raw.trigger_date,
      raw.facts_json,
      raw.completed_at,
      raw.note,
      raw.created_at,
      raw.updated_at,
    ],
  );
  match result {
    Ok(_) => RowOutcome::Written,
    Err(e) if is_constraint(&e, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => {
      RowOutcome::Duplicate
    }
    Err(e) if is_constraint(&e, rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
      RowOutcome::MissingProject
    }
    Err(e) => RowOutcome::Failed(e),
  }
}

// project_id, user_id, category, and created_at are identity; never rewritten.
fn update_row(conn: &rusqlite::Connection, raw: &RawDeadline) -> RowOutcome {
  let result = conn.execute(
    "UPDATE deadlines SET
       deadline_date = ?2, jurisdiction = ?3, trigger_fact = ?4,
       trigger_date = ?5, facts_json = ?6, completed_at = ?7,
       note = ?8, updated_at = ?9
     WHERE deadline_id = ?1",
    rusqlite::params![
      raw.deadline_id,
      raw.deadline_date,
      raw.jurisdiction,
      raw.trigger_fact,
      raw.trigger_date,
      raw.facts_json,
      raw.completed_at,
      raw.note,
      raw.updated_at,
    ],
  );
  match result {
    Ok(0) => RowOutcome::Missing,
    Ok(_) => RowOutcome::Written,
    Err(e) => RowOutcome::Failed(e),
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A deadline store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
  }

  /// Like [`open`](Self::open), with an explicit lock-wait timeout. A
  /// statement that cannot acquire the lock in time fails instead of waiting.
  pub async fn open_with_timeout(
    path: impl AsRef<Path>,
    busy_timeout: Duration,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema(busy_timeout).await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema(DEFAULT_BUSY_TIMEOUT).await?;
    Ok(store)
  }

  async fn init_schema(&self, busy_timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!(?busy_timeout, "sqlite schema ready");
    Ok(())
  }

  /// Run a `SELECT` over `deadlines` with the given trailing clause.
  async fn query_deadlines(
    &self,
    clause: &'static str,
    params: Vec<Value>,
  ) -> Result<Vec<DeadlineRecord>> {
    let raws: Vec<RawDeadline> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {DEADLINE_COLUMNS} FROM deadlines {clause}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawDeadline::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDeadline::into_record).collect()
  }
}

fn is_constraint(err: &rusqlite::Error, extended: i32) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.extended_code == extended
  )
}

// ─── DeadlineStore impl ──────────────────────────────────────────────────────

impl DeadlineStore for SqliteStore {
  type Error = Error;

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn add_project(&self, input: NewProject) -> Result<Project> {
    let project = Project {
      project_id: Uuid::new_v4(),
      user_id:    input.user_id,
      name:       input.name,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(project.project_id);
    let user_str = encode_uuid(project.user_id);
    let name     = project.name.clone();
    let at_str   = encode_dt(project.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO projects (project_id, user_id, name, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, user_str, name, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(project)
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawProject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT project_id, user_id, name, created_at
               FROM projects WHERE project_id = ?1",
              rusqlite::params![id_str],
              RawProject::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProject::into_project).transpose()
  }

  async fn list_projects(&self, user_id: Uuid) -> Result<Vec<Project>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawProject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT project_id, user_id, name, created_at
           FROM projects WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], RawProject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProject::into_project).collect()
  }

  async fn delete_project(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM deadlines WHERE project_id = ?1",
          rusqlite::params![id_str],
        )?;
        let n = tx.execute(
          "DELETE FROM projects WHERE project_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }

  // ── Deadlines ─────────────────────────────────────────────────────────────

  async fn insert_deadline(&self, record: DeadlineRecord) -> Result<()> {
    let raw = RawDeadline::encode(&record)?;
    let outcome = self.conn.call(move |conn| Ok(insert_row(conn, &raw))).await?;
    outcome.into_result(&record).map(|_| ())
  }

  async fn update_deadline(&self, record: DeadlineRecord) -> Result<bool> {
    let raw = RawDeadline::encode(&record)?;
    let outcome = self.conn.call(move |conn| Ok(update_row(conn, &raw))).await?;
    outcome.into_result(&record)
  }

  async fn apply_batch(&self, writes: Vec<DeadlineWrite>) -> Result<BatchOutcome<Error>> {
    // Encoding failures never reach SQLite; they keep their slot.
    let mut rows = Vec::with_capacity(writes.len());
    let mut encode_errors = Vec::with_capacity(writes.len());
    for write in &writes {
      match RawDeadline::encode(write.record()) {
        Ok(raw) => {
          rows.push((matches!(write, DeadlineWrite::Insert(_)), raw));
          encode_errors.push(None);
        }
        Err(e) => encode_errors.push(Some(e)),
      }
    }

    // One transaction, one savepoint per write. A failed write rolls back
    // its own savepoint; everything else commits together.
    let outcomes: Vec<RowOutcome> = self
      .conn
      .call(move |conn| {
        let mut tx = conn.transaction()?;
        let mut outcomes = Vec::with_capacity(rows.len());
        for (insert, raw) in rows {
          let sp = tx.savepoint()?;
          let outcome =
            if insert { insert_row(&sp, &raw) } else { update_row(&sp, &raw) };
          if matches!(outcome, RowOutcome::Written) {
            sp.commit()?;
          }
          outcomes.push(outcome);
        }
        tx.commit()?;
        Ok(outcomes)
      })
      .await?;

    let mut outcomes = outcomes.into_iter();
    let results: BatchOutcome<Error> = writes
      .iter()
      .zip(encode_errors)
      .map(|(write, encode_error)| match encode_error {
        Some(e) => Err(e),
        None => outcomes
          .next()
          .map_or(Ok(false), |outcome| outcome.into_result(write.record())),
      })
      .collect();

    tracing::debug!(
      writes = results.len(),
      failed = results.iter().filter(|r| r.is_err()).count(),
      "applied deadline batch"
    );
    Ok(results)
  }

  async fn get_deadline(&self, id: Uuid) -> Result<Option<DeadlineRecord>> {
    let mut found = self
      .query_deadlines("WHERE deadline_id = ?1", vec![encode_uuid(id).into()])
      .await?;
    Ok(found.pop())
  }

  async fn deadlines_for_project(&self, project_id: Uuid) -> Result<Vec<DeadlineRecord>> {
    self
      .query_deadlines(
        "WHERE project_id = ?1 ORDER BY deadline_date, category",
        vec![encode_uuid(project_id).into()],
      )
      .await
  }

  async fn deadlines_for_user(&self, user_id: Uuid) -> Result<Vec<DeadlineRecord>> {
    self
      .query_deadlines(
        "WHERE user_id = ?1 ORDER BY deadline_date, category",
        vec![encode_uuid(user_id).into()],
      )
      .await
  }

  async fn open_deadlines_due_between(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<DeadlineRecord>> {
    self
      .query_deadlines(
        "WHERE completed_at IS NULL
           AND deadline_date >= ?1 AND deadline_date <= ?2
         ORDER BY deadline_date",
        vec![encode_date(from).into(), encode_date(to).into()],
      )
      .await
  }

  async fn delete_deadline(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM deadlines WHERE deadline_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(n > 0)
  }
}
