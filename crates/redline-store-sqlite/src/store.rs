//! [`SqliteStore`]: the SQLite implementation of [`VersionStore`].

use std::{collections::BTreeMap, path::Path, time::Duration};

use backon::{ExponentialBuilder, Retryable as _};
use chrono::Utc;
use redline_core::{
  analysis::Analysis,
  feedback::AnalysisContent,
  file::{FileRecord, NewFile},
  ids::analysis_id,
  store::VersionStore,
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  encode::{
    ANALYSIS_COLUMNS, FILE_COLUMNS, RawAnalysis, RawFile, encode_content, encode_dt,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Tuning for write contention between connections sharing a database file.
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// How long SQLite itself waits for the write lock before reporting busy.
  pub busy_timeout:  Duration,
  /// Total attempts per append before giving up with `Unavailable`.
  pub max_attempts:  u32,
  /// Delay before the first retry; doubles with every further attempt.
  pub retry_backoff: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      busy_timeout:  Duration::from_secs(5),
      max_attempts:  5,
      retry_backoff: Duration::from_millis(50),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Redline version store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Several
/// stores (or processes) may open the same file; appends are serialised by
/// SQLite's write lock.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  options:         StoreOptions,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, options };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, options: StoreOptions::default() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let busy_timeout = self.options.busy_timeout;
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run one append transaction, retrying while the database is busy.
  ///
  /// `plan` is fixed before the first attempt; retries only repeat the
  /// transaction, never whatever produced the content.
  async fn append(&self, plan: AppendPlan) -> Result<String> {
    let attempts = self.options.max_attempts.max(1);
    let backoff = ExponentialBuilder::default()
      .with_min_delay(self.options.retry_backoff)
      .with_max_times(attempts as usize - 1);

    let outcome = (|| {
      let attempt_plan = plan.clone();
      async move {
        self
          .conn
          .call(move |conn| Ok(append_in_tx(conn, &attempt_plan)?))
          .await
      }
    })
    .retry(backoff)
    .when(is_busy)
    .notify(|_, delay| {
      tracing::warn!(file_id = %plan.file_id, ?delay, "database busy; retrying append");
    })
    .await;

    match outcome {
      Ok(result) => result.map_err(Error::Core),
      // `when` retries every busy error, so a busy error here means the
      // budget is spent.
      Err(e) if is_busy(&e) => {
        tracing::error!(
          file_id = %plan.file_id,
          attempts,
          "append abandoned: database stayed busy"
        );
        Err(redline_core::Error::Unavailable { attempts }.into())
      }
      Err(e) => Err(e.into()),
    }
  }
}

// ─── Append transaction ──────────────────────────────────────────────────────

/// Everything an append needs, resolved before the transaction starts.
#[derive(Clone)]
struct AppendPlan {
  file_id:      String,
  /// The analysis being revised; `None` for an initial analysis.
  prior:        Option<String>,
  content_json: String,
  model:        String,
}

/// The append protocol. Runs entirely inside one `BEGIN IMMEDIATE`
/// transaction, so the counter read below is the one this write replaces.
///
/// Domain failures are returned as the inner `Err`; the transaction is
/// dropped uncommitted and rolls back.
fn append_in_tx(
  conn: &mut rusqlite::Connection,
  plan: &AppendPlan,
) -> rusqlite::Result<Result<String, redline_core::Error>> {
  use redline_core::Error as CoreError;

  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let file: Option<(String, u32)> = tx
    .query_row(
      "SELECT owner, num_analysis FROM files WHERE file_id = ?1",
      rusqlite::params![plan.file_id],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()?;
  let Some((owner, num_analysis)) = file else {
    return Ok(Err(CoreError::FileNotFound(plan.file_id.clone())));
  };

  if let Some(prior) = &plan.prior {
    let prior_file: Option<String> = tx
      .query_row(
        "SELECT file_id FROM analyses WHERE analysis_id = ?1",
        rusqlite::params![prior],
        |r| r.get(0),
      )
      .optional()?;
    if prior_file.as_deref() != Some(plan.file_id.as_str()) {
      return Ok(Err(CoreError::AnalysisNotFound(prior.clone())));
    }
  }

  let version = num_analysis + 1;
  let new_id = analysis_id(&plan.file_id, version);
  let now = encode_dt(Utc::now());

  tx.execute(
    "UPDATE files SET num_analysis = ?1, last_update = ?2 WHERE file_id = ?3",
    rusqlite::params![version, now, plan.file_id],
  )?;

  tx.execute(
    "INSERT INTO file_analysis_index (file_id, version, analysis_id)
     VALUES (?1, ?2, ?3)",
    rusqlite::params![plan.file_id, version, new_id],
  )?;

  tx.execute(
    &format!(
      "INSERT INTO analyses ({ANALYSIS_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, NULL, ?8)"
    ),
    rusqlite::params![
      new_id,
      plan.file_id,
      version,
      owner,
      plan.content_json,
      plan.model,
      now,
      plan.prior,
    ],
  )?;

  // Link the current tail, which is the revised analysis whenever the user
  // revises the latest version. Linking an older prior would fork the chain.
  if num_analysis > 0 {
    let tail = analysis_id(&plan.file_id, num_analysis);
    let linked = tx.execute(
      "UPDATE analyses SET next_analysis = ?1
       WHERE analysis_id = ?2 AND next_analysis IS NULL",
      rusqlite::params![new_id, tail],
    )?;
    if linked != 1 {
      return Ok(Err(CoreError::BrokenChain(tail)));
    }
  }

  tx.commit()?;
  Ok(Ok(new_id))
}

fn is_busy(err: &tokio_rusqlite::Error) -> bool {
  matches!(
    err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
      if matches!(
        e.code,
        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
      )
  )
}

fn read_index(conn: &rusqlite::Connection, file_id: &str) -> rusqlite::Result<Vec<(u32, String)>> {
  let mut stmt = conn.prepare(
    "SELECT version, analysis_id FROM file_analysis_index
     WHERE file_id = ?1 ORDER BY version",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![file_id], |r| Ok((r.get(0)?, r.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── VersionStore impl ───────────────────────────────────────────────────────

impl VersionStore for SqliteStore {
  type Error = Error;

  // ── Files ─────────────────────────────────────────────────────────────────

  async fn register_file(&self, input: NewFile) -> Result<FileRecord> {
    let file = FileRecord {
      file_id:        input.file_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
      owner:          input.owner,
      num_analysis:   0,
      analysis_index: BTreeMap::new(),
      last_update:    None,
      created_at:     Utc::now(),
    };

    let id_str = file.file_id.clone();
    let owner  = file.owner.clone();
    let at_str = encode_dt(file.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO files (file_id, owner, num_analysis, created_at)
           VALUES (?1, ?2, 0, ?3)",
          rusqlite::params![id_str, owner, at_str],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Err(redline_core::Error::FileExists(file.file_id).into());
    }
    Ok(file)
  }

  async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>> {
    let id_str = file_id.to_owned();

    let raw: Option<RawFile> = self
      .conn
      .call(move |conn| {
        // One read transaction so the row and its index come from the same
        // snapshot.
        let tx = conn.transaction()?;
        let raw = tx
          .query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE file_id = ?1"),
            rusqlite::params![id_str],
            RawFile::from_row,
          )
          .optional()?;
        let Some(mut raw) = raw else {
          return Ok(None);
        };
        raw.index = read_index(&tx, &raw.file_id)?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawFile::into_file).transpose()
  }

  // ── Analyses: reads ──────────────────────────────────────────────────────

  async fn get_analysis(&self, analysis_id: &str) -> Result<Option<Analysis>> {
    let id_str = analysis_id.to_owned();

    let raw: Option<RawAnalysis> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE analysis_id = ?1"),
            rusqlite::params![id_str],
            RawAnalysis::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAnalysis::into_analysis).transpose()
  }

  async fn list_analyses(&self, file_id: &str) -> Result<Vec<Analysis>> {
    let id_str = file_id.to_owned();

    let raws: Vec<RawAnalysis> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ANALYSIS_COLUMNS} FROM analyses
           WHERE file_id = ?1 ORDER BY version"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawAnalysis::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAnalysis::into_analysis).collect()
  }

  // ── Analyses: append-only writes ─────────────────────────────────────────

  async fn append_initial_analysis(
    &self,
    file_id: &str,
    content: AnalysisContent,
    model:   &str,
  ) -> Result<String> {
    self
      .append(AppendPlan {
        file_id:      file_id.to_owned(),
        prior:        None,
        content_json: encode_content(&content)?,
        model:        model.to_owned(),
      })
      .await
  }

  async fn append_revision_analysis(
    &self,
    file_id:           &str,
    prior_analysis_id: &str,
    content:           AnalysisContent,
    model:             &str,
  ) -> Result<String> {
    self
      .append(AppendPlan {
        file_id:      file_id.to_owned(),
        prior:        Some(prior_analysis_id.to_owned()),
        content_json: encode_content(&content)?,
        model:        model.to_owned(),
      })
      .await
  }
}
