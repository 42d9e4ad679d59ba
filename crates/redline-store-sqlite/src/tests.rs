//! Integration tests for `SqliteStore` against in-memory and on-disk databases.

use std::{collections::BTreeSet, time::Duration};

use redline_core::{
  chain,
  feedback::{AnalysisContent, Feedback, Keywords, Seniority},
  file::NewFile,
  store::VersionStore,
};
use tokio::task::JoinSet;

use crate::{Error, SqliteStore, StoreOptions};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn content(summary: &str) -> AnalysisContent {
  AnalysisContent::Feedback(Feedback {
    summary:                summary.into(),
    strengths:              vec!["Clear writing".into()],
    gaps:                   vec![],
    suggested_improvements: vec!["Add metrics".into()],
    role_suggestions:       vec!["Backend Engineer".into()],
    keywords:               Keywords {
      skills:    vec!["rust".into()],
      tools:     vec!["tokio".into()],
      domains:   vec!["backend".into()],
      seniority: Seniority::Mid,
    },
  })
}

async fn register(s: &SqliteStore, file_id: &str) {
  s.register_file(NewFile {
    file_id: Some(file_id.into()),
    owner:   "owner-1".into(),
  })
  .await
  .unwrap();
}

async fn assert_chain_consistent(s: &SqliteStore, file_id: &str) {
  let file = s.get_file(file_id).await.unwrap().unwrap();
  let analyses = s.list_analyses(file_id).await.unwrap();
  chain::verify(&file, &analyses).unwrap();
}

fn is_core(err: &Error, pred: impl Fn(&redline_core::Error) -> bool) -> bool {
  matches!(err, Error::Core(e) if pred(e))
}

// ─── Files ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_and_get_file() {
  let s = store().await;
  register(&s, "f1").await;

  let file = s.get_file("f1").await.unwrap().unwrap();
  assert_eq!(file.owner, "owner-1");
  assert_eq!(file.num_analysis, 0);
  assert!(file.analysis_index.is_empty());
  assert!(file.last_update.is_none());
}

#[tokio::test]
async fn register_generates_an_id_when_absent() {
  let s = store().await;
  let file = s
    .register_file(NewFile { file_id: None, owner: "u".into() })
    .await
    .unwrap();
  assert!(!file.file_id.is_empty());
  assert!(s.get_file(&file.file_id).await.unwrap().is_some());
}

#[tokio::test]
async fn register_duplicate_errors() {
  let s = store().await;
  register(&s, "f1").await;
  let err = s
    .register_file(NewFile { file_id: Some("f1".into()), owner: "someone-else".into() })
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(e, redline_core::Error::FileExists(_))));

  let file = s.get_file("f1").await.unwrap().unwrap();
  assert_eq!(file.owner, "owner-1");
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get_file("nope").await.unwrap().is_none());
  assert!(s.get_analysis("nope-1").await.unwrap().is_none());
  assert!(s.list_analyses("nope").await.unwrap().is_empty());
}

// ─── Initial analyses ────────────────────────────────────────────────────────

#[tokio::test]
async fn initial_append_creates_first_version() {
  let s = store().await;
  register(&s, "f1").await;

  let id = s
    .append_initial_analysis("f1", content("first"), "m1")
    .await
    .unwrap();
  assert_eq!(id, "f1-1");

  let file = s.get_file("f1").await.unwrap().unwrap();
  assert_eq!(file.num_analysis, 1);
  assert_eq!(file.analysis_index.get(&1).map(String::as_str), Some("f1-1"));
  assert!(file.last_update.is_some());

  let analysis = s.get_analysis("f1-1").await.unwrap().unwrap();
  assert_eq!(analysis.file_id, "f1");
  assert_eq!(analysis.version, 1);
  assert_eq!(analysis.owner, "owner-1");
  assert_eq!(analysis.model, "m1");
  assert_eq!(analysis.content, content("first"));
  assert_eq!(analysis.next_analysis, None);
  assert_eq!(analysis.user_rating, None);
  assert_eq!(analysis.user_comment, None);
  assert_eq!(analysis.revised_from, None);
  assert_eq!(Some(analysis.generate_time), file.last_update);
}

#[tokio::test]
async fn initial_append_to_missing_file_errors() {
  let s = store().await;
  let err = s
    .append_initial_analysis("ghost", content("x"), "m1")
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(e, redline_core::Error::FileNotFound(id) if id == "ghost")));
  assert!(s.get_analysis("ghost-1").await.unwrap().is_none());
}

#[tokio::test]
async fn unparsed_content_is_stored_verbatim() {
  let s = store().await;
  register(&s, "f1").await;

  let raw = "the model rambled instead of returning JSON";
  let id = s
    .append_initial_analysis("f1", AnalysisContent::from_raw(raw), "m1")
    .await
    .unwrap();
  assert_eq!(id, "f1-1");

  let analysis = s.get_analysis(&id).await.unwrap().unwrap();
  assert_eq!(analysis.content, AnalysisContent::Unparsed { raw_text: raw.into() });
  assert_eq!(s.get_file("f1").await.unwrap().unwrap().num_analysis, 1);
}

#[tokio::test]
async fn redelivered_upload_extends_the_chain() {
  let s = store().await;
  register(&s, "f1").await;

  s.append_initial_analysis("f1", content("a"), "m1").await.unwrap();
  let second = s
    .append_initial_analysis("f1", content("b"), "m1")
    .await
    .unwrap();
  assert_eq!(second, "f1-2");

  let first = s.get_analysis("f1-1").await.unwrap().unwrap();
  assert_eq!(first.next_analysis.as_deref(), Some("f1-2"));
  assert_chain_consistent(&s, "f1").await;
}

// ─── Revisions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn revision_links_prior_to_new_version() {
  let s = store().await;
  register(&s, "f1").await;
  s.append_initial_analysis("f1", content("first"), "m1").await.unwrap();

  let id = s
    .append_revision_analysis("f1", "f1-1", content("second"), "m1")
    .await
    .unwrap();
  assert_eq!(id, "f1-2");

  let file = s.get_file("f1").await.unwrap().unwrap();
  assert_eq!(file.num_analysis, 2);
  assert_eq!(file.latest_analysis(), Some("f1-2"));

  let prior = s.get_analysis("f1-1").await.unwrap().unwrap();
  assert_eq!(prior.next_analysis.as_deref(), Some("f1-2"));
  assert!(!prior.is_latest());

  let revised = s.get_analysis("f1-2").await.unwrap().unwrap();
  assert!(revised.is_latest());
  assert_eq!(revised.revised_from.as_deref(), Some("f1-1"));
  assert_eq!(revised.content, content("second"));
  assert_chain_consistent(&s, "f1").await;
}

#[tokio::test]
async fn revision_of_missing_prior_leaves_file_untouched() {
  let s = store().await;
  register(&s, "f1").await;
  s.append_initial_analysis("f1", content("first"), "m1").await.unwrap();
  s.append_revision_analysis("f1", "f1-1", content("second"), "m1")
    .await
    .unwrap();
  let before = s.get_file("f1").await.unwrap().unwrap();

  let err = s
    .append_revision_analysis("f1", "f1-9", content("third"), "m1")
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(e, redline_core::Error::AnalysisNotFound(id) if id == "f1-9")));

  let after = s.get_file("f1").await.unwrap().unwrap();
  assert_eq!(after, before);
  assert_eq!(after.num_analysis, 2);
  assert!(s.get_analysis("f1-3").await.unwrap().is_none());
  assert_eq!(
    s.get_analysis("f1-2").await.unwrap().unwrap().next_analysis,
    None
  );
}

#[tokio::test]
async fn revision_of_missing_file_errors() {
  let s = store().await;
  let err = s
    .append_revision_analysis("ghost", "ghost-1", content("x"), "m1")
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(e, redline_core::Error::FileNotFound(_))));
}

#[tokio::test]
async fn revision_with_prior_from_another_file_errors() {
  let s = store().await;
  register(&s, "f1").await;
  register(&s, "f2").await;
  s.append_initial_analysis("f1", content("a"), "m1").await.unwrap();
  s.append_initial_analysis("f2", content("b"), "m1").await.unwrap();

  let err = s
    .append_revision_analysis("f2", "f1-1", content("c"), "m1")
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(e, redline_core::Error::AnalysisNotFound(_))));
  assert_eq!(s.get_file("f2").await.unwrap().unwrap().num_analysis, 1);
  assert_eq!(s.get_analysis("f1-1").await.unwrap().unwrap().next_analysis, None);
}

#[tokio::test]
async fn revising_an_older_version_appends_after_the_tail() {
  let s = store().await;
  register(&s, "f1").await;
  s.append_initial_analysis("f1", content("v1"), "m1").await.unwrap();
  s.append_revision_analysis("f1", "f1-1", content("v2"), "m1").await.unwrap();

  let id = s
    .append_revision_analysis("f1", "f1-1", content("v3"), "m2")
    .await
    .unwrap();
  assert_eq!(id, "f1-3");

  let v1 = s.get_analysis("f1-1").await.unwrap().unwrap();
  let v2 = s.get_analysis("f1-2").await.unwrap().unwrap();
  let v3 = s.get_analysis("f1-3").await.unwrap().unwrap();
  assert_eq!(v1.next_analysis.as_deref(), Some("f1-2"));
  assert_eq!(v2.next_analysis.as_deref(), Some("f1-3"));
  assert_eq!(v3.revised_from.as_deref(), Some("f1-1"));
  assert_eq!(v3.model, "m2");
  assert_chain_consistent(&s, "f1").await;
}

#[tokio::test]
async fn long_chain_stays_consistent() {
  let s = store().await;
  register(&s, "f1").await;
  let mut prior = s
    .append_initial_analysis("f1", content("v1"), "m1")
    .await
    .unwrap();
  for n in 2..=8 {
    prior = s
      .append_revision_analysis("f1", &prior, content(&format!("v{n}")), "m1")
      .await
      .unwrap();
    assert_eq!(prior, format!("f1-{n}"));
  }
  assert_chain_consistent(&s, "f1").await;
}

#[tokio::test]
async fn files_have_independent_counters() {
  let s = store().await;
  register(&s, "f1").await;
  register(&s, "f1-1").await;

  assert_eq!(s.append_initial_analysis("f1", content("a"), "m").await.unwrap(), "f1-1");
  assert_eq!(s.append_initial_analysis("f1-1", content("b"), "m").await.unwrap(), "f1-1-1");
  assert_eq!(s.append_initial_analysis("f1", content("c"), "m").await.unwrap(), "f1-2");

  let listed = s.list_analyses("f1").await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_chain_consistent(&s, "f1").await;
  assert_chain_consistent(&s, "f1-1").await;
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rereads_are_identical() {
  let s = store().await;
  register(&s, "f1").await;
  s.append_initial_analysis("f1", content("a"), "m1").await.unwrap();
  s.append_revision_analysis("f1", "f1-1", content("b"), "m1").await.unwrap();

  let file_a = serde_json::to_vec(&s.get_file("f1").await.unwrap()).unwrap();
  let file_b = serde_json::to_vec(&s.get_file("f1").await.unwrap()).unwrap();
  assert_eq!(file_a, file_b);

  let an_a = serde_json::to_vec(&s.get_analysis("f1-1").await.unwrap()).unwrap();
  let an_b = serde_json::to_vec(&s.get_analysis("f1-1").await.unwrap()).unwrap();
  assert_eq!(an_a, an_b);
}

// ─── Append-only guarantees ──────────────────────────────────────────────────

#[tokio::test]
async fn next_analysis_is_write_once() {
  let s = store().await;
  register(&s, "f1").await;
  s.append_initial_analysis("f1", content("a"), "m1").await.unwrap();
  s.append_revision_analysis("f1", "f1-1", content("b"), "m1").await.unwrap();

  let result = s
    .conn
    .call(|conn| {
      Ok(conn.execute(
        "UPDATE analyses SET next_analysis = NULL WHERE analysis_id = 'f1-1'",
        [],
      )?)
    })
    .await;
  assert!(result.is_err());

  let result = s
    .conn
    .call(|conn| Ok(conn.execute("DELETE FROM analyses WHERE analysis_id = 'f1-2'", [])?))
    .await;
  assert!(result.is_err());

  assert_chain_consistent(&s, "f1").await;
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_revisions_get_distinct_contiguous_versions() {
  let s = store().await;
  register(&s, "f1").await;
  s.append_initial_analysis("f1", content("v1"), "m1").await.unwrap();

  const N: u32 = 16;
  let mut tasks = JoinSet::new();
  for i in 0..N {
    let s = s.clone();
    tasks.spawn(async move {
      s.append_revision_analysis("f1", "f1-1", content(&format!("r{i}")), "m1")
        .await
    });
  }

  let mut ids = BTreeSet::new();
  while let Some(joined) = tasks.join_next().await {
    assert!(ids.insert(joined.unwrap().unwrap()));
  }

  let expected: BTreeSet<String> = (2..=N + 1).map(|v| format!("f1-{v}")).collect();
  assert_eq!(ids, expected);
  assert_eq!(s.get_file("f1").await.unwrap().unwrap().num_analysis, N + 1);
  assert_chain_consistent(&s, "f1").await;
}

#[tokio::test]
async fn concurrent_revisions_across_connections() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("redline.db");

  let mut stores = Vec::new();
  for _ in 0..4 {
    stores.push(SqliteStore::open(&path).await.unwrap());
  }
  register(&stores[0], "f1").await;
  stores[0]
    .append_initial_analysis("f1", content("v1"), "m1")
    .await
    .unwrap();

  const N: u32 = 20;
  let mut tasks = JoinSet::new();
  for i in 0..N {
    let s = stores[i as usize % stores.len()].clone();
    tasks.spawn(async move {
      s.append_revision_analysis("f1", "f1-1", content(&format!("r{i}")), "m1")
        .await
    });
  }

  let mut ids = BTreeSet::new();
  while let Some(joined) = tasks.join_next().await {
    assert!(ids.insert(joined.unwrap().unwrap()));
  }
  assert_eq!(ids.len(), N as usize);

  // Every connection sees the same, consistent chain.
  for s in &stores {
    let file = s.get_file("f1").await.unwrap().unwrap();
    assert_eq!(file.num_analysis, N + 1);
    assert_chain_consistent(s, "f1").await;
  }
}

#[tokio::test]
async fn busy_database_is_retried_until_the_lock_clears() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("redline.db");

  let holder = SqliteStore::open(&path).await.unwrap();
  register(&holder, "f1").await;

  let patient = SqliteStore::open_with(
    &path,
    StoreOptions {
      busy_timeout:  Duration::from_millis(10),
      max_attempts:  10,
      retry_backoff: Duration::from_millis(10),
    },
  )
  .await
  .unwrap();

  holder
    .conn
    .call(|conn| {
      conn.execute_batch("BEGIN IMMEDIATE")?;
      Ok(())
    })
    .await
    .unwrap();

  let pending = tokio::spawn(async move {
    patient
      .append_initial_analysis("f1", content("eventually"), "m1")
      .await
  });

  tokio::time::sleep(Duration::from_millis(60)).await;
  holder
    .conn
    .call(|conn| {
      conn.execute_batch("ROLLBACK")?;
      Ok(())
    })
    .await
    .unwrap();

  assert_eq!(pending.await.unwrap().unwrap(), "f1-1");
  assert_chain_consistent(&holder, "f1").await;
}

#[tokio::test]
async fn exhausted_retries_surface_as_unavailable() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("redline.db");

  let holder = SqliteStore::open(&path).await.unwrap();
  register(&holder, "f1").await;

  let impatient = SqliteStore::open_with(
    &path,
    StoreOptions {
      busy_timeout:  Duration::from_millis(10),
      max_attempts:  2,
      retry_backoff: Duration::from_millis(1),
    },
  )
  .await
  .unwrap();

  holder
    .conn
    .call(|conn| {
      conn.execute_batch("BEGIN IMMEDIATE")?;
      Ok(())
    })
    .await
    .unwrap();

  let err = impatient
    .append_initial_analysis("f1", content("blocked"), "m1")
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(e, redline_core::Error::Unavailable { attempts: 2 })));

  holder
    .conn
    .call(|conn| {
      conn.execute_batch("ROLLBACK")?;
      Ok(())
    })
    .await
    .unwrap();

  // Nothing was half-written, and the lock is free again.
  assert_eq!(impatient.get_file("f1").await.unwrap().unwrap().num_analysis, 0);
  let id = impatient
    .append_initial_analysis("f1", content("unblocked"), "m1")
    .await
    .unwrap();
  assert_eq!(id, "f1-1");
}
