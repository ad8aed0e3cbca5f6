// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behaviour every record store must share, run against both backends.

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use threadlog_config::model::{StorageBackend, StorageConfig};
use threadlog_core::{
    Bug, CommitBatch, Discussion, DiscussionKey, DiscussionMessage, DiscussionType, Record,
    RecordKey, RecordStore, ThreadlogError, Transaction, TransactionOptions,
};
use threadlog_storage::{MemoryStore, SqliteStore};

async fn sqlite_store() -> (SqliteStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        backend: StorageBackend::Sqlite,
        database_path: dir.path().join("contract.db").to_string_lossy().into_owned(),
        wal_mode: true,
    };
    (SqliteStore::open(config).await.unwrap(), dir)
}

fn discussion(source: &str, id: &str, message_ids: &[&str], bugs: &[&str]) -> Discussion {
    let mut d = Discussion::new(DiscussionKey::new(source, id), DiscussionType::Report, "subj");
    d.messages = message_ids
        .iter()
        .enumerate()
        .map(|(i, mid)| DiscussionMessage {
            id: mid.to_string(),
            time: Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
            external: true,
        })
        .collect();
    d.bug_keys = bugs.iter().map(|b| b.to_string()).collect();
    d
}

async fn put(store: &dyn RecordStore, record: Record) {
    store.commit(CommitBatch::blind_write(record)).await.unwrap();
}

async fn point_reads_roundtrip(store: &dyn RecordStore) {
    let d = discussion("lore", "<root@x>", &["<root@x>", "<r1@x>"], &["bug1"]);
    put(store, Record::Discussion(d.clone())).await;
    let loaded = store.load_discussion(&d.key()).await.unwrap().unwrap();
    assert_eq!(loaded.value, d);
    assert_eq!(loaded.version, 1);

    let mut bug = Bug::new("bug1", "KASAN: use-after-free");
    bug.reporting_ids.push("rep-1".into());
    put(store, Record::Bug(bug.clone())).await;
    assert_eq!(store.load_bug("bug1").await.unwrap().unwrap().value, bug);

    assert!(store.load_bug("nope").await.unwrap().is_none());
    assert!(
        store
            .load_discussion(&DiscussionKey::new("lore", "missing"))
            .await
            .unwrap()
            .is_none()
    );
}

async fn message_index_follows_writes(store: &dyn RecordStore) {
    put(store, Record::Discussion(discussion("lore", "a", &["m1", "m2"], &[]))).await;
    put(store, Record::Discussion(discussion("lore", "b", &["m2"], &[]))).await;
    put(store, Record::Discussion(discussion("gerrit", "c", &["m1"], &[]))).await;

    let hits = store.discussions_by_message_id("lore", "m1", 2).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "a");

    let hits = store.discussions_by_message_id("lore", "m2", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    let hits = store.discussions_by_message_id("lore", "m2", 1).await.unwrap();
    assert_eq!(hits.len(), 1);

    // Rewriting without m1 drops it from the index.
    put(store, Record::Discussion(discussion("lore", "a", &["m3"], &[]))).await;
    assert!(
        store
            .discussions_by_message_id("lore", "m1", 2)
            .await
            .unwrap()
            .is_empty()
    );
}

async fn bug_indexes_follow_writes(store: &dyn RecordStore) {
    put(store, Record::Discussion(discussion("lore", "a", &["m"], &["b1", "b2"]))).await;
    put(store, Record::Discussion(discussion("lore", "b", &["n"], &["b2"]))).await;

    let for_b2 = store.discussions_for_bug("b2").await.unwrap();
    let ids: Vec<&str> = for_b2.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(store.discussions_for_bug("b1").await.unwrap().len(), 1);

    let mut bug = Bug::new("b1", "t");
    bug.reporting_ids = vec!["r1".into(), "r2".into()];
    put(store, Record::Bug(bug)).await;
    assert_eq!(
        store.find_bug_by_reporting_id("r2").await.unwrap().unwrap().key,
        "b1"
    );
    assert!(store.find_bug_by_reporting_id("r3").await.unwrap().is_none());
}

async fn shared_reporting_id_resolves_to_lowest_key(store: &dyn RecordStore) {
    let mut a = Bug::new("a", "first");
    a.reporting_ids = vec!["r".into()];
    let mut b = Bug::new("b", "second");
    b.reporting_ids = vec!["r".into()];
    put(store, Record::Bug(a)).await;
    put(store, Record::Bug(b.clone())).await;
    assert_eq!(
        store.find_bug_by_reporting_id("r").await.unwrap().unwrap().key,
        "a"
    );

    // `b` dropping the id must not unindex `a`.
    b.reporting_ids.clear();
    put(store, Record::Bug(b)).await;
    assert_eq!(
        store.find_bug_by_reporting_id("r").await.unwrap().unwrap().key,
        "a"
    );
}

async fn stale_version_conflicts(store: &dyn RecordStore) {
    put(store, Record::Bug(Bug::new("k", "v1"))).await;
    let batch = CommitBatch {
        reads: vec![(RecordKey::Bug("k".into()), 1)],
        writes: vec![Record::Bug(Bug::new("k", "v2"))],
    };
    store.commit(batch.clone()).await.unwrap();

    // Same expectation again is now stale.
    let err = store.commit(batch).await.unwrap_err();
    assert!(matches!(err, ThreadlogError::Conflict { .. }), "got {err:?}");
    let loaded = store.load_bug("k").await.unwrap().unwrap();
    assert_eq!(loaded.version, 2);
    assert_eq!(loaded.value.title, "v2");

    // Expecting absence of an existing record conflicts too.
    let batch = CommitBatch {
        reads: vec![(RecordKey::Bug("k".into()), 0)],
        writes: vec![Record::Bug(Bug::new("k", "v3"))],
    };
    assert!(store.commit(batch).await.is_err());
}

async fn transaction_sees_own_writes_and_detects_interleaving(store: &dyn RecordStore) {
    let key = DiscussionKey::new("lore", "t");
    let mut tx = Transaction::new(store, TransactionOptions::single_group(1));
    assert!(tx.get_discussion(&key).await.unwrap().is_none());
    tx.put_discussion(discussion("lore", "t", &["m1"], &[])).unwrap();
    let pending = tx.get_discussion(&key).await.unwrap().unwrap();
    assert_eq!(pending.messages.len(), 1);

    // Another writer creates the record first.
    put(store, Record::Discussion(discussion("lore", "t", &["other"], &[]))).await;
    let err = tx.commit().await.unwrap_err();
    assert!(err.is_retryable());
    let stored = store.load_discussion(&key).await.unwrap().unwrap();
    assert_eq!(stored.value.messages[0].id, "other");
}

async fn single_group_transaction_rejects_second_record(store: &dyn RecordStore) {
    let mut tx = Transaction::new(store, TransactionOptions::single_group(1));
    tx.get_bug("a").await.unwrap();
    let err = tx.get_bug("b").await.unwrap_err();
    assert!(matches!(err, ThreadlogError::TooManyGroups { groups: 2, limit: 1 }));

    let mut tx = Transaction::new(store, TransactionOptions::cross_group(1));
    tx.get_bug("a").await.unwrap();
    tx.get_bug("b").await.unwrap();
    tx.put_bug(Bug::new("a", "")).unwrap();
    tx.put_bug(Bug::new("b", "")).unwrap();
    tx.commit().await.unwrap();
    assert!(store.load_bug("b").await.unwrap().is_some());
}

macro_rules! contract {
    ($name:ident) => {
        mod $name {
            use super::*;

            #[tokio::test]
            async fn memory() {
                super::$name(&MemoryStore::new()).await;
            }

            #[tokio::test]
            async fn sqlite() {
                let (store, _dir) = sqlite_store().await;
                super::$name(&store).await;
            }
        }
    };
}

contract!(point_reads_roundtrip);
contract!(message_index_follows_writes);
contract!(bug_indexes_follow_writes);
contract!(shared_reporting_id_resolves_to_lowest_key);
contract!(stale_version_conflicts);
contract!(transaction_sees_own_writes_and_detects_interleaving);
contract!(single_group_transaction_rejects_second_record);

#[tokio::test]
async fn sqlite_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        backend: StorageBackend::Sqlite,
        database_path: dir.path().join("reopen.db").to_string_lossy().into_owned(),
        wal_mode: true,
    };
    {
        let store = SqliteStore::open(config.clone()).await.unwrap();
        put(&store, Record::Discussion(discussion("lore", "x", &["m"], &["b"]))).await;
        store.close().await.unwrap();
    }
    let store = SqliteStore::open(config).await.unwrap();
    let loaded = store
        .load_discussion(&DiscussionKey::new("lore", "x"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.version, 1);
    assert_eq!(loaded.value.bug_keys, vec!["b".to_string()]);
}
