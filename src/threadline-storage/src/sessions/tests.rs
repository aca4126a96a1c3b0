//! Tests for session storage functionality.

use std::sync::Arc;

use tempfile::{TempDir, tempdir};

use crate::StorageError;
use crate::paths::StoragePaths;
use crate::pool::StoragePool;
use crate::sessions::{FileSessionStore, MemorySessionStore, NewSession, SessionStore};

async fn file_store() -> (TempDir, FileSessionStore) {
    let dir = tempdir().unwrap();
    let pool = StoragePool::open(StoragePaths::from_root(dir.path().to_path_buf()), 8)
        .await
        .unwrap();
    (dir, FileSessionStore::new(pool))
}

async fn check_crud(store: &dyn SessionStore) {
    let session = store
        .create(NewSession::new("u1").with_name(Some("First".to_string())))
        .await
        .unwrap();
    assert_eq!(session.name, "First");
    assert_eq!(session.thread_id, session.session_id);

    let fetched = store.get(&session.session_id).await.unwrap();
    assert_eq!(fetched, session);

    let by_thread = store.get_by_thread(&session.thread_id).await.unwrap();
    assert_eq!(by_thread.session_id, session.session_id);

    let renamed = store.rename(&session.session_id, "Second").await.unwrap();
    assert_eq!(renamed.name, "Second");
    assert_eq!(renamed.thread_id, session.thread_id);
    assert!(renamed.updated_at >= session.updated_at);

    assert!(store.delete(&session.session_id).await.unwrap());
    assert!(!store.delete(&session.session_id).await.unwrap());
    let err = store.get(&session.session_id).await.unwrap_err();
    assert!(matches!(err, StorageError::SessionNotFound(_)));
    assert!(store.list_for_user("u1").await.unwrap().is_empty());
}

async fn check_touch_monotonic(store: &dyn SessionStore) {
    let session = store.create(NewSession::new("u1")).await.unwrap();
    let first = store.touch(&session.session_id).await.unwrap();
    let second = store.touch(&session.session_id).await.unwrap();
    assert!(first.updated_at >= session.updated_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(second.created_at, session.created_at);
}

async fn check_list_order(store: &dyn SessionStore) {
    let a = store.create(NewSession::new("u1")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let b = store.create(NewSession::new("u1")).await.unwrap();
    store.create(NewSession::new("u2")).await.unwrap();

    let listed = store.list_for_user("u1").await.unwrap();
    let ids: Vec<_> = listed.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec![b.session_id.as_str(), a.session_id.as_str()]);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store.touch(&a.session_id).await.unwrap();
    let listed = store.list_for_user("u1").await.unwrap();
    assert_eq!(listed[0].session_id, a.session_id);
}

async fn check_missing(store: &dyn SessionStore) {
    assert!(store.get("missing").await.unwrap_err().is_not_found());
    assert!(store.get_by_thread("missing").await.unwrap_err().is_not_found());
    assert!(store.touch("missing").await.unwrap_err().is_not_found());
    assert!(store.rename("missing", "x").await.unwrap_err().is_not_found());
}

async fn check_thread_binding_is_unique(store: &dyn SessionStore) {
    let first = store
        .create(NewSession::new("u1").with_thread_id("shared-thread"))
        .await
        .unwrap();
    assert_eq!(first.thread_id, "shared-thread");

    let err = store
        .create(NewSession::new("u2").with_thread_id("shared-thread"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::ThreadAlreadyBound(_)));
}

#[tokio::test]
async fn test_file_session_crud() {
    let (_dir, store) = file_store().await;
    check_crud(&store).await;
}

#[tokio::test]
async fn test_memory_session_crud() {
    check_crud(&MemorySessionStore::new()).await;
}

#[tokio::test]
async fn test_touch_never_decreases() {
    let (_dir, store) = file_store().await;
    check_touch_monotonic(&store).await;
    check_touch_monotonic(&MemorySessionStore::new()).await;
}

#[tokio::test]
async fn test_list_sorted_by_updated_desc() {
    let (_dir, store) = file_store().await;
    check_list_order(&store).await;
    check_list_order(&MemorySessionStore::new()).await;
}

#[tokio::test]
async fn test_missing_sessions_are_not_found() {
    let (_dir, store) = file_store().await;
    check_missing(&store).await;
    check_missing(&MemorySessionStore::new()).await;
}

#[tokio::test]
async fn test_thread_binding_is_unique() {
    let (_dir, store) = file_store().await;
    check_thread_binding_is_unique(&store).await;
    check_thread_binding_is_unique(&MemorySessionStore::new()).await;
}

#[tokio::test]
async fn test_invalid_ids_are_rejected() {
    let (_dir, store) = file_store().await;
    let err = store.get("../../etc/passwd").await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidId(_)));
    assert!(err.is_not_found());
    assert!(store.delete("a/b").await.is_err());
}

#[tokio::test]
async fn test_file_sessions_survive_reopen() {
    let dir = tempdir().unwrap();
    let paths = StoragePaths::from_root(dir.path().to_path_buf());

    let created = {
        let pool = StoragePool::open(paths.clone(), 4).await.unwrap();
        FileSessionStore::new(pool)
            .create(NewSession::new("u1"))
            .await
            .unwrap()
    };

    let pool = StoragePool::open(paths, 4).await.unwrap();
    let store = FileSessionStore::new(pool);
    assert_eq!(store.get(&created.session_id).await.unwrap(), created);
}

#[tokio::test]
async fn test_corrupt_record_is_skipped_in_listing() {
    let (dir, store) = file_store().await;
    store.create(NewSession::new("u1")).await.unwrap();
    std::fs::write(dir.path().join("sessions").join("broken.json"), "{not json").unwrap();

    let listed = store.list_for_user("u1").await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_concurrent_touches_keep_record_intact() {
    let (_dir, store) = file_store().await;
    let store = Arc::new(store);
    let session = store.create(NewSession::new("u1")).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        let id = session.session_id.clone();
        handles.push(tokio::spawn(async move { store.touch(&id).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let fetched = store.get(&session.session_id).await.unwrap();
    assert!(fetched.updated_at >= session.updated_at);
    assert_eq!(fetched.thread_id, session.thread_id);
}

#[tokio::test]
async fn test_closed_pool_fails_operations() {
    let (_dir, store) = file_store().await;
    store.pool().close();
    let err = store.create(NewSession::new("u1")).await.unwrap_err();
    assert!(matches!(err, StorageError::Closed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_during_touches_see_whole_records() {
    let (_dir, store) = file_store().await;
    let store = Arc::new(store);
    let session = store.create(NewSession::new("u1")).await.unwrap();

    let writer = {
        let store = Arc::clone(&store);
        let id = session.session_id.clone();
        tokio::spawn(async move {
            for _ in 0..300 {
                store.touch(&id).await.unwrap();
            }
        })
    };

    let mut get_errors = Vec::new();
    let mut list_misses = 0;
    while !writer.is_finished() {
        if let Err(e) = store.get(&session.session_id).await {
            get_errors.push(e.to_string());
        }
        if store.list_for_user("u1").await.unwrap().len() != 1 {
            list_misses += 1;
        }
    }
    writer.await.unwrap();

    assert!(get_errors.is_empty(), "get failed mid-write: {get_errors:?}");
    assert_eq!(list_misses, 0);
    assert_eq!(store.list_for_user("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_write_leaves_no_temp_files() {
    let (dir, store) = file_store().await;
    let session = store.create(NewSession::new("u1")).await.unwrap();
    store.touch(&session.session_id).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path().join("sessions"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![format!("{}.json", session.session_id)]);
}
