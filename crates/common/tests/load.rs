//! Integration tests for loading shared capabilities

mod common;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ::common::capability::{AccessKind, CapabilityWithPath};
use ::common::sharing::{
    load_cache, save_cache, CacheLookup, CapabilitiesFromUser, LazyHome, SharingConfig,
    SharingError, CAPABILITY_CACHE_DIR,
};

use common::record_len;

#[tokio::test]
async fn test_empty_log_loads_nothing() {
    let env = common::setup_test_env().await;
    let friend_dir = env.friend_dir().await;

    for kind in [AccessKind::Read, AccessKind::Write] {
        let loaded = env
            .store
            .load_all(&env.bob, &friend_dir, "alice", kind, true)
            .await
            .unwrap();
        assert_eq!(loaded, CapabilitiesFromUser::default());
    }
    assert!(env.bob.get_child(CAPABILITY_CACHE_DIR).await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_log_never_asks_for_home() {
    let env = common::setup_test_env().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let home = {
        let calls = calls.clone();
        let bob = env.bob.clone();
        LazyHome::new(move || {
            let calls = calls.clone();
            let bob = bob.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(bob)
            }
        })
    };

    env.store
        .load_all_read(&home, &env.friend_dir().await, "alice", true)
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    env.share_read("docs", "x.txt").await;
    env.store
        .load_all_read(&home, &env.friend_dir().await, "alice", true)
        .await
        .unwrap();
    env.store
        .load_all_read(&home, &env.friend_dir().await, "alice", true)
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_single_append_then_load() {
    let env = common::setup_test_env().await;
    let cap = env.share_read("docs", "x.txt").await;

    let loaded = env
        .store
        .load_all_read(&env.bob, &env.friend_dir().await, "alice", true)
        .await
        .unwrap();
    assert_eq!(
        loaded,
        CapabilitiesFromUser::new(
            record_len(&cap),
            vec![CapabilityWithPath::new(
                PathBuf::from("/alice/docs/x.txt"),
                cap
            )]
        )
    );

    let cache_dir = env.bob.get_child(CAPABILITY_CACHE_DIR).await.unwrap().unwrap();
    assert!(cache_dir.is_system());
    match load_cache(&cache_dir, "alice", AccessKind::Read).await {
        CacheLookup::Hit(snapshot) => assert_eq!(snapshot, loaded),
        other => panic!("expected a cached snapshot, got {:?}", other),
    }
}

#[tokio::test]
async fn test_incremental_load() {
    let env = common::setup_test_env().await;
    let cap = env.share_read("docs", "x.txt").await;
    let first = env
        .store
        .load_all_read(&env.bob, &env.friend_dir().await, "alice", true)
        .await
        .unwrap();

    let cap2 = env.share_read("docs", "y.txt").await;
    let lookups_before = env.network.lookups();
    let second = env
        .store
        .load_all_read(&env.bob, &env.friend_dir().await, "alice", true)
        .await
        .unwrap();

    assert_eq!(second.bytes_read, first.bytes_read + record_len(&cap2));
    assert_eq!(
        second.capabilities,
        vec![
            CapabilityWithPath::new(PathBuf::from("/alice/docs/x.txt"), cap),
            CapabilityWithPath::new(PathBuf::from("/alice/docs/y.txt"), cap2),
        ]
    );
    assert_eq!(&second.capabilities[..1], &first.capabilities[..]);
    // only the new record was resolved
    assert_eq!(env.network.lookups(), lookups_before + 1);
}

#[tokio::test]
async fn test_repeated_load_uses_cache() {
    let env = common::setup_test_env().await;
    env.share_read("docs", "x.txt").await;
    env.share_read("docs", "y.txt").await;
    let friend_dir = env.friend_dir().await;

    let first = env
        .store
        .load_all_read(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();
    let lookups = env.network.lookups();
    let second = env
        .store
        .load_all_read(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(env.network.lookups(), lookups);
}

#[tokio::test]
async fn test_stale_ancestor_is_skipped() {
    let env = common::setup_test_env().await;
    env.share_read("docs", "x.txt").await;
    let cap2 = env.share_read("notes", "y.txt").await;

    env.alice.remove_child("docs").await.unwrap();

    let loaded = env
        .store
        .load_all_read(&env.bob, &env.friend_dir().await, "alice", false)
        .await
        .unwrap();
    let log_len = env
        .store
        .read_capability_file_size(&env.friend_dir().await)
        .await
        .unwrap();
    assert_eq!(loaded.bytes_read, log_len);
    assert_eq!(
        loaded.capabilities,
        vec![CapabilityWithPath::new(
            PathBuf::from("/alice/notes/y.txt"),
            cap2
        )]
    );
}

#[tokio::test]
async fn test_order_preserved_across_chunks() {
    let env = common::setup_test_env_with(SharingConfig {
        resolve_concurrency: 4,
        read_chunk_size: 64,
        ..SharingConfig::default()
    })
    .await;

    let mut expected = Vec::new();
    for i in 0..12 {
        let name = format!("{:02}.txt", i);
        let cap = env.share_read("docs", &name).await;
        expected.push(CapabilityWithPath::new(
            PathBuf::from(format!("/alice/docs/{}", name)),
            cap,
        ));
    }

    let loaded = env
        .store
        .load_all_read(&env.bob, &env.friend_dir().await, "alice", false)
        .await
        .unwrap();
    assert_eq!(loaded.capabilities, expected);
}

#[tokio::test]
async fn test_read_and_write_logs_are_independent() {
    let env = common::setup_test_env().await;
    let read_cap = env.share_read("docs", "r.txt").await;
    let write_cap = env.share_write("docs", "w.txt").await;
    let friend_dir = env.friend_dir().await;

    let reads = env
        .store
        .load_all_read(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();
    let writes = env
        .store
        .load_all_write(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();

    assert_eq!(reads.bytes_read, record_len(&read_cap));
    assert_eq!(writes.bytes_read, record_len(&write_cap));
    assert_eq!(reads.capabilities[0].cap, read_cap);
    assert_eq!(writes.capabilities[0].cap, write_cap);
    assert!(writes.capabilities[0].cap.is_writable());

    env.share_read("docs", "r2.txt").await;
    let writes_again = env
        .store
        .load_all_write(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();
    assert_eq!(writes_again, writes);
}

#[tokio::test]
async fn test_first_load_with_nothing_resolved_is_not_cached() {
    let env = common::setup_test_env().await;
    let cap = env.share_read("docs", "x.txt").await;
    env.network.fail(cap.location());

    let loaded = env
        .store
        .load_all_read(&env.bob, &env.friend_dir().await, "alice", true)
        .await
        .unwrap();
    assert!(loaded.capabilities.is_empty());
    assert_eq!(loaded.bytes_read, record_len(&cap));

    let cache_dir = env.bob.get_child(CAPABILITY_CACHE_DIR).await.unwrap().unwrap();
    assert!(matches!(
        load_cache(&cache_dir, "alice", AccessKind::Read).await,
        CacheLookup::Missing
    ));

    // the next load tries again
    env.network.heal(&cap.location());
    let loaded = env
        .store
        .load_all_read(&env.bob, &env.friend_dir().await, "alice", true)
        .await
        .unwrap();
    assert_eq!(loaded.capabilities.len(), 1);
}

#[tokio::test]
async fn test_unreadable_cache_is_rebuilt() {
    let env = common::setup_test_env().await;
    let cap = env.share_read("docs", "x.txt").await;
    let friend_dir = env.friend_dir().await;
    env.store
        .load_all_read(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();

    let cache_dir = env.bob.get_child(CAPABILITY_CACHE_DIR).await.unwrap().unwrap();
    cache_dir
        .upload_or_overwrite_file("alicer", b"\xffgarbage")
        .await
        .unwrap();

    let loaded = env
        .store
        .load_all_read(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();
    assert_eq!(loaded.bytes_read, record_len(&cap));
    assert_eq!(loaded.capabilities.len(), 1);
    match load_cache(&cache_dir, "alice", AccessKind::Read).await {
        CacheLookup::Hit(snapshot) => assert_eq!(snapshot, loaded),
        other => panic!("expected the cache to be rewritten, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cache_past_log_end_is_rebuilt() {
    let env = common::setup_test_env().await;
    env.share_read("docs", "x.txt").await;
    let friend_dir = env.friend_dir().await;

    let cache_dir = ::common::sharing::capability_cache_dir(&env.bob)
        .await
        .unwrap();
    save_cache(
        &cache_dir,
        "alice",
        AccessKind::Read,
        &CapabilitiesFromUser::new(1 << 20, Vec::new()),
    )
    .await
    .unwrap();

    let loaded = env
        .store
        .load_all_read(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();
    assert_eq!(loaded.capabilities.len(), 1);
    assert!(loaded.bytes_read < 1 << 20);
}

#[tokio::test]
async fn test_misaligned_cache_is_rebuilt() {
    let env = common::setup_test_env().await;
    let cap = env.share_read("docs", "x.txt").await;
    env.share_read("docs", "y.txt").await;
    let friend_dir = env.friend_dir().await;

    let expected = env
        .store
        .load_all_read(&env.bob, &friend_dir, "alice", false)
        .await
        .unwrap();
    assert_eq!(expected.capabilities.len(), 2);

    // an offset inside the first record
    let cache_dir = ::common::sharing::capability_cache_dir(&env.bob)
        .await
        .unwrap();
    save_cache(
        &cache_dir,
        "alice",
        AccessKind::Read,
        &CapabilitiesFromUser::new(record_len(&cap) - 7, Vec::new()),
    )
    .await
    .unwrap();

    let loaded = env
        .store
        .load_all_read(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();
    assert_eq!(loaded, expected);

    match load_cache(&cache_dir, "alice", AccessKind::Read).await {
        CacheLookup::Hit(snapshot) => assert_eq!(snapshot, expected),
        _ => panic!("snapshot was not rewritten"),
    }
    let again = env
        .store
        .load_all_read(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();
    assert_eq!(again, expected);
}

#[tokio::test]
async fn test_load_from_returns_slice_and_extends_cache() {
    let env = common::setup_test_env().await;
    let cap = env.share_read("docs", "x.txt").await;
    let friend_dir = env.friend_dir().await;
    let first_len = record_len(&cap);

    let first = env
        .store
        .load_from_read(&env.bob, &friend_dir, "alice", 0, true)
        .await
        .unwrap();
    assert_eq!(first.bytes_read, first_len);

    let cap2 = env.share_read("docs", "y.txt").await;
    let delta = env
        .store
        .load_from_read(&env.bob, &friend_dir, "alice", first_len, true)
        .await
        .unwrap();
    assert_eq!(delta.bytes_read, record_len(&cap2));
    assert_eq!(delta.capabilities.len(), 1);
    assert_eq!(delta.capabilities[0].cap, cap2);

    // the cache holds the whole log, not the slice
    let cache_dir = env.bob.get_child(CAPABILITY_CACHE_DIR).await.unwrap().unwrap();
    match load_cache(&cache_dir, "alice", AccessKind::Read).await {
        CacheLookup::Hit(snapshot) => {
            assert_eq!(snapshot.bytes_read, first_len + record_len(&cap2));
            assert_eq!(snapshot.capabilities.len(), 2);
        }
        other => panic!("expected a cached snapshot, got {:?}", other),
    }

    // and load_all agrees with it without resolving anything
    let lookups = env.network.lookups();
    let all = env
        .store
        .load_all_read(&env.bob, &friend_dir, "alice", true)
        .await
        .unwrap();
    assert_eq!(all.capabilities.len(), 2);
    assert_eq!(env.network.lookups(), lookups);
}

#[tokio::test]
async fn test_load_from_leaves_unaligned_cache_alone() {
    let env = common::setup_test_env().await;
    let cap = env.share_read("docs", "x.txt").await;
    let cap2 = env.share_read("docs", "y.txt").await;
    let friend_dir = env.friend_dir().await;

    // no snapshot ends at this offset, so nothing is cached
    let delta = env
        .store
        .load_from_read(&env.bob, &friend_dir, "alice", record_len(&cap), true)
        .await
        .unwrap();
    assert_eq!(delta.capabilities.len(), 1);
    assert_eq!(delta.capabilities[0].cap, cap2);

    let cache_dir = env.bob.get_child(CAPABILITY_CACHE_DIR).await.unwrap().unwrap();
    assert!(matches!(
        load_cache(&cache_dir, "alice", AccessKind::Read).await,
        CacheLookup::Missing
    ));
}

#[tokio::test]
async fn test_load_from_past_end_rejected() {
    let env = common::setup_test_env().await;
    let cap = env.share_read("docs", "x.txt").await;

    let result = env
        .store
        .load_from_read(
            &env.bob,
            &env.friend_dir().await,
            "alice",
            record_len(&cap) + 1,
            false,
        )
        .await;
    assert!(matches!(result, Err(SharingError::InvalidArgument(_))));
}
