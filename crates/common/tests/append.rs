//! Integration tests for appending to sharing logs

mod common;

use ::common::capability::{AccessKind, Capability};
use ::common::codec::parse_records;
use ::common::sharing::{SharingConfig, SharingError};

use common::record_len;

#[tokio::test]
async fn test_append_grows_log_by_record_length() {
    let env = common::setup_test_env().await;
    let dir = env.sharing_dir().await;

    for kind in [AccessKind::Read, AccessKind::Write] {
        for name in ["a.txt", "b.txt"] {
            let cap: Capability = env.alice_file("docs", name).await.into();
            let before = env.store.capability_file_size(&dir, kind).await.unwrap();

            env.store.add_link(&dir, &cap, kind).await.unwrap();

            let expected = match kind {
                AccessKind::Read => record_len(&cap.read_only()),
                AccessKind::Write => record_len(&cap),
            };
            let after = env.store.capability_file_size(&dir, kind).await.unwrap();
            assert_eq!(after, before + expected);
        }
    }
}

#[tokio::test]
async fn test_append_returns_updated_directory() {
    let env = common::setup_test_env().await;
    let cap: Capability = env.alice_file("docs", "x.txt").await.into();

    let dir = env
        .store
        .add_read_only_sharing_link(&env.sharing_dir().await, &cap)
        .await
        .unwrap();
    let log = dir.get_child("sharing.r").await.unwrap().unwrap();
    assert_eq!(log.size(), record_len(&cap.read_only()));
}

#[tokio::test]
async fn test_append_to_read_only_directory_rejected() {
    let env = common::setup_test_env().await;
    let cap = env.share_read("docs", "x.txt").await;
    let before = env
        .store
        .read_capability_file_size(&env.friend_dir().await)
        .await
        .unwrap();

    let result = env
        .store
        .add_read_only_sharing_link(&env.friend_dir().await, &cap)
        .await;
    assert!(matches!(result, Err(SharingError::InvalidArgument(_))));

    let after = env
        .store
        .read_capability_file_size(&env.friend_dir().await)
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_append_to_file_rejected() {
    let env = common::setup_test_env().await;
    let cap = env.alice_file("docs", "x.txt").await;
    let docs = env.alice.get_child("docs").await.unwrap().unwrap();
    let file = docs.get_child("x.txt").await.unwrap().unwrap();

    let result = env
        .store
        .add_read_only_sharing_link(&file, &cap.into())
        .await;
    assert!(matches!(result, Err(SharingError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_edit_link_requires_writable_capability() {
    let env = common::setup_test_env().await;
    let cap: Capability = env.alice_file("docs", "x.txt").await.into();
    let dir = env.sharing_dir().await;

    let result = env
        .store
        .add_link(&dir, &cap.read_only(), AccessKind::Write)
        .await;
    assert!(matches!(result, Err(SharingError::InvalidArgument(_))));
    assert_eq!(env.store.write_capability_file_size(&dir).await.unwrap(), 0);
}

#[tokio::test]
async fn test_read_link_is_logged_as_projection() {
    let env = common::setup_test_env().await;
    env.share_read("docs", "x.txt").await;

    let log = env
        .friend_dir()
        .await
        .get_child("sharing.r")
        .await
        .unwrap()
        .unwrap();
    let parsed = parse_records::<Capability>(&log.read_all().await.unwrap()).unwrap();

    assert_eq!(parsed.records.len(), 1);
    assert!(!parsed.records[0].is_writable());
    assert!(parsed.records[0].write_key().is_none());
}

#[tokio::test]
async fn test_concurrent_appends_all_land() {
    let env = common::setup_test_env_with(SharingConfig {
        append_attempts: 8,
        ..SharingConfig::default()
    })
    .await;
    let dir = env.sharing_dir().await;

    let mut caps = Vec::new();
    for i in 0..4 {
        let cap: Capability = env.alice_file("docs", &format!("{}.txt", i)).await.into();
        caps.push(cap.read_only());
    }

    let appends = caps
        .iter()
        .map(|cap| env.store.add_link(&dir, cap, AccessKind::Read));
    for result in futures::future::join_all(appends).await {
        result.unwrap();
    }

    let expected: u64 = caps.iter().map(record_len).sum();
    assert_eq!(env.store.read_capability_file_size(&dir).await.unwrap(), expected);

    let log = dir.get_child("sharing.r").await.unwrap().unwrap();
    let parsed = parse_records::<Capability>(&log.read_all().await.unwrap()).unwrap();
    assert_eq!(parsed.records.len(), caps.len());
    for cap in &caps {
        assert!(parsed.records.contains(cap));
    }
}
