//! Shared test utilities for sharing store integration tests
#![allow(dead_code)]

use common::capability::{Capability, WritableCapability};
use common::codec::encode_record;
use common::crypto::SecretKey;
use common::sharing::{ensure_sharing_dir, SharingConfig, SharingStore};
use common::testkit::FaultyNetwork;
use common::vault::{FileWrapper, Vault};

pub type TestStore = SharingStore<FaultyNetwork<Vault>>;

/// Two registered users, alice (the owner) and bob (the recipient), and a
///  sharing store whose network can be told to fail
pub struct TestEnv {
    pub vault: Vault,
    pub network: FaultyNetwork<Vault>,
    pub store: TestStore,
    pub alice: FileWrapper,
    pub bob: FileWrapper,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Set up a test environment with the default sharing config
pub async fn setup_test_env() -> TestEnv {
    setup_test_env_with(SharingConfig::default()).await
}

pub async fn setup_test_env_with(config: SharingConfig) -> TestEnv {
    init_tracing();
    let vault = Vault::memory().await.unwrap();

    let alice_cap = vault
        .register("alice", &SecretKey::generate())
        .await
        .unwrap();
    let bob_cap = vault.register("bob", &SecretKey::generate()).await.unwrap();
    let alice = vault.open(&alice_cap.into()).await.unwrap().unwrap();
    let bob = vault.open(&bob_cap.into()).await.unwrap().unwrap();

    let network = FaultyNetwork::new(vault.clone());
    let store = SharingStore::new(network.clone(), config);

    TestEnv {
        vault,
        network,
        store,
        alice,
        bob,
    }
}

impl TestEnv {
    /// `/alice/sharing/bob/`, as alice sees it
    pub async fn sharing_dir(&self) -> FileWrapper {
        ensure_sharing_dir(&self.alice, "bob").await.unwrap()
    }

    /// `/alice/sharing/bob/`, as bob sees it
    pub async fn friend_dir(&self) -> FileWrapper {
        self.sharing_dir().await.read_only()
    }

    /// Create `/alice/<dir>/<name>` and return its capability
    pub async fn alice_file(&self, dir: &str, name: &str) -> WritableCapability {
        let parent = match self.alice.get_child(dir).await.unwrap() {
            Some(parent) => parent,
            None => {
                self.alice.mkdir(dir, false).await.unwrap();
                self.alice.get_child(dir).await.unwrap().unwrap()
            }
        };
        parent
            .upload_or_overwrite_file(name, name.as_bytes())
            .await
            .unwrap();
        parent
            .get_child(name)
            .await
            .unwrap()
            .unwrap()
            .capability()
            .as_writable()
            .cloned()
            .unwrap()
    }

    /// Share `/alice/<dir>/<name>` read-only with bob
    pub async fn share_read(&self, dir: &str, name: &str) -> Capability {
        let cap: Capability = self.alice_file(dir, name).await.into();
        self.store
            .add_read_only_sharing_link(&self.sharing_dir().await, &cap)
            .await
            .unwrap();
        cap.read_only()
    }

    /// Share `/alice/<dir>/<name>` writable with bob
    pub async fn share_write(&self, dir: &str, name: &str) -> Capability {
        let cap = self.alice_file(dir, name).await;
        self.store
            .add_edit_sharing_link(&self.sharing_dir().await, &cap)
            .await
            .unwrap();
        cap.into()
    }
}

pub fn record_len(cap: &Capability) -> u64 {
    encode_record(cap).unwrap().len() as u64
}
