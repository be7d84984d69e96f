//! Per-recipient snapshots of resolved capabilities
//!
//! ```text
//! /<recipient>/.capabilitycache/<friend>r
//! /<recipient>/.capabilitycache/<friend>w
//! ```
//!
//! A snapshot records the log length it was resolved up to, so the next load
//! only has to read what was appended since. Snapshots are advisory: any
//! snapshot that cannot be read is treated as absent.

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::capability::{AccessKind, CapabilityWithPath};
use crate::codec::CborEncoded;
use crate::vault::{FileWrapper, FsError};

/// Directory under the recipient's home that holds snapshots
pub const CAPABILITY_CACHE_DIR: &str = ".capabilitycache";

/// Bound on lookups when creating the cache directory: one before the
///  mkdir, one after
const CACHE_DIR_LOOKUPS: usize = 2;

/// Capabilities resolved from one friend's log, up to `bytes_read`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesFromUser {
    pub bytes_read: u64,
    pub capabilities: Vec<CapabilityWithPath>,
}

impl CborEncoded for CapabilitiesFromUser {}

impl CapabilitiesFromUser {
    pub fn new(bytes_read: u64, capabilities: Vec<CapabilityWithPath>) -> Self {
        Self {
            bytes_read,
            capabilities,
        }
    }
}

/// Outcome of looking a snapshot up
#[derive(Debug)]
pub enum CacheLookup {
    Missing,
    /// A file is there but does not hold a snapshot
    Unusable,
    Hit(CapabilitiesFromUser),
}

/// `/<home>/.capabilitycache/`, created as a system directory if needed
pub async fn capability_cache_dir(home: &FileWrapper) -> Result<FileWrapper, FsError> {
    for _ in 0..CACHE_DIR_LOOKUPS {
        if let Some(dir) = home.get_child(CAPABILITY_CACHE_DIR).await? {
            return Ok(dir);
        }
        // mkdir hands back the parent, so look the child up again
        match home.mkdir(CAPABILITY_CACHE_DIR, true).await {
            Ok(_) => tracing::debug!("created {} in {}", CAPABILITY_CACHE_DIR, home.name()),
            Err(FsError::AlreadyExists(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Err(FsError::NotFound(CAPABILITY_CACHE_DIR.to_string()))
}

/// `/<home>/.capabilitycache/` if it already exists
pub async fn existing_capability_cache_dir(
    home: &FileWrapper,
) -> Result<Option<FileWrapper>, FsError> {
    home.get_child(CAPABILITY_CACHE_DIR).await
}

pub async fn load_cache(cache_dir: &FileWrapper, friend: &str, kind: AccessKind) -> CacheLookup {
    let name = kind.cache_file_name(friend);
    let file = match cache_dir.get_child(&name).await {
        Ok(Some(file)) => file,
        Ok(None) => return CacheLookup::Missing,
        Err(e) => {
            tracing::warn!("capability cache {} unreadable: {}", name, e);
            return CacheLookup::Unusable;
        }
    };

    let decoded = match file.read_all().await {
        Ok(bytes) => CapabilitiesFromUser::decode(&bytes).map_err(FsError::from),
        Err(e) => Err(e),
    };
    match decoded {
        Ok(snapshot) => CacheLookup::Hit(snapshot),
        Err(e) => {
            tracing::warn!("capability cache {} unreadable: {}", name, e);
            CacheLookup::Unusable
        }
    }
}

/// Replace the snapshot for `friend` in one upload
pub async fn save_cache(
    cache_dir: &FileWrapper,
    friend: &str,
    kind: AccessKind,
    snapshot: &CapabilitiesFromUser,
) -> Result<(), FsError> {
    let name = kind.cache_file_name(friend);
    let bytes = snapshot.encode()?;
    cache_dir.upload_or_overwrite_file(&name, &bytes).await?;
    tracing::info!(
        "cached {} capabilities from {} up to offset {}",
        snapshot.capabilities.len(),
        friend,
        snapshot.bytes_read
    );
    Ok(())
}

/// Deferred source of the recipient's home directory
#[async_trait]
pub trait HomeDirSupplier: Send + Sync {
    async fn home(&self) -> Result<FileWrapper, FsError>;
}

#[async_trait]
impl HomeDirSupplier for FileWrapper {
    async fn home(&self) -> Result<FileWrapper, FsError> {
        Ok(self.clone())
    }
}

/// Home directory produced by an async closure on first use and remembered
///  afterwards. A failed attempt is not remembered.
pub struct LazyHome<F> {
    supplier: F,
    home: OnceCell<FileWrapper>,
}

impl<F, Fut> LazyHome<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<FileWrapper, FsError>> + Send,
{
    pub fn new(supplier: F) -> Self {
        Self {
            supplier,
            home: OnceCell::new(),
        }
    }
}

#[async_trait]
impl<F, Fut> HomeDirSupplier for LazyHome<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<FileWrapper, FsError>> + Send,
{
    async fn home(&self) -> Result<FileWrapper, FsError> {
        self.home
            .get_or_try_init(|| (self.supplier)())
            .await
            .cloned()
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::crypto::SecretKey;
    use crate::vault::Vault;

    async fn home() -> FileWrapper {
        let vault = Vault::memory().await.unwrap();
        let cap = vault.register("bob", &SecretKey::generate()).await.unwrap();
        vault.open(&cap.into()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_cache_dir_created_once() {
        let home = home().await;
        assert!(existing_capability_cache_dir(&home)
            .await
            .unwrap()
            .is_none());

        let first = capability_cache_dir(&home).await.unwrap();
        assert!(first.is_system());
        let second = capability_cache_dir(&home).await.unwrap();
        assert_eq!(first.location(), second.location());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_and_unusable() {
        let home = home().await;
        let cache_dir = capability_cache_dir(&home).await.unwrap();

        assert!(matches!(
            load_cache(&cache_dir, "alice", AccessKind::Read).await,
            CacheLookup::Missing
        ));

        let snapshot = CapabilitiesFromUser::new(42, Vec::new());
        save_cache(&cache_dir, "alice", AccessKind::Read, &snapshot)
            .await
            .unwrap();
        match load_cache(&cache_dir, "alice", AccessKind::Read).await {
            CacheLookup::Hit(found) => assert_eq!(found, snapshot),
            other => panic!("expected a hit, got {:?}", other),
        }
        // the write snapshot is a different file
        assert!(matches!(
            load_cache(&cache_dir, "alice", AccessKind::Write).await,
            CacheLookup::Missing
        ));

        cache_dir
            .upload_or_overwrite_file("alicer", b"not a snapshot")
            .await
            .unwrap();
        assert!(matches!(
            load_cache(&cache_dir, "alice", AccessKind::Read).await,
            CacheLookup::Unusable
        ));
    }

    #[tokio::test]
    async fn test_lazy_home_runs_supplier_once() {
        let home = home().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = {
            let calls = calls.clone();
            let home = home.clone();
            LazyHome::new(move || {
                let calls = calls.clone();
                let home = home.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(home)
                }
            })
        };

        let first = lazy.home().await.unwrap();
        let second = lazy.home().await.unwrap();
        assert_eq!(first.location(), second.location());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
