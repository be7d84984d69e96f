use async_trait::async_trait;

use crate::capability::EntryPoint;

use super::{FileWrapper, FsError, Vault};

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

/// Where entry points are looked up.
///
/// Implementations answer `Ok(None)` when the network does not know the
///  entry point and `Err` when it could not be asked; callers resolving
///  shared capabilities treat the two the same way.
#[async_trait]
pub trait Network: Send + Sync + std::fmt::Debug + 'static {
    async fn retrieve_entry_point(
        &self,
        entry: &EntryPoint,
    ) -> Result<Option<FileWrapper>, NetworkError>;
}

#[async_trait]
impl Network for Vault {
    async fn retrieve_entry_point(
        &self,
        entry: &EntryPoint,
    ) -> Result<Option<FileWrapper>, NetworkError> {
        // the claimed owner name must belong to the key that owns the location
        if self.user_key(&entry.owner_name) != Some(entry.pointer.owner()) {
            tracing::debug!(
                "entry point owner {} does not match {}",
                entry.owner_name,
                entry.pointer.location()
            );
            return Ok(None);
        }
        Ok(self.open(&entry.pointer).await?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::SecretKey;

    #[tokio::test]
    async fn test_retrieve_checks_owner_name() {
        let vault = Vault::memory().await.unwrap();
        let home = vault
            .register("alice", &SecretKey::generate())
            .await
            .unwrap();
        vault.register("bob", &SecretKey::generate()).await.unwrap();

        let found = vault
            .retrieve_entry_point(&EntryPoint::new(home.clone().into(), "alice"))
            .await
            .unwrap();
        assert_eq!(found.unwrap().name(), "alice");

        let wrong_owner = vault
            .retrieve_entry_point(&EntryPoint::new(home.clone().into(), "bob"))
            .await
            .unwrap();
        assert!(wrong_owner.is_none());

        let unknown = vault
            .retrieve_entry_point(&EntryPoint::new(home.into(), "carol"))
            .await
            .unwrap();
        assert!(unknown.is_none());
    }
}
