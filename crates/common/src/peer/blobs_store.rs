use std::future::IntoFuture;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use bytes::Bytes;
use iroh_blobs::{
    api::{
        blobs::{BlobStatus, Blobs},
        ExportBaoError, RequestError,
    },
    store::{fs::FsStore, mem::MemStore},
    BlobsProtocol, Hash,
};

/// Client over a local iroh-blob store.
///  Holds every encrypted node body in the vault; nodes are
///  addressed by the BLAKE3 hash iroh-blobs assigns them, and
///  the vault's pointer table maps locations onto those hashes.
#[derive(Clone, Debug)]
pub struct BlobsStore {
    pub inner: Arc<BlobsProtocol>,
}

impl Deref for BlobsStore {
    type Target = Arc<BlobsProtocol>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlobsStoreError {
    #[error("blobs store error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("blob store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("export bao error: {0}")]
    ExportBao(#[from] ExportBaoError),
    #[error("request error: {0}")]
    Request(#[from] RequestError),
}

impl BlobsStore {
    /// Load a blob store from the given path
    ///
    /// # Arguments
    /// * `path` - Path to the blob store on disk
    pub async fn fs(path: &Path) -> Result<Self, BlobsStoreError> {
        tracing::debug!("BlobsStore::fs called with path: {:?}", path);
        let store = FsStore::load(path).await?;
        tracing::debug!("BlobsStore::fs completed loading FsStore");
        let blobs = BlobsProtocol::new(&store, None);
        Ok(Self {
            inner: Arc::new(blobs),
        })
    }

    /// Load a memory blobs store
    pub async fn memory() -> Result<Self, BlobsStoreError> {
        let store = MemStore::new();
        let blobs = BlobsProtocol::new(&store, None);
        Ok(Self {
            inner: Arc::new(blobs),
        })
    }

    /// Get a handle to the underlying blobs client against
    ///  the store
    pub fn blobs(&self) -> &Blobs {
        self.inner.store().blobs()
    }

    /// Get a blob as bytes
    pub async fn get(&self, hash: &Hash) -> Result<Bytes, BlobsStoreError> {
        let bytes = self.blobs().get_bytes(*hash).await?;
        Ok(bytes)
    }

    /// Store a vec of bytes as a blob
    pub async fn put(&self, data: Vec<u8>) -> Result<Hash, BlobsStoreError> {
        let hash = self.blobs().add_bytes(data).into_future().await?.hash;
        Ok(hash)
    }

    /// Get the stat of a blob
    pub async fn stat(&self, hash: &Hash) -> Result<bool, BlobsStoreError> {
        let stat = self
            .blobs()
            .status(*hash)
            .await
            .map_err(|err| BlobsStoreError::Default(anyhow!(err)))?;
        Ok(matches!(stat, BlobStatus::Complete { .. }))
    }

    /// Flush and stop the underlying store. Blobs added before this
    ///  returns are durable on disk for an fs store.
    pub async fn shutdown(&self) -> Result<(), BlobsStoreError> {
        self.inner
            .store()
            .shutdown()
            .await
            .map_err(|err| BlobsStoreError::Default(anyhow!(err)))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_put_get() {
        let store = BlobsStore::memory().await.unwrap();
        let hash = store.put(b"encrypted node".to_vec()).await.unwrap();

        assert!(store.stat(&hash).await.unwrap());
        let bytes = store.get(&hash).await.unwrap();
        assert_eq!(bytes.as_ref(), b"encrypted node");
    }

    #[tokio::test]
    async fn test_unknown_hash_is_not_complete() {
        let store = BlobsStore::memory().await.unwrap();
        let missing = Hash::new(b"never stored");
        assert!(!store.stat(&missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_fs_store_persists_across_loads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blobs");

        let hash = {
            let store = BlobsStore::fs(&path).await.unwrap();
            let hash = store.put(b"durable".to_vec()).await.unwrap();
            store.shutdown().await.unwrap();
            hash
        };

        let store = BlobsStore::fs(&path).await.unwrap();
        assert_eq!(store.get(&hash).await.unwrap().as_ref(), b"durable");
    }
}
