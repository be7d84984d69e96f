mod blobs_store;

pub use blobs_store::{BlobsStore, BlobsStoreError};
pub use iroh_blobs::Hash;
