use std::path::PathBuf;

use crate::capability::Location;
use crate::codec::CodecError;
use crate::crypto::{KeyError, SecretError};
use crate::peer::BlobsStoreError;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not a directory: {0}")]
    NotDirectory(String),
    #[error("not a file: {0}")]
    NotAFile(String),
    #[error("not writable: {0}")]
    NotWritable(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("a file ancestor no longer exists: {location} (resolved so far: {partial:?})")]
    MissingAncestor {
        location: Location,
        partial: PathBuf,
    },
    #[error("section [{start}, {end}) does not line up with current length {expected}")]
    SectionConflict { expected: u64, start: u64, end: u64 },
    #[error("invalid section [{start}, {end}) for {len} bytes of data")]
    InvalidSection { start: u64, end: u64, len: u64 },
    #[error("concurrent update of {0}")]
    Conflict(Location),
    #[error("seek to {offset} beyond end of file ({len} bytes)")]
    InvalidSeek { offset: u64, len: u64 },
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("invalid username: {0:?}")]
    InvalidUsername(String),
    #[error("username taken: {0}")]
    UsernameTaken(String),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("blobs store error: {0}")]
    BlobsStore(#[from] BlobsStoreError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pointer table error: {0}")]
    Json(#[from] serde_json::Error),
}
