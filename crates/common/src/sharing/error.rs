use crate::codec::CodecError;
use crate::vault::FsError;

#[derive(Debug, thiserror::Error)]
pub enum SharingError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("corrupt sharing log at offset {offset}: {source}")]
    CorruptLog {
        offset: u64,
        #[source]
        source: CodecError,
    },
    #[error("sharing log kept moving, gave up after {attempts} attempts")]
    AppendRace { attempts: u32 },
    #[error("filesystem error: {0}")]
    Filesystem(#[from] FsError),
}
