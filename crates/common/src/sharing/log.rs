//! Append side of the per-recipient sharing logs
//!
//! ```text
//! /<owner>/sharing/<recipient>/sharing.r
//! /<owner>/sharing/<recipient>/sharing.w
//! ```

use crate::capability::{AccessKind, Capability};
use crate::vault::{FileWrapper, FsError};

use super::SharingError;

/// Directory under an owner's home that holds one directory per recipient
pub const SHARING_DIR: &str = "sharing";

/// `/<owner>/sharing/<recipient>/`, created on demand
pub async fn ensure_sharing_dir(
    owner_home: &FileWrapper,
    recipient: &str,
) -> Result<FileWrapper, SharingError> {
    let sharing = get_or_mkdir(owner_home, SHARING_DIR).await?;
    Ok(get_or_mkdir(&sharing, recipient).await?)
}

async fn get_or_mkdir(parent: &FileWrapper, name: &str) -> Result<FileWrapper, FsError> {
    if let Some(dir) = parent.get_child(name).await? {
        return Ok(dir);
    }
    match parent.mkdir(name, false).await {
        Ok(_) | Err(FsError::AlreadyExists(_)) => {}
        Err(e) => return Err(e),
    }
    parent
        .get_child(name)
        .await?
        .ok_or_else(|| FsError::NotFound(name.to_string()))
}

/// The log file for `kind` under a friend's sharing directory
pub async fn sharing_file(
    dir: &FileWrapper,
    kind: AccessKind,
) -> Result<Option<FileWrapper>, FsError> {
    dir.get_child(kind.sharing_file_name()).await
}

/// Current length of the log for `kind`, zero if it does not exist yet
pub async fn sharing_file_size(dir: &FileWrapper, kind: AccessKind) -> Result<u64, FsError> {
    Ok(sharing_file(dir, kind)
        .await?
        .map(|file| file.size())
        .unwrap_or(0))
}

/// Append one encoded capability to the log for `kind`.
///
/// The record goes in as a section starting at the log's current length.
///  If another writer extended the log first, the vault rejects the section
///  and the append is retried against the new length, at most `attempts`
///  times.
pub async fn append_link(
    shared_dir: &FileWrapper,
    cap: &Capability,
    kind: AccessKind,
    attempts: u32,
) -> Result<FileWrapper, SharingError> {
    if !shared_dir.is_directory() || !shared_dir.is_writable() {
        return Err(SharingError::InvalidArgument(format!(
            "cannot share into {}: not a writable directory",
            shared_dir.name()
        )));
    }

    let record = cap
        .to_record()
        .map_err(|e| SharingError::InvalidArgument(format!("unencodable capability: {}", e)))?;
    let name = kind.sharing_file_name();
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        let start = sharing_file_size(shared_dir, kind).await?;
        let end = start + record.len() as u64;

        match shared_dir
            .upload_file_section(name, &record, false, start, end)
            .await
        {
            Ok(dir) => {
                tracing::info!(
                    "appended {} link for {} to {}/{} at [{}, {})",
                    kind,
                    cap.location(),
                    shared_dir.name(),
                    name,
                    start,
                    end
                );
                return Ok(dir);
            }
            Err(e @ (FsError::SectionConflict { .. } | FsError::Conflict(_))) => {
                tracing::warn!(
                    "append to {}/{} raced (attempt {}/{}): {}",
                    shared_dir.name(),
                    name,
                    attempt,
                    attempts,
                    e
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(SharingError::AppendRace { attempts })
}
