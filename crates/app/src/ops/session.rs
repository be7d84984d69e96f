use std::path::{Component, Path, PathBuf};

use common::prelude::*;

use crate::op::OpContext;
use crate::state::{AppState, StateError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
    #[error("home directory of {0} is missing from the vault")]
    MissingHome(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// A loaded state directory and the vault it holds, open for one command
pub struct Session {
    pub state: AppState,
    pub vault: Vault,
}

impl Session {
    pub async fn open(ctx: &OpContext) -> Result<Self, SessionError> {
        let state = AppState::load(ctx.config_path.clone())?;
        let vault = Vault::fs(&state.vault_path).await?;
        Ok(Self { state, vault })
    }

    /// Writable home directory of a user whose key is held locally
    pub async fn home(&self, username: &str) -> Result<FileWrapper, SessionError> {
        let (_, cap) = self.state.load_user(username)?;
        self.vault
            .open(&cap.into())
            .await?
            .ok_or_else(|| SessionError::MissingHome(username.to_string()))
    }

    pub fn store(&self) -> SharingStore<Vault> {
        SharingStore::new(self.vault.clone(), self.state.config.sharing.clone())
    }

    /// Flush the blob store. Must run before the process exits.
    pub async fn close(self) -> Result<(), SessionError> {
        Ok(self.vault.shutdown().await?)
    }
}

/// Split a user-supplied path into directory names and a final entry name
pub fn split_path(path: &Path) -> Result<(Vec<String>, String), SessionError> {
    let mut names = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => names.push(name.to_string_lossy().to_string()),
            Component::RootDir | Component::CurDir => {}
            _ => return Err(SessionError::InvalidPath(path.display().to_string())),
        }
    }
    let name = names
        .pop()
        .ok_or_else(|| SessionError::InvalidPath(path.display().to_string()))?;
    Ok((names, name))
}

/// Walk `names` down from `dir`, creating each missing directory
pub async fn get_or_create_dirs(
    dir: &FileWrapper,
    names: &[String],
) -> Result<FileWrapper, SessionError> {
    let mut current = dir.clone();
    for name in names {
        current = match current.get_child(name).await? {
            Some(child) if child.is_directory() => child,
            Some(_) => return Err(FsError::NotDirectory(name.clone()).into()),
            None => {
                let parent = current.mkdir(name, false).await?;
                parent
                    .get_child(name)
                    .await?
                    .ok_or_else(|| FsError::NotFound(name.clone()))?
            }
        };
    }
    Ok(current)
}

/// Walk `names` down from `dir` without creating anything
pub async fn get_dirs(dir: &FileWrapper, names: &[String]) -> Result<FileWrapper, SessionError> {
    let path: PathBuf = names.iter().collect();
    match dir.get_by_path(&path).await? {
        Some(found) if found.is_directory() => Ok(found),
        Some(_) => Err(FsError::NotDirectory(path.display().to_string()).into()),
        None => Err(FsError::NotFound(path.display().to_string()).into()),
    }
}
