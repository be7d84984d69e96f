use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use common::prelude::FsError;

use crate::ops::session::{get_or_create_dirs, split_path, Session, SessionError};

#[derive(Args, Debug, Clone)]
pub struct Put {
    /// Owner of the home directory
    pub user: String,

    /// Destination path inside the home directory (parents are created)
    pub path: PathBuf,

    /// Local file to upload
    pub file: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
    #[error(transparent)]
    Local(#[from] anyhow::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Put {
    type Error = PutError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let data = tokio::fs::read(&self.file)
            .await
            .with_context(|| format!("failed to read {}", self.file.display()))?;

        let session = Session::open(ctx).await?;
        let result = self.run(&session, &data).await;
        session.close().await?;
        result
    }
}

impl Put {
    async fn run(&self, session: &Session, data: &[u8]) -> Result<String, PutError> {
        let (names, name) = split_path(&self.path)?;
        let home = session.home(&self.user).await?;
        let dir = get_or_create_dirs(&home, &names).await?;
        let dir = dir.upload_or_overwrite_file(&name, data).await?;
        let path = dir.path().await?.join(&name);
        Ok(format!("Wrote {} bytes to {}", data.len(), path.display()))
    }
}
