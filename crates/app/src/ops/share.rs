use std::path::PathBuf;

use clap::Args;
use common::prelude::*;
use common::sharing::ensure_sharing_dir;

use crate::ops::session::{Session, SessionError};

#[derive(Args, Debug, Clone)]
pub struct Share {
    /// User sharing from their home directory
    pub owner: String,

    /// Registered user to share with
    pub recipient: String,

    /// File or directory inside the owner's home
    pub path: PathBuf,

    /// Share write access instead of read-only access
    #[arg(long)]
    pub write: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
    #[error("sharing failed: {0}")]
    Sharing(#[from] SharingError),
    #[error("no registered user named {0}")]
    UnknownRecipient(String),
}

#[async_trait::async_trait]
impl crate::op::Op for Share {
    type Error = ShareError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx).await?;
        let result = self.run(&session).await;
        session.close().await?;
        result
    }
}

impl Share {
    fn kind(&self) -> AccessKind {
        if self.write {
            AccessKind::Write
        } else {
            AccessKind::Read
        }
    }

    async fn run(&self, session: &Session) -> Result<String, ShareError> {
        if session.vault.user_key(&self.recipient).is_none() {
            return Err(ShareError::UnknownRecipient(self.recipient.clone()));
        }

        let home = session.home(&self.owner).await?;
        let target = home
            .get_by_path(&self.path)
            .await?
            .ok_or_else(|| FsError::NotFound(self.path.display().to_string()))?;
        let shared_path = target.path().await?;

        let store = session.store();
        let dir = ensure_sharing_dir(&home, &self.recipient).await?;
        let dir = store.add_link(&dir, target.capability(), self.kind()).await?;
        let log_len = store.capability_file_size(&dir, self.kind()).await?;

        Ok(format!(
            "Shared {} with {} ({})\n- Log: {} bytes",
            shared_path.display(),
            self.recipient,
            self.kind(),
            log_len
        ))
    }
}
