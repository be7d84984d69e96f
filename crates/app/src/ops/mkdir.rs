use std::path::PathBuf;

use clap::Args;
use common::prelude::FsError;

use crate::ops::session::{get_or_create_dirs, split_path, Session, SessionError};

#[derive(Args, Debug, Clone)]
pub struct Mkdir {
    /// Owner of the home directory
    pub user: String,

    /// Directory path inside the home directory (parents are created)
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum MkdirError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Mkdir {
    type Error = MkdirError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx).await?;
        let result = self.run(&session).await;
        session.close().await?;
        result
    }
}

impl Mkdir {
    async fn run(&self, session: &Session) -> Result<String, MkdirError> {
        let (mut names, name) = split_path(&self.path)?;
        names.push(name);
        let home = session.home(&self.user).await?;
        let dir = get_or_create_dirs(&home, &names).await?;
        let path = dir.path().await?;
        Ok(format!("Created {}", path.display()))
    }
}
