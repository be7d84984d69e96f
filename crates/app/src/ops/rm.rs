use std::path::PathBuf;

use clap::Args;
use common::prelude::FsError;

use crate::ops::session::{get_dirs, split_path, Session, SessionError};

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// Owner of the home directory
    pub user: String,

    /// Path inside the home directory; directories are removed with
    ///  everything below them
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Rm {
    type Error = RmError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx).await?;
        let result = self.run(&session).await;
        session.close().await?;
        result
    }
}

impl Rm {
    async fn run(&self, session: &Session) -> Result<String, RmError> {
        let (names, name) = split_path(&self.path)?;
        let home = session.home(&self.user).await?;
        let dir = get_dirs(&home, &names).await?;
        dir.remove_child(&name).await?;
        Ok(format!("Removed {}", self.path.display()))
    }
}
