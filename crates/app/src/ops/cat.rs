use std::path::PathBuf;

use clap::Args;
use common::prelude::FsError;

use crate::ops::session::{Session, SessionError};

#[derive(Args, Debug, Clone)]
pub struct Cat {
    /// Owner of the home directory
    pub user: String,

    /// File path inside the home directory
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum CatError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Cat {
    type Error = CatError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx).await?;
        let result = self.run(&session).await;
        session.close().await?;
        result
    }
}

impl Cat {
    async fn run(&self, session: &Session) -> Result<String, CatError> {
        let home = session.home(&self.user).await?;
        let file = home
            .get_by_path(&self.path)
            .await?
            .ok_or_else(|| FsError::NotFound(self.path.display().to_string()))?;
        if file.is_directory() {
            return Err(FsError::NotAFile(self.path.display().to_string()).into());
        }
        Ok(render(&file.read_all().await?))
    }
}

/// Text as-is, anything else as hex
fn render(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let hex = bytes
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(" ");
            format!("Binary content (hex): {}", hex)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(render(b"hello"), "hello");
        assert_eq!(render(&[0xff, 0x00]), "Binary content (hex): ff 00");
    }
}
