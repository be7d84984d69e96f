use std::path::Path;

use clap::Args;
use common::prelude::*;
use common::sharing::{LazyHome, SHARING_DIR};

use crate::ops::session::{Session, SessionError};

#[derive(Args, Debug, Clone)]
pub struct Shared {
    /// User the capabilities were shared with
    pub recipient: String,

    /// User who shared them
    pub friend: String,

    /// List write capabilities instead of read capabilities
    #[arg(long)]
    pub write: bool,

    /// Only read records logged at or after this byte offset
    #[arg(long)]
    pub from: Option<u64>,

    /// Do not read or update the recipient's capability cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SharedError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
    #[error("loading shared capabilities failed: {0}")]
    Sharing(#[from] SharingError),
}

#[async_trait::async_trait]
impl crate::op::Op for Shared {
    type Error = SharedError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx).await?;
        let result = self.run(&session).await;
        session.close().await?;
        result
    }
}

impl Shared {
    fn kind(&self) -> AccessKind {
        if self.write {
            AccessKind::Write
        } else {
            AccessKind::Read
        }
    }

    async fn run(&self, session: &Session) -> Result<String, SharedError> {
        // the recipient sees the friend's directory for them read-only
        let friend_home = session.home(&self.friend).await?;
        let dir_path = Path::new(SHARING_DIR).join(&self.recipient);
        let Some(friend_dir) = friend_home.get_by_path(&dir_path).await? else {
            return Ok(format!("{} has shared nothing with {}", self.friend, self.recipient));
        };
        let friend_dir = friend_dir.read_only();

        let (_, home_cap) = session
            .state
            .load_user(&self.recipient)
            .map_err(SessionError::from)?;
        let home_cap: Capability = home_cap.into();
        let vault = session.vault.clone();
        let home = LazyHome::new(move || {
            let vault = vault.clone();
            let cap = home_cap.clone();
            async move {
                vault
                    .open(&cap)
                    .await?
                    .ok_or_else(|| FsError::NotFound(cap.location().to_string()))
            }
        });

        let store = session.store();
        let save_cache = !self.no_cache;
        let loaded = match self.from {
            Some(offset) => {
                store
                    .load_from(
                        &home,
                        &friend_dir,
                        &self.friend,
                        offset,
                        self.kind(),
                        save_cache,
                    )
                    .await?
            }
            None => {
                store
                    .load_all(&home, &friend_dir, &self.friend, self.kind(), save_cache)
                    .await?
            }
        };

        let mut lines: Vec<String> = loaded
            .capabilities
            .iter()
            .map(|shared| format!("{} ({})", shared.path.display(), self.kind()))
            .collect();
        lines.push(format!(
            "{} capabilities, {} bytes read",
            loaded.capabilities.len(),
            loaded.bytes_read
        ));
        Ok(lines.join("\n"))
    }
}
