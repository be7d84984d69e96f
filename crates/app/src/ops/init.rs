use std::path::PathBuf;

use clap::Args;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Default log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Directory for daily rolling log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            ..AppConfig::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let log_dir_str = match &state.config.log_dir {
            Some(dir) => dir.display().to_string(),
            None => "none (stderr only)".to_string(),
        };

        let output = format!(
            "Initialized capstore directory at: {}\n\
             - Vault: {}\n\
             - Users: {}\n\
             - Config: {}\n\
             - Log level: {}\n\
             - Log dir: {}",
            state.capstore_dir.display(),
            state.vault_path.display(),
            state.users_path.display(),
            state.config_path.display(),
            state.config.log_level,
            log_dir_str
        );

        Ok(output)
    }
}
