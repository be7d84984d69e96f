pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "capstore")]
#[command(about = "Share capabilities to an encrypted filesystem through append-only logs")]
pub struct Args {
    /// Path to the capstore state directory (defaults to ~/.capstore)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
