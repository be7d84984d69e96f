mod args;
mod logging;
mod op;
mod ops;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Cat, Init, Mkdir, Put, Rm, Share, Shared, User, Validate};
use state::{AppConfig, AppState};

command_enum! {
    (Init, Init),
    (User, User),
    (Mkdir, Mkdir),
    (Put, Put),
    (Cat, Cat),
    (Rm, Rm),
    (Share, Share),
    (Shared, Shared),
    (Validate, Validate),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let ctx = op::OpContext::new(args.config_path);

    // `init` runs before there is a config to read
    let config = AppState::load(ctx.config_path.clone())
        .map(|state| state.config)
        .unwrap_or_else(|_| AppConfig::default());
    let guards = logging::init_logging(&config);

    let result = args.command.execute(&ctx).await;
    let code = match result {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            tracing::debug!("command failed: {:?}", e);
            eprintln!("Error: {}", e);
            1
        }
    };

    // flush the log writers before exiting
    drop(guards);
    std::process::exit(code);
}
