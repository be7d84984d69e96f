use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::state::AppConfig;

pub const LOG_FILE_NAME: &str = "capstore.log";

/// Parse a configured level, falling back to `warn` on anything unrecognised
pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::WARN)
}

/// Install the global subscriber. Command output goes to stdout, so logs
///  go to stderr and, when `log_dir` is set, to a daily rolling file.
///
/// The returned guards flush the writers on drop and must outlive the command.
pub fn init_logging(config: &AppConfig) -> Vec<WorkerGuard> {
    let level = parse_level(&config.log_level);
    let mut guards = Vec::new();

    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(stderr_guard);

    let stderr_env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stderr_writer)
        .with_filter(stderr_env_filter);

    if let Some(log_dir) = &config.log_dir {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!(
                "Warning: Failed to create log directory {:?}: {}",
                log_dir, e
            );
        }

        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        guards.push(file_guard);

        let file_env_filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(file_env_filter);

        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry().with(stderr_layer).init();
    }

    guards
}
