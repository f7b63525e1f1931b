use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes logging with console output for operators and a JSON file
/// stream for audit review. Each pipeline run appends to a daily-rotated
/// file under `logs/`.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    // Non-blocking daily-rotated file appender; JSON lines so runs can be
    // grepped and replayed alongside the audit log
    let file_appender = tracing_appender::rolling::daily("logs", "dealbook.log");
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    // Console output stays human-oriented: no file/line noise for a batch CLI
    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stdout);

    // Respect RUST_LOG if set; otherwise default to verbose for our crate
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dealbook=debug,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // Keep the guard alive for the life of the process so logs flush on exit
    std::mem::forget(_guard);
}
