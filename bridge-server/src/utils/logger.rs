//! Logging infrastructure
//!
//! Structured logging with an env-filter: `LOG_LEVEL` (or the standard
//! `RUST_LOG`) narrows output per target. With `LOG_DIR` set, output
//! goes to daily-rotated files instead of stderr.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber
pub fn init_logger(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Ok(dir) = std::env::var("LOG_DIR") {
        if Path::new(&dir).exists() {
            let appender = tracing_appender::rolling::daily(&dir, "bridge-server");
            subscriber.with_writer(appender).with_ansi(false).init();
            return;
        }
        eprintln!("LOG_DIR {dir} does not exist, logging to stderr");
    }

    subscriber.init();
}
