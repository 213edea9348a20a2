//! Logging setup for hosts embedding the engine
//!
//! The library itself only emits `tracing` events; a host that wants them
//! somewhere calls one of these initializers (or installs its own
//! subscriber).

use std::path::Path;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize stdout logging
///
/// Log level comes from `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(env_filter()),
        )
        .init();
}

/// Initialize dual logging: stdout plus an append-only log file
///
/// Both outputs use the level from `RUST_LOG` (default `info`). The file
/// appender guard is intentionally leaked so the writer stays alive for the
/// program lifetime.
pub fn init_dual_logging(log_file: &Path) {
    let directory = log_file.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .map_or_else(|| "debug.log".into(), |name| name.to_os_string());

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(env_filter()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(env_filter()),
        )
        .init();

    // Keep the appender alive for the program lifetime
    std::mem::forget(guard);
}
