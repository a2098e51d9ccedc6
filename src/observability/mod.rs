//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count: 0 → warn, 1 → info,
/// 2 → debug (includes executed SQL), 3+ → trace.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "pedigree=warn",
        1 => "pedigree=info",
        2 => "pedigree=debug",
        _ => "pedigree=trace",
    }
}

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// `RUST_LOG` wins over `verbosity` when set. Output goes to stderr so it
/// never mixes with command output. Safe to call more than once.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
