use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Install the global console subscriber. `RUST_LOG` directives take precedence
/// over `level`; an unknown `level` falls back to `info`.
pub fn init_logging(level: &str) {
    let valid = LEVELS.contains(&level);
    let level = if valid { level } else { "info" };

    let filter = EnvFilter::builder()
        .with_default_directive(level.parse().unwrap_or_else(|_| LevelFilter::INFO.into()))
        .parse_lossy(std::env::var("RUST_LOG").unwrap_or_default());

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    // a second init (e.g. from tests) keeps the existing subscriber
    let _ = tracing_subscriber::registry().with(console_layer).try_init();

    if !valid {
        tracing::warn!("Invalid log level, defaulting to 'info'");
    }
}
