use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for the CLI.
/// Uses RUST_LOG env var for filtering (defaults to info); logs go to stderr
/// so command output stays clean. Set HEALTHSYNC_LOG_FORMAT=json for JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("HEALTHSYNC_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_ansi(true).with_writer(std::io::stderr))
            .init();
    }
}
