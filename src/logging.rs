use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "SALESDASH_LOG";

/// Pick the filter directive: explicit flag, then environment, then settings.
pub fn resolve_level(flag: Option<&str>, env: Option<&str>, saved: &str) -> String {
    flag.or(env)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(saved)
        .to_lowercase()
}

/// Initialise the global `tracing` subscriber writing to stderr.
/// Unparsable directives fall back to `warn`.
pub fn init(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;
    Ok(())
}
