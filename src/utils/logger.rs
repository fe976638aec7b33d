use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber for structured logging
///
/// `log_level` applies when the RUST_LOG environment variable is not set;
/// unknown values fall back to `info`.
pub fn init_logger(log_level: &str) {
    let level = log_level.parse::<Level>().unwrap_or(Level::INFO);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();

    tracing::info!("Logger initialized with level: {}", level);
}
