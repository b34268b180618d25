use shared_types::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
/// Calling it twice is harmless; the second install is ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(config.json.then(|| fmt::layer().json()))
        .with((!config.json).then(fmt::layer))
        .try_init();

    if let Err(e) = result {
        eprintln!("[telemetry] subscriber already installed: {e}");
    }
}
