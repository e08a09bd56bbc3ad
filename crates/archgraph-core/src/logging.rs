use crate::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer, Registry};

/// Install the global tracing subscriber described by `config`.
///
/// `RUST_LOG` wins over the configured level. Returns `false` when a global
/// subscriber was already installed, which is not an error for callers that
/// initialise more than once (tests, embedded use).
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let fmt_layer = match config.format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        "compact" => tracing_subscriber::fmt::layer().compact().boxed(),
        _ => tracing_subscriber::fmt::layer().pretty().boxed(),
    };

    let subscriber = Registry::default().with(env_filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).is_ok()
}
