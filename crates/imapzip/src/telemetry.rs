//! Process-wide logging setup for binaries embedding the extractor.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Installs a formatted tracing subscriber and routes `log` records into it.
///
/// `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug` when
/// `debug` is set. Returns `false` if a global subscriber was already installed.
pub fn init_logging(debug: bool) -> bool {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = fmt::layer().with_target(false);

    let subscriber = Registry::default().with(env_filter).with(fmt_layer);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }

    // Already set means another logger owns `log`; tracing events still flow.
    let _ = tracing_log::LogTracer::init();
    tracing::debug!("Logging initialized");
    true
}
