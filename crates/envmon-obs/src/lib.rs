use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,envmon=debug";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for a terminal
    #[default]
    Plain,
    /// One JSON object per line, for log shippers
    Json,
}

fn filter() -> EnvFilter {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    EnvFilter::new(directives)
}

/// Initialize logging.
/// - RUST_LOG respected; default to "info,envmon=debug"
/// - Writes to stderr; stdout belongs to the console display
/// - Safe to call more than once; later calls are ignored
pub fn init(service_name: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(filter());
    let installed = match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Plain => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(service = %service_name, ?format, "Logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init("test", LogFormat::Plain);
        init("test", LogFormat::Json);
    }
}
