use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt, EnvFilter};

/// Used when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "info";

/// Logs to stderr, filtered by `RUST_LOG`.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::Registry::default()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}
