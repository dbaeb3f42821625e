use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn,hyper_util=warn";

/// `RUST_LOG` wins over the default filter when set.
pub fn setup_logger(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.with_ansi(true).compact().init(),
        LogFormat::Json => builder.with_ansi(false).json().init(),
    }
}
