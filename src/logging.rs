use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, Settings};

/// Build the filter: `RUST_LOG` when set, else the configured level.
/// sqlx statement logs stay at warn unless enabled.
fn env_filter(settings: &Settings) -> EnvFilter {
    let base = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if settings.sqlx_logging {
        base
    } else {
        base.add_directive(
            "sqlx::query=warn"
                .parse()
                .unwrap_or_else(|_| tracing::Level::WARN.into()),
        )
    }
}

/// Install the global subscriber.
///
/// Returns `false` when one was already installed, which is harmless in
/// tests that share a process.
pub fn init(settings: &Settings) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter(settings));
    let result = match settings.log_format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true))
            .try_init(),
    };
    result.is_ok()
}
