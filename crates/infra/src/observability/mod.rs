//! Logging initialisation
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` read from
//! `RUST_LOG` (default `info`) and a fmt layer in the requested format.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, one event per line
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install the global subscriber.
///
/// Only the first call has an effect; later calls (and calls made after
/// another subscriber was installed elsewhere) are no-ops. Returns whether
/// this crate's subscriber is the active one.
pub fn init_tracing(format: LogFormat) -> bool {
    *INSTALLED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let fmt_layer = fmt::layer().with_target(true);

        let result = match format {
            LogFormat::Json => {
                tracing_subscriber::registry().with(env_filter).with(fmt_layer.json()).try_init()
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()
            }
        };

        match result {
            Ok(()) => {
                tracing::debug!(?format, "tracing initialised");
                true
            }
            Err(_) => false,
        }
    })
}
